use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    Appointments, AppointmentsDetails, AppointmentsId, Exhibit, ExhibitDetails, ExhibitEntry,
    ExhibitId, ExhibitParticipation, ExhibitReview, Federation, FederationDetails, FederationId,
    Participant, ParticipantDetails, ParticipantId, ParticipationDetails, ParticipationId,
    TravelDetails, TravelDetailsData, TravelDetailsId, UserId, MAX_PARTICIPATIONS_PER_EXHIBIT,
};
use super::store::{RecordStore, StoreError};

#[derive(Default)]
struct Tables {
    next_id: u64,
    participants: Vec<Participant>,
    federations: Vec<Federation>,
    appointments: Vec<Appointments>,
    exhibits: Vec<Exhibit>,
    participations: Vec<ExhibitParticipation>,
    travel_details: Vec<TravelDetails>,
}

impl Tables {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Updates surviving rows in place so their ids stay stable across edits.
    fn replace_participations(
        &mut self,
        exhibit: ExhibitId,
        participations: Vec<ParticipationDetails>,
    ) -> Vec<ExhibitParticipation> {
        let existing: Vec<ParticipationId> = self
            .participations
            .iter()
            .filter(|row| row.exhibit == exhibit)
            .map(|row| row.id)
            .collect();
        let now = Utc::now();
        let mut stored = Vec::with_capacity(participations.len());
        for (index, details) in participations.into_iter().enumerate() {
            let current = existing
                .get(index)
                .and_then(|id| self.participations.iter_mut().find(|row| row.id == *id));
            let row = match current {
                Some(row) => {
                    row.details = details;
                    row.changed_at = now;
                    row.clone()
                }
                None => {
                    let row = ExhibitParticipation {
                        id: ParticipationId(self.allocate()),
                        exhibit,
                        details,
                        created_at: now,
                        changed_at: now,
                    };
                    self.participations.push(row.clone());
                    row
                }
            };
            stored.push(row);
        }
        let surplus = &existing[stored.len().min(existing.len())..];
        self.participations.retain(|row| !surplus.contains(&row.id));
        stored
    }
}

/// Mutex-guarded store used by tests and when no database path is configured.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("record store mutex poisoned".to_string()))
    }
}

fn check_limit(participations: &[ParticipationDetails]) -> Result<(), StoreError> {
    if participations.len() > MAX_PARTICIPATIONS_PER_EXHIBIT {
        return Err(StoreError::ParticipationLimit {
            limit: MAX_PARTICIPATIONS_PER_EXHIBIT,
        });
    }
    Ok(())
}

impl RecordStore for MemoryRecordStore {
    fn participant_for_user(&self, user: &UserId) -> Result<Option<Participant>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .participants
            .iter()
            .find(|participant| &participant.user == user)
            .cloned())
    }

    fn participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.participants.iter().find(|p| p.id == id).cloned())
    }

    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.lock()?.participants.clone())
    }

    fn upsert_participant(
        &self,
        user: &UserId,
        details: ParticipantDetails,
    ) -> Result<Participant, StoreError> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        if let Some(existing) = tables.participants.iter_mut().find(|p| &p.user == user) {
            existing.details = details;
            existing.changed_at = now;
            return Ok(existing.clone());
        }
        let participant = Participant {
            id: ParticipantId(tables.allocate()),
            user: user.clone(),
            details,
            created_at: now,
            changed_at: now,
        };
        tables.participants.push(participant.clone());
        Ok(participant)
    }

    fn delete_participant(&self, id: ParticipantId) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        let before = tables.participants.len();
        tables.participants.retain(|p| p.id != id);
        if tables.participants.len() == before {
            return Ok(false);
        }
        let exhibits: Vec<ExhibitId> = tables
            .exhibits
            .iter()
            .filter(|exhibit| exhibit.participant == id)
            .map(|exhibit| exhibit.id)
            .collect();
        tables
            .participations
            .retain(|row| !exhibits.contains(&row.exhibit));
        tables.exhibits.retain(|exhibit| exhibit.participant != id);
        tables.appointments.retain(|row| row.participant != id);
        tables.travel_details.retain(|row| row.participant != id);
        Ok(true)
    }

    fn federations(&self) -> Result<Vec<Federation>, StoreError> {
        Ok(self.lock()?.federations.clone())
    }

    fn federation(&self, id: FederationId) -> Result<Option<Federation>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.federations.iter().find(|f| f.id == id).cloned())
    }

    fn federation_by_country(&self, country_code: &str) -> Result<Option<Federation>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .federations
            .iter()
            .find(|f| f.details.country_code.eq_ignore_ascii_case(country_code))
            .cloned())
    }

    fn insert_federation(&self, details: FederationDetails) -> Result<Federation, StoreError> {
        let mut tables = self.lock()?;
        let federation = Federation {
            id: FederationId(tables.allocate()),
            details,
        };
        tables.federations.push(federation.clone());
        Ok(federation)
    }

    fn appointments_for(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<Appointments>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .appointments
            .iter()
            .find(|row| row.participant == participant)
            .cloned())
    }

    fn all_appointments(&self) -> Result<Vec<Appointments>, StoreError> {
        Ok(self.lock()?.appointments.clone())
    }

    fn commissioner_for_country(
        &self,
        country_code: &str,
    ) -> Result<Option<(Appointments, Participant)>, StoreError> {
        let tables = self.lock()?;
        let found = tables.appointments.iter().find_map(|row| {
            if !row.details.commissioner {
                return None;
            }
            let federation = tables
                .federations
                .iter()
                .find(|f| f.id == row.details.federation)?;
            if !federation.details.country_code.eq_ignore_ascii_case(country_code) {
                return None;
            }
            let participant = tables
                .participants
                .iter()
                .find(|p| p.id == row.participant)?;
            Some((row.clone(), participant.clone()))
        });
        Ok(found)
    }

    fn upsert_appointments(
        &self,
        participant: ParticipantId,
        details: AppointmentsDetails,
    ) -> Result<Appointments, StoreError> {
        let mut tables = self.lock()?;
        if !tables.participants.iter().any(|p| p.id == participant) {
            return Err(StoreError::NotFound);
        }
        if !tables.federations.iter().any(|f| f.id == details.federation) {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        if let Some(existing) = tables
            .appointments
            .iter_mut()
            .find(|row| row.participant == participant)
        {
            existing.details = details;
            existing.changed_at = now;
            return Ok(existing.clone());
        }
        let appointments = Appointments {
            id: AppointmentsId(tables.allocate()),
            participant,
            details,
            created_at: now,
            changed_at: now,
        };
        tables.appointments.push(appointments.clone());
        Ok(appointments)
    }

    fn exhibits_for(&self, participant: ParticipantId) -> Result<Vec<Exhibit>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .exhibits
            .iter()
            .filter(|exhibit| exhibit.participant == participant)
            .cloned()
            .collect())
    }

    fn exhibit(&self, id: ExhibitId) -> Result<Option<Exhibit>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.exhibits.iter().find(|e| e.id == id).cloned())
    }

    fn exhibits(&self) -> Result<Vec<Exhibit>, StoreError> {
        Ok(self.lock()?.exhibits.clone())
    }

    fn participations_for(
        &self,
        exhibit: ExhibitId,
    ) -> Result<Vec<ExhibitParticipation>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .participations
            .iter()
            .filter(|row| row.exhibit == exhibit)
            .cloned()
            .collect())
    }

    fn participations(&self) -> Result<Vec<ExhibitParticipation>, StoreError> {
        Ok(self.lock()?.participations.clone())
    }

    fn insert_exhibit(
        &self,
        participant: ParticipantId,
        details: ExhibitDetails,
        participations: Vec<ParticipationDetails>,
    ) -> Result<ExhibitEntry, StoreError> {
        check_limit(&participations)?;
        let mut tables = self.lock()?;
        if !tables.participants.iter().any(|p| p.id == participant) {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        let exhibit = Exhibit {
            id: ExhibitId(tables.allocate()),
            participant,
            details,
            review: ExhibitReview::default(),
            created_at: now,
            changed_at: now,
        };
        tables.exhibits.push(exhibit.clone());
        let participations = tables.replace_participations(exhibit.id, participations);
        Ok(ExhibitEntry {
            exhibit,
            participations,
        })
    }

    fn update_exhibit(
        &self,
        id: ExhibitId,
        details: ExhibitDetails,
        participations: Vec<ParticipationDetails>,
    ) -> Result<ExhibitEntry, StoreError> {
        check_limit(&participations)?;
        let mut tables = self.lock()?;
        let exhibit = {
            let existing = tables
                .exhibits
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(StoreError::NotFound)?;
            existing.details = details;
            existing.changed_at = Utc::now();
            existing.clone()
        };
        let participations = tables.replace_participations(id, participations);
        Ok(ExhibitEntry {
            exhibit,
            participations,
        })
    }

    fn delete_exhibit(&self, id: ExhibitId) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        let before = tables.exhibits.len();
        tables.exhibits.retain(|e| e.id != id);
        if tables.exhibits.len() == before {
            return Ok(false);
        }
        tables.participations.retain(|row| row.exhibit != id);
        Ok(true)
    }

    fn review_exhibit(&self, id: ExhibitId, review: ExhibitReview) -> Result<Exhibit, StoreError> {
        let mut tables = self.lock()?;
        let exhibit = tables
            .exhibits
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        exhibit.review = review;
        exhibit.changed_at = Utc::now();
        Ok(exhibit.clone())
    }

    fn travel_details_for(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<TravelDetails>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .travel_details
            .iter()
            .find(|row| row.participant == participant)
            .cloned())
    }

    fn all_travel_details(&self) -> Result<Vec<TravelDetails>, StoreError> {
        Ok(self.lock()?.travel_details.clone())
    }

    fn upsert_travel_details(
        &self,
        participant: ParticipantId,
        details: TravelDetailsData,
    ) -> Result<TravelDetails, StoreError> {
        let mut tables = self.lock()?;
        if !tables.participants.iter().any(|p| p.id == participant) {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        if let Some(existing) = tables
            .travel_details
            .iter_mut()
            .find(|row| row.participant == participant)
        {
            existing.details = details;
            existing.changed_at = now;
            return Ok(existing.clone());
        }
        let travel = TravelDetails {
            id: TravelDetailsId(tables.allocate()),
            participant,
            details,
            created_at: now,
            changed_at: now,
        };
        tables.travel_details.push(travel.clone());
        Ok(travel)
    }
}
