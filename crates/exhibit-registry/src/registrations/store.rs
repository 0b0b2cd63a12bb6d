use super::domain::{
    Appointments, AppointmentsDetails, Exhibit, ExhibitDetails, ExhibitEntry, ExhibitId,
    ExhibitParticipation, ExhibitReview, Federation, FederationDetails, FederationId,
    Participant, ParticipantDetails, ParticipantId, ParticipationDetails, TravelDetails,
    TravelDetailsData, UserId,
};

/// Persistence seam for registration records.
///
/// Queries replace relationship traversal: every "children of" lookup is keyed
/// by the parent id and returns rows in insertion order. Deleting a participant
/// removes its appointments, exhibits (with participations) and travel details;
/// deleting an exhibit removes its participations.
pub trait RecordStore: Send + Sync {
    fn participant_for_user(&self, user: &UserId) -> Result<Option<Participant>, StoreError>;
    fn participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError>;
    fn participants(&self) -> Result<Vec<Participant>, StoreError>;
    /// Creates the user's participant or replaces its details.
    fn upsert_participant(
        &self,
        user: &UserId,
        details: ParticipantDetails,
    ) -> Result<Participant, StoreError>;
    /// Returns whether anything was removed.
    fn delete_participant(&self, id: ParticipantId) -> Result<bool, StoreError>;

    fn federations(&self) -> Result<Vec<Federation>, StoreError>;
    fn federation(&self, id: FederationId) -> Result<Option<Federation>, StoreError>;
    /// First federation registered for an ISO country code.
    fn federation_by_country(&self, country_code: &str) -> Result<Option<Federation>, StoreError>;
    fn insert_federation(&self, details: FederationDetails) -> Result<Federation, StoreError>;

    fn appointments_for(&self, participant: ParticipantId)
        -> Result<Option<Appointments>, StoreError>;
    fn all_appointments(&self) -> Result<Vec<Appointments>, StoreError>;
    /// First commissioner appointment whose federation covers the country.
    fn commissioner_for_country(
        &self,
        country_code: &str,
    ) -> Result<Option<(Appointments, Participant)>, StoreError>;
    fn upsert_appointments(
        &self,
        participant: ParticipantId,
        details: AppointmentsDetails,
    ) -> Result<Appointments, StoreError>;

    fn exhibits_for(&self, participant: ParticipantId) -> Result<Vec<Exhibit>, StoreError>;
    fn exhibit(&self, id: ExhibitId) -> Result<Option<Exhibit>, StoreError>;
    fn exhibits(&self) -> Result<Vec<Exhibit>, StoreError>;
    fn participations_for(&self, exhibit: ExhibitId)
        -> Result<Vec<ExhibitParticipation>, StoreError>;
    fn participations(&self) -> Result<Vec<ExhibitParticipation>, StoreError>;
    /// Stores an exhibit and its participations atomically.
    fn insert_exhibit(
        &self,
        participant: ParticipantId,
        details: ExhibitDetails,
        participations: Vec<ParticipationDetails>,
    ) -> Result<ExhibitEntry, StoreError>;
    /// Replaces the exhibit details and its whole participation set.
    fn update_exhibit(
        &self,
        id: ExhibitId,
        details: ExhibitDetails,
        participations: Vec<ParticipationDetails>,
    ) -> Result<ExhibitEntry, StoreError>;
    fn delete_exhibit(&self, id: ExhibitId) -> Result<bool, StoreError>;
    fn review_exhibit(&self, id: ExhibitId, review: ExhibitReview) -> Result<Exhibit, StoreError>;

    fn travel_details_for(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<TravelDetails>, StoreError>;
    fn all_travel_details(&self) -> Result<Vec<TravelDetails>, StoreError>;
    fn upsert_travel_details(
        &self,
        participant: ParticipantId,
        details: TravelDetailsData,
    ) -> Result<TravelDetails, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("an exhibit holds at most {limit} previous participations")]
    ParticipationLimit { limit: usize },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
