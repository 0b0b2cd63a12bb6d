use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::domain::{
    Appointments, Exhibit, ExhibitEntry, ExhibitId, ExhibitReview, Federation, Participant,
    ParticipantId, TravelDetails, UserId,
};
use super::forms::{AppointmentsForm, ExhibitForm, FederationForm, ParticipantForm, TravelForm};
use super::notify::{DispatchError, MailTransport, NotificationDispatcher, OutgoingMail};
use super::printout::{
    appointments_fields, exhibit_fields, participant_fields, participation_fields, travel_fields,
    Section,
};
use super::store::{RecordStore, StoreError};
use super::validation::FieldErrors;
use crate::config::{ExhibitionConfig, MailConfig};

const SUMMARY_WIDTH: usize = 80;

/// Registration steps in the order they are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Personal,
    Appointments,
    Exhibit,
    Travel,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Personal, Step::Appointments, Step::Exhibit, Step::Travel];

    pub const fn slug(self) -> &'static str {
        match self {
            Step::Personal => "personal",
            Step::Appointments => "appointments",
            Step::Exhibit => "exhibit",
            Step::Travel => "travel",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Step::Personal => "Personal",
            Step::Appointments => "Appointments",
            Step::Exhibit => "Entry forms",
            Step::Travel => "Travel details",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Step::Personal => "Name and contact details",
            Step::Appointments => "Commissioner/Jury data",
            Step::Exhibit => "Participating exhibits",
            Step::Travel => "Flights, accommodation, etc.",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown registration step '{0}'")]
pub struct UnknownStep(pub String);

impl FromStr for Step {
    type Err = UnknownStep;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.slug() == value)
            .ok_or_else(|| UnknownStep(value.to_string()))
    }
}

/// Completion flag for one step, as shown in the step navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    pub step: Step,
    pub title: &'static str,
    pub description: &'static str,
    pub done: bool,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOverview {
    pub participant: Option<Participant>,
    pub required_done: bool,
    pub steps: Vec<StepStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_forms_disabled_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_forms_submit_message: Option<String>,
}

impl RegistrationOverview {
    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.steps.iter().find(|status| status.step == step)
    }
}

/// One line of the participant's entry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExhibitSummary {
    pub id: ExhibitId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRecord {
    Personal {
        participant: Option<Participant>,
    },
    Appointments {
        appointments: Option<Appointments>,
        federations: Vec<Federation>,
    },
    ExhibitList {
        exhibits: Vec<ExhibitSummary>,
    },
    ExhibitEdit {
        entry: ExhibitEntry,
    },
    Travel {
        travel_details: Option<TravelDetails>,
    },
}

/// Everything needed to display a step.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub form_title: String,
    pub overview: RegistrationOverview,
    pub record: StepRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentsOutcome {
    pub appointments: Appointments,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<OutgoingMail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExhibitOutcome {
    pub entry: ExhibitEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<OutgoingMail>,
}

/// Error raised by the registration workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("redirect to the {0} step")]
    Redirect(Step),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Drives the four registration steps against a record store.
pub struct RegistrationWorkflow<S, M> {
    store: Arc<S>,
    dispatcher: NotificationDispatcher<S, M>,
    exhibition: ExhibitionConfig,
}

impl<S, M> RegistrationWorkflow<S, M>
where
    S: RecordStore + 'static,
    M: MailTransport + 'static,
{
    pub fn new(
        store: Arc<S>,
        transport: Arc<M>,
        exhibition: ExhibitionConfig,
        mail: MailConfig,
    ) -> Self {
        let dispatcher =
            NotificationDispatcher::new(store.clone(), transport, exhibition.clone(), mail);
        Self {
            store,
            dispatcher,
            exhibition,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn exhibition(&self) -> &ExhibitionConfig {
        &self.exhibition
    }

    fn participant(&self, user: &UserId) -> Result<Option<Participant>, WorkflowError> {
        Ok(self.store.participant_for_user(user)?)
    }

    fn require_participant(&self, user: &UserId) -> Result<Participant, WorkflowError> {
        self.participant(user)?
            .ok_or(WorkflowError::Redirect(Step::Personal))
    }

    /// Loads an exhibit only when the participant owns it.
    fn owned_exhibit(
        &self,
        participant: &Participant,
        id: ExhibitId,
    ) -> Result<Option<Exhibit>, WorkflowError> {
        Ok(self
            .store
            .exhibit(id)?
            .filter(|exhibit| exhibit.participant == participant.id))
    }

    /// Step navigation derived from what the store currently holds.
    pub fn overview(
        &self,
        user: &UserId,
        current: Option<Step>,
    ) -> Result<RegistrationOverview, WorkflowError> {
        let participant = self.participant(user)?;
        let (appointments, exhibits, travel) = match &participant {
            Some(participant) => (
                self.store.appointments_for(participant.id)?.is_some(),
                !self.store.exhibits_for(participant.id)?.is_empty(),
                self.store.travel_details_for(participant.id)?.is_some(),
            ),
            None => (false, false, false),
        };
        let done = |step: Step| match step {
            Step::Personal => participant.is_some(),
            Step::Appointments => appointments,
            Step::Exhibit => exhibits,
            Step::Travel => travel,
        };
        let steps = Step::ALL
            .into_iter()
            .map(|step| StepStatus {
                step,
                title: step.title(),
                description: step.description(),
                done: done(step),
                current: current == Some(step),
            })
            .collect();

        Ok(RegistrationOverview {
            required_done: participant.is_some(),
            participant,
            steps,
            entry_forms_disabled_message: self.exhibition.entry_forms_disabled_message.clone(),
            entry_forms_submit_message: self.exhibition.entry_forms_submit_message.clone(),
        })
    }

    pub fn open_step(
        &self,
        user: &UserId,
        step: Step,
        exhibit: Option<ExhibitId>,
    ) -> Result<StepView, WorkflowError> {
        let overview = self.overview(user, Some(step))?;
        let participant = match (&overview.participant, step) {
            (_, Step::Personal) => None,
            (Some(participant), _) => Some(participant.clone()),
            (None, _) => {
                debug!(%step, "step opened before personal details, redirecting");
                return Err(WorkflowError::Redirect(Step::Personal));
            }
        };

        let (form_title, record) = match (step, participant) {
            (Step::Personal, _) => (
                step.title().to_string(),
                StepRecord::Personal {
                    participant: overview.participant.clone(),
                },
            ),
            (Step::Appointments, Some(participant)) => (
                step.title().to_string(),
                StepRecord::Appointments {
                    appointments: self.store.appointments_for(participant.id)?,
                    federations: self.store.federations()?,
                },
            ),
            (Step::Exhibit, Some(participant)) => match exhibit {
                Some(id) => {
                    let exhibit = self
                        .owned_exhibit(&participant, id)?
                        .ok_or(WorkflowError::Redirect(Step::Exhibit))?;
                    let participations = self.store.participations_for(exhibit.id)?;
                    (
                        "Edit entry".to_string(),
                        StepRecord::ExhibitEdit {
                            entry: ExhibitEntry {
                                exhibit,
                                participations,
                            },
                        },
                    )
                }
                None => {
                    let exhibits = self
                        .store
                        .exhibits_for(participant.id)?
                        .into_iter()
                        .map(|exhibit| ExhibitSummary {
                            id: exhibit.id,
                            description: shorten(&exhibit.details.short_description, SUMMARY_WIDTH),
                            title: exhibit.details.title,
                        })
                        .collect();
                    ("Add entry".to_string(), StepRecord::ExhibitList { exhibits })
                }
            },
            (Step::Travel, Some(participant)) => (
                step.title().to_string(),
                StepRecord::Travel {
                    travel_details: self.store.travel_details_for(participant.id)?,
                },
            ),
            (_, None) => return Err(WorkflowError::Redirect(Step::Personal)),
        };

        Ok(StepView {
            form_title,
            overview,
            record,
        })
    }

    pub fn submit_personal(
        &self,
        user: &UserId,
        form: &ParticipantForm,
    ) -> Result<Participant, WorkflowError> {
        let details = form.validate(&self.exhibition.native_language)?;
        let participant = self.store.upsert_participant(user, details)?;
        info!(participant = %participant.id, "personal details saved");
        Ok(participant)
    }

    pub fn submit_appointments(
        &self,
        user: &UserId,
        form: &AppointmentsForm,
    ) -> Result<AppointmentsOutcome, WorkflowError> {
        let participant = self.require_participant(user)?;
        let details = form.validate(&self.exhibition.appointments_authorization_key)?;
        let Some(federation) = self.store.federation(details.federation)? else {
            let mut errors = FieldErrors::new();
            errors.add(
                "federation",
                "Select a valid choice. That choice is not one of the available choices.",
            );
            return Err(errors.into());
        };

        let appointments = self.store.upsert_appointments(participant.id, details)?;
        info!(participant = %participant.id, federation = %federation.id, "appointments saved");

        let notice = self
            .dispatcher
            .notify_appointments(&participant, &appointments, &federation)?;
        Ok(AppointmentsOutcome {
            appointments,
            notice,
        })
    }

    /// Creates an entry, or replaces one the participant owns.
    pub fn submit_exhibit(
        &self,
        user: &UserId,
        exhibit: Option<ExhibitId>,
        form: &ExhibitForm,
    ) -> Result<ExhibitOutcome, WorkflowError> {
        if self.exhibition.entry_forms_disabled_message.is_some() {
            debug!("entry forms are closed, ignoring exhibit submission");
            return Err(WorkflowError::Redirect(Step::Personal));
        }
        let participant = self.require_participant(user)?;
        let existing = match exhibit {
            Some(id) => Some(
                self.owned_exhibit(&participant, id)?
                    .ok_or(WorkflowError::Redirect(Step::Exhibit))?,
            ),
            None => None,
        };

        let draft = form.validate()?;
        let entry = match existing {
            Some(exhibit) => {
                self.store
                    .update_exhibit(exhibit.id, draft.details, draft.participations)?
            }
            None => self
                .store
                .insert_exhibit(participant.id, draft.details, draft.participations)?,
        };
        info!(
            participant = %participant.id,
            exhibit = %entry.exhibit.id,
            participations = entry.participations.len(),
            "exhibit entry saved"
        );

        let notice = self.dispatcher.notify_exhibit(&participant, &entry)?;
        Ok(ExhibitOutcome { entry, notice })
    }

    pub fn submit_travel(
        &self,
        user: &UserId,
        form: &TravelForm,
    ) -> Result<TravelDetails, WorkflowError> {
        let participant = self.require_participant(user)?;
        let details = form.validate()?;
        let travel = self.store.upsert_travel_details(participant.id, details)?;
        info!(participant = %participant.id, "travel details saved");
        Ok(travel)
    }

    /// Deletes an owned exhibit; anything else is silently ignored.
    pub fn remove_exhibit(&self, user: &UserId, id: ExhibitId) -> Result<bool, WorkflowError> {
        let Some(participant) = self.participant(user)? else {
            return Ok(false);
        };
        if self.owned_exhibit(&participant, id)?.is_none() {
            debug!(exhibit = %id, "remove requested for an exhibit the participant does not own");
            return Ok(false);
        }
        let removed = self.store.delete_exhibit(id)?;
        info!(participant = %participant.id, exhibit = %id, "exhibit entry removed");
        Ok(removed)
    }

    pub fn printout(&self, user: &UserId) -> Result<Vec<Section>, WorkflowError> {
        let participant = self.require_participant(user)?;
        let native = &self.exhibition.native_language;

        let mut sections = vec![Section::new(
            "Personal",
            participant_fields(&participant.details, native),
        )];
        if let Some(appointments) = self.store.appointments_for(participant.id)? {
            let federation = self.store.federation(appointments.details.federation)?;
            sections.push(Section::new(
                "Appointments",
                appointments_fields(&appointments.details, federation.as_ref()),
            ));
        }
        for (index, exhibit) in self
            .store
            .exhibits_for(participant.id)?
            .into_iter()
            .enumerate()
        {
            let subsections = self
                .store
                .participations_for(exhibit.id)?
                .iter()
                .enumerate()
                .map(|(position, participation)| {
                    Section::new(
                        format!("Previous participation #{}", position + 1),
                        participation_fields(&participation.details),
                    )
                })
                .collect();
            sections.push(
                Section::new(format!("Entry #{}", index + 1), exhibit_fields(&exhibit.details))
                    .with_subsections(subsections),
            );
        }
        if let Some(travel) = self.store.travel_details_for(participant.id)? {
            sections.push(Section::new("Travel details", travel_fields(&travel.details)));
        }
        Ok(sections)
    }

    /// Staff-only review: jury group, rejection, floor position and receipt.
    pub fn review_exhibit(
        &self,
        id: ExhibitId,
        review: ExhibitReview,
    ) -> Result<Exhibit, WorkflowError> {
        if review.jury_group == Some(0) {
            let mut errors = FieldErrors::new();
            errors.add(
                "jury_group",
                "Ensure this value is greater than or equal to 1.",
            );
            return Err(errors.into());
        }
        let exhibit = self.store.review_exhibit(id, review)?;
        info!(
            exhibit = %id,
            jury_group = ?review.jury_group,
            rejected = review.rejected,
            start_frame = ?review.start_frame,
            received = review.received,
            "exhibit reviewed"
        );
        Ok(exhibit)
    }

    pub fn delete_participant(&self, id: ParticipantId) -> Result<bool, WorkflowError> {
        let removed = self.store.delete_participant(id)?;
        if removed {
            info!(participant = %id, "participant and dependent records removed");
        }
        Ok(removed)
    }

    pub fn create_federation(&self, form: &FederationForm) -> Result<Federation, WorkflowError> {
        let details = form.validate()?;
        let federation = self.store.insert_federation(details)?;
        info!(federation = %federation.id, country = %federation.details.country_code, "federation created");
        Ok(federation)
    }
}

/// Collapses whitespace and truncates at a word boundary, appending `...`.
pub fn shorten(text: &str, width: usize) -> String {
    const PLACEHOLDER: &str = "...";
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(PLACEHOLDER.len());
    let mut kept = String::new();
    for word in words {
        let extra = if kept.is_empty() { 0 } else { 1 } + word.chars().count();
        if kept.chars().count() + extra > budget {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
    }
    kept.push_str(PLACEHOLDER);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_slugs_parse_back() {
        for step in Step::ALL {
            assert_eq!(step.slug().parse::<Step>(), Ok(step));
        }
        assert_eq!(
            "payment".parse::<Step>(),
            Err(UnknownStep("payment".to_string()))
        );
    }

    #[test]
    fn shorten_keeps_short_text_and_collapses_spaces() {
        assert_eq!(shorten("  Crete   postal history ", 80), "Crete postal history");
    }

    #[test]
    fn shorten_cuts_on_word_boundary() {
        let text = "The postal history of the island of Crete during the period of the Cretan State 1898-1913";
        let short = shorten(text, 80);
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= 80);
        assert!(short.starts_with("The postal history of the island of Crete"));
        assert!(!short.contains("  "));
    }

    #[test]
    fn shorten_single_long_word_yields_placeholder() {
        assert_eq!(shorten(&"x".repeat(100), 10), "...");
    }
}
