use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::config::{ExhibitionConfig, MailConfig, NativeLanguage};
use crate::registrations::domain::{
    ExhibitClass, ExhibitDetails, FederationDetails, ParticipantDetails, Title, UserId,
};
use crate::registrations::forms::{
    AppointmentsForm, ExhibitForm, FederationForm, ParticipantForm, ParticipationForm, TravelForm,
};
use crate::registrations::notify::{MailError, MailTransport, MemoryOutbox, OutgoingMail};
use crate::registrations::store::RecordStore;
use crate::registrations::{
    registration_router, MemoryRecordStore, RegistrationApi, RegistrationWorkflow,
    SqliteRecordStore,
};

pub(super) const AUTHORIZATION_KEY: &str = "philatelia";
pub(super) const STAFF_TOKEN: &str = "staff-secret";

pub(super) fn exhibition() -> ExhibitionConfig {
    ExhibitionConfig {
        name: "Philatelia 2026".to_string(),
        url: "https://philatelia.example".to_string(),
        email: "info@philatelia.example".to_string(),
        native_language: NativeLanguage::default(),
        appointments_authorization_key: AUTHORIZATION_KEY.to_string(),
        entry_forms_disabled_message: None,
        entry_forms_submit_message: None,
        general_commissioner_email: None,
    }
}

pub(super) fn mail_config() -> MailConfig {
    MailConfig {
        sender: "registrations@philatelia.example".to_string(),
        ..MailConfig::default()
    }
}

pub(super) fn user(name: &str) -> UserId {
    UserId(name.to_string())
}

pub(super) fn participant_form(surname: &str, country: &str) -> ParticipantForm {
    ParticipantForm {
        title: "DR".to_string(),
        surname: surname.to_string(),
        name: "Nikos".to_string(),
        address: "1 Stadiou Street\nAthens".to_string(),
        country: country.to_string(),
        email: format!("{}@example.org", surname.to_lowercase()),
        mobile: "+30 690 000 0000".to_string(),
        ..ParticipantForm::default()
    }
}

pub(super) fn participant_details(surname: &str, country: &str) -> ParticipantDetails {
    ParticipantDetails {
        title: Title::Mr,
        surname: surname.to_string(),
        name: "Eleni".to_string(),
        photo: None,
        address: "Athens".to_string(),
        country: country.to_string(),
        email: format!("{}@example.org", surname.to_lowercase()),
        telephone: String::new(),
        mobile: "+30 690 000 0001".to_string(),
        language: "EN".to_string(),
        remarks: String::new(),
    }
}

pub(super) fn federation_details(country_code: &str, email: &str) -> FederationDetails {
    FederationDetails {
        country: crate::registrations::countries::country_name(country_code)
            .unwrap_or(country_code)
            .to_string(),
        country_code: country_code.to_string(),
        name: format!("{country_code} Philatelic Federation"),
        commissioner_email: None,
        email: email.to_string(),
    }
}

pub(super) fn federation_form(country_code: &str, email: &str) -> FederationForm {
    let details = federation_details(country_code, email);
    FederationForm {
        country: details.country,
        country_code: details.country_code,
        name: details.name,
        commissioner_email: String::new(),
        email: details.email,
    }
}

pub(super) fn appointments_form(federation: u64, commissioner: bool) -> AppointmentsForm {
    AppointmentsForm {
        federation: federation.to_string(),
        commissioner,
        jury: !commissioner,
        accredited_juror: "FIP".to_string(),
        accredited_juror_disciplines: "Postal History".to_string(),
        authorization_key: AUTHORIZATION_KEY.to_string(),
        ..AppointmentsForm::default()
    }
}

pub(super) fn participation_form(points: u8) -> ParticipationForm {
    ParticipationForm {
        exhibition_level: "INT".to_string(),
        exhibition_name: format!("Exhibition {points}"),
        points: points.to_string(),
        medal: "LV".to_string(),
        ..ParticipationForm::default()
    }
}

pub(super) fn exhibit_form(title: &str, class: &str, participations: usize) -> ExhibitForm {
    ExhibitForm {
        title: title.to_string(),
        short_description: "Development of the airmail routes through Athens, 1926 to 1939."
            .to_string(),
        exhibit_class: class.to_string(),
        frames: "5".to_string(),
        introductory_page: "intro.pdf".to_string(),
        participations: (0..participations)
            .map(|index| participation_form(70 + index as u8))
            .collect(),
        ..ExhibitForm::default()
    }
}

pub(super) fn exhibit_details(title: &str, class: ExhibitClass) -> ExhibitDetails {
    ExhibitDetails {
        title: title.to_string(),
        short_description: "An exhibit".to_string(),
        exhibit_class: class,
        date_of_birth: None,
        frames: 5,
        introductory_page: "intro.pdf".to_string(),
        synopsis: None,
        remarks: String::new(),
        author: String::new(),
        publisher: String::new(),
        year_of_publication: None,
        language: String::new(),
        isbn: String::new(),
        pages: None,
        format: String::new(),
        frequency: String::new(),
        availability: String::new(),
        price: String::new(),
    }
}

pub(super) fn travel_form() -> TravelForm {
    TravelForm {
        arrival: "2026-11-20 14:30".to_string(),
        arrival_flight_number: "A3 601".to_string(),
        departure: "2026-11-24 09:15".to_string(),
        departure_flight_number: "A3 602".to_string(),
        spouse: true,
        spouse_surname: "Papadopoulou".to_string(),
        spouse_name: "Maria".to_string(),
        hotel: "Grande Bretagne".to_string(),
        ..TravelForm::default()
    }
}

pub(super) type MemoryWorkflow = RegistrationWorkflow<MemoryRecordStore, MemoryOutbox>;

pub(super) fn build_workflow_with(
    exhibition: ExhibitionConfig,
    mail: MailConfig,
) -> (MemoryWorkflow, Arc<MemoryRecordStore>, MemoryOutbox) {
    let store = Arc::new(MemoryRecordStore::new());
    let outbox = MemoryOutbox::default();
    let workflow =
        RegistrationWorkflow::new(store.clone(), Arc::new(outbox.clone()), exhibition, mail);
    (workflow, store, outbox)
}

pub(super) fn build_workflow() -> (MemoryWorkflow, Arc<MemoryRecordStore>, MemoryOutbox) {
    build_workflow_with(exhibition(), mail_config())
}

pub(super) fn sqlite_store() -> SqliteRecordStore {
    SqliteRecordStore::in_memory().expect("in-memory sqlite opens")
}

/// Runs a scenario against both store implementations.
pub(super) fn for_each_store(scenario: impl Fn(&dyn RecordStore)) {
    scenario(&MemoryRecordStore::new());
    scenario(&sqlite_store());
}

/// Transport that refuses every message.
pub(super) struct FailingTransport;

impl MailTransport for FailingTransport {
    fn send(&self, _mail: &OutgoingMail) -> Result<(), MailError> {
        Err(MailError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) fn router_with(
    workflow: MemoryWorkflow,
    staff_token: Option<&str>,
) -> axum::Router {
    registration_router(Arc::new(RegistrationApi::new(
        workflow,
        staff_token.map(str::to_string),
    )))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}
