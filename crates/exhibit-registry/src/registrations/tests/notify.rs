use std::sync::Arc;

use super::common::*;
use crate::config::MailConfig;
use crate::registrations::notify::{
    DispatchError, NotificationDispatcher, RecipientSource, APPOINTMENTS_NOTICE_TITLE,
    EXHIBIT_NOTICE_TITLE,
};
use crate::registrations::store::RecordStore;
use crate::registrations::workflow::{RegistrationWorkflow, WorkflowError};
use crate::registrations::MemoryRecordStore;

fn fallback_mail() -> MailConfig {
    MailConfig {
        no_commissioner_email: Some("fallback@philatelia.example".to_string()),
        ..mail_config()
    }
}

#[test]
fn greek_exhibit_without_commissioner_goes_to_the_federation_list() {
    let (workflow, store, outbox) = build_workflow_with(exhibition(), fallback_mail());
    store
        .insert_federation(federation_details("GR", "board@hpf.gr, secretary@hpf.gr"))
        .expect("federation");
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Papadopoulos", "GR"))
        .expect("personal saved");

    let outcome = workflow
        .submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 1))
        .expect("exhibit saved");
    let notice = outcome.notice.expect("notice sent");
    assert_eq!(
        notice.recipients,
        vec!["board@hpf.gr".to_string(), "secretary@hpf.gr".to_string()]
    );
    assert_eq!(notice.subject, format!("Philatelia 2026 - {EXHIBIT_NOTICE_TITLE}"));
    assert_eq!(notice.text_body, "Exhibit Registration (in HTML format)");
    assert_eq!(notice.sender, "registrations@philatelia.example");
    assert!(notice.html_body.contains("Dear Commissioner"));
    assert!(notice.html_body.contains("Previous participation #1"));
    assert_eq!(outbox.messages(), vec![notice]);
}

#[test]
fn recipient_chain_prefers_registered_commissioner() {
    let store = Arc::new(MemoryRecordStore::new());
    let outbox = Arc::new(crate::registrations::MemoryOutbox::default());
    let dispatcher =
        NotificationDispatcher::new(store.clone(), outbox, exhibition(), fallback_mail());

    let exhibitor = store
        .upsert_participant(&user("exhibitor"), participant_details("Alpha", "GR"))
        .expect("exhibitor");

    let (recipients, source) = dispatcher
        .exhibit_recipients(&exhibitor)
        .expect("lookup")
        .expect("fallback resolves");
    assert_eq!(source, RecipientSource::GlobalFallback);
    assert_eq!(recipients, vec!["fallback@philatelia.example".to_string()]);

    let mut details = federation_details("GR", "board@hpf.gr");
    details.commissioner_email = Some("commissioner@hpf.gr".to_string());
    let federation = store.insert_federation(details).expect("federation");
    let (recipients, source) = dispatcher
        .exhibit_recipients(&exhibitor)
        .expect("lookup")
        .expect("federation resolves");
    assert_eq!(source, RecipientSource::FederationCommissioner);
    assert_eq!(recipients, vec!["commissioner@hpf.gr".to_string()]);

    let commissioner = store
        .upsert_participant(&user("commissioner"), participant_details("Gamma", "GR"))
        .expect("commissioner");
    let appointments = appointments_form(federation.id.0, true)
        .validate(AUTHORIZATION_KEY)
        .expect("valid appointments");
    store
        .upsert_appointments(commissioner.id, appointments)
        .expect("appointments");

    let (recipients, source) = dispatcher
        .exhibit_recipients(&exhibitor)
        .expect("lookup")
        .expect("commissioner resolves");
    assert_eq!(source, RecipientSource::RegisteredCommissioner);
    assert_eq!(recipients, vec!["gamma@example.org".to_string()]);
}

#[test]
fn no_contact_and_no_fallback_sends_nothing() {
    let (workflow, _, outbox) = build_workflow();
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "CY"))
        .expect("personal saved");
    let outcome = workflow
        .submit_exhibit(&alice, None, &exhibit_form("Cyprus 1880", "C1", 0))
        .expect("exhibit saved");
    assert!(outcome.notice.is_none());
    assert!(outbox.messages().is_empty());
}

#[test]
fn additional_recipients_are_appended_or_replace() {
    let appended = MailConfig {
        additional_recipients: vec!["archive@philatelia.example".to_string()],
        ..fallback_mail()
    };
    let dispatcher = NotificationDispatcher::new(
        Arc::new(MemoryRecordStore::new()),
        Arc::new(crate::registrations::MemoryOutbox::default()),
        exhibition(),
        appended.clone(),
    );
    assert_eq!(
        dispatcher.final_recipients(vec!["board@hpf.gr".to_string()]),
        vec![
            "board@hpf.gr".to_string(),
            "archive@philatelia.example".to_string()
        ]
    );

    let only = MailConfig {
        only_additional_recipients: true,
        ..appended
    };
    let dispatcher = NotificationDispatcher::new(
        Arc::new(MemoryRecordStore::new()),
        Arc::new(crate::registrations::MemoryOutbox::default()),
        exhibition(),
        only,
    );
    assert_eq!(
        dispatcher.final_recipients(vec!["board@hpf.gr".to_string()]),
        vec!["archive@philatelia.example".to_string()]
    );
}

#[test]
fn appointments_notice_goes_to_the_chosen_federation() {
    let (workflow, store, outbox) = build_workflow();
    let federation = store
        .insert_federation(federation_details("GR", "board@hpf.gr"))
        .expect("federation");
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");

    let outcome = workflow
        .submit_appointments(&alice, &appointments_form(federation.id.0, true))
        .expect("appointments saved");
    let notice = outcome.notice.expect("notice sent");
    assert_eq!(notice.recipients, vec!["board@hpf.gr".to_string()]);
    assert_eq!(
        notice.subject,
        format!("Philatelia 2026 - {APPOINTMENTS_NOTICE_TITLE}")
    );
    assert!(notice.html_body.contains("Dear Mr President of the Federation"));
    assert!(notice.html_body.contains("FED Greece - GR Philatelic Federation"));
    assert_eq!(outbox.messages().len(), 1);
}

#[test]
fn notice_values_are_html_escaped() {
    let (workflow, store, outbox) = build_workflow();
    store
        .insert_federation(federation_details("GR", "board@hpf.gr"))
        .expect("federation");
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");
    workflow
        .submit_exhibit(&alice, None, &exhibit_form("<script>Airmail</script>", "C4", 0))
        .expect("exhibit saved");

    let messages = outbox.messages();
    let html = &messages[0].html_body;
    assert!(html.contains("&lt;script&gt;Airmail&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
}

#[test]
fn transport_failure_fails_the_submission() {
    let store = Arc::new(MemoryRecordStore::new());
    let workflow = RegistrationWorkflow::new(
        store.clone(),
        Arc::new(FailingTransport),
        exhibition(),
        fallback_mail(),
    );
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");

    match workflow.submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 0)) {
        Err(WorkflowError::Dispatch(DispatchError::Mail(_))) => {}
        other => panic!("expected dispatch failure, got {other:?}"),
    }
    // the record is saved before the notice goes out
    assert_eq!(store.exhibits().expect("exhibits").len(), 1);
}
