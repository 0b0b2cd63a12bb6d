use super::common::*;
use crate::registrations::domain::{ExhibitId, ExhibitReview, Title};
use crate::registrations::store::RecordStore;
use crate::registrations::validation::NON_FIELD_ERRORS;
use crate::registrations::workflow::{Step, StepRecord, WorkflowError};

#[test]
fn steps_require_personal_details_first() {
    let (workflow, _, _) = build_workflow();
    let alice = user("alice");

    for step in [Step::Appointments, Step::Exhibit, Step::Travel] {
        match workflow.open_step(&alice, step, None) {
            Err(WorkflowError::Redirect(Step::Personal)) => {}
            other => panic!("expected redirect for {step}, got {other:?}"),
        }
    }
    match workflow.submit_travel(&alice, &travel_form()) {
        Err(WorkflowError::Redirect(Step::Personal)) => {}
        other => panic!("expected redirect, got {other:?}"),
    }
    match workflow.printout(&alice) {
        Err(WorkflowError::Redirect(Step::Personal)) => {}
        other => panic!("expected redirect, got {other:?}"),
    }

    let view = workflow
        .open_step(&alice, Step::Personal, None)
        .expect("personal step always opens");
    assert!(matches!(
        view.record,
        StepRecord::Personal { participant: None }
    ));
    assert!(!view.overview.required_done);
}

#[test]
fn overview_tracks_completed_steps() {
    let (workflow, store, _) = build_workflow();
    let alice = user("alice");

    let participant = workflow
        .submit_personal(&alice, &participant_form("Papadopoulos", "gr"))
        .expect("personal saved");
    assert_eq!(participant.details.country, "GR");
    assert_eq!(participant.details.title, Title::Dr);
    assert_eq!(participant.details.language, "EN");

    let overview = workflow
        .overview(&alice, Some(Step::Travel))
        .expect("overview");
    assert!(overview.required_done);
    let done: Vec<bool> = overview.steps.iter().map(|status| status.done).collect();
    assert_eq!(done, vec![true, false, false, false]);
    assert!(overview.status(Step::Travel).expect("travel status").current);

    let federation = store
        .insert_federation(federation_details("GR", ""))
        .expect("federation");
    workflow
        .submit_appointments(&alice, &appointments_form(federation.id.0, false))
        .expect("appointments saved");
    workflow
        .submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 1))
        .expect("exhibit saved");
    workflow
        .submit_travel(&alice, &travel_form())
        .expect("travel saved");

    let overview = workflow.overview(&alice, None).expect("overview");
    assert!(overview.steps.iter().all(|status| status.done));
    assert!(overview.steps.iter().all(|status| !status.current));
}

#[test]
fn personal_validation_reports_every_field() {
    let (workflow, store, _) = build_workflow();
    let mut form = participant_form("Papadopoulos", "ZZ");
    form.surname.clear();
    form.language = "FR".to_string();

    match workflow.submit_personal(&user("alice"), &form) {
        Err(WorkflowError::Validation(errors)) => {
            assert!(errors.contains("surname"));
            assert!(errors.contains("country"));
            assert!(errors.contains("language"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
    assert!(store.participants().expect("participants").is_empty());
}

#[test]
fn native_language_is_accepted() {
    let (workflow, _, _) = build_workflow();
    let mut form = participant_form("Papadopoulos", "GR");
    form.language = "el".to_string();
    let participant = workflow
        .submit_personal(&user("alice"), &form)
        .expect("native language accepted");
    assert_eq!(participant.details.language, "EL");
}

#[test]
fn appointments_check_key_and_federation() {
    let (workflow, store, _) = build_workflow();
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Papadopoulos", "GR"))
        .expect("personal saved");
    let federation = store
        .insert_federation(federation_details("GR", ""))
        .expect("federation");

    let mut form = appointments_form(federation.id.0, true);
    form.authorization_key = "guess".to_string();
    match workflow.submit_appointments(&alice, &form) {
        Err(WorkflowError::Validation(errors)) => {
            assert_eq!(
                errors.get("authorization_key"),
                Some(&["Invalid key".to_string()][..])
            );
        }
        other => panic!("expected invalid key, got {other:?}"),
    }

    match workflow.submit_appointments(&alice, &appointments_form(9_999, true)) {
        Err(WorkflowError::Validation(errors)) => assert!(errors.contains("federation")),
        other => panic!("expected unknown federation, got {other:?}"),
    }
    assert!(store.all_appointments().expect("appointments").is_empty());

    let outcome = workflow
        .submit_appointments(&alice, &appointments_form(federation.id.0, true))
        .expect("appointments saved");
    assert!(outcome.appointments.details.commissioner);
    assert!(outcome.notice.is_none(), "federation without address gets no notice");
}

#[test]
fn seventh_participation_is_rejected() {
    let (workflow, store, _) = build_workflow();
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Papadopoulos", "GR"))
        .expect("personal saved");

    match workflow.submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 7)) {
        Err(WorkflowError::Validation(errors)) => {
            assert_eq!(
                errors.get(NON_FIELD_ERRORS),
                Some(&["Please submit at most 6 forms.".to_string()][..])
            );
        }
        other => panic!("expected participation limit error, got {other:?}"),
    }
    assert!(store.exhibits().expect("exhibits").is_empty());

    let outcome = workflow
        .submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 6))
        .expect("six participations fit");
    assert_eq!(outcome.entry.participations.len(), 6);
}

#[test]
fn blank_participation_rows_are_ignored() {
    let (workflow, _, _) = build_workflow();
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Papadopoulos", "GR"))
        .expect("personal saved");
    let mut form = exhibit_form("Airmail", "C4", 2);
    form.participations
        .push(crate::registrations::forms::ParticipationForm::default());

    let outcome = workflow
        .submit_exhibit(&alice, None, &form)
        .expect("exhibit saved");
    assert_eq!(outcome.entry.participations.len(), 2);
}

#[test]
fn exhibits_owned_by_others_redirect_to_the_list() {
    let (workflow, _, _) = build_workflow();
    let alice = user("alice");
    let bob = user("bob");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("alice saved");
    workflow
        .submit_personal(&bob, &participant_form("Beta", "CY"))
        .expect("bob saved");
    let entry = workflow
        .submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 0))
        .expect("exhibit saved")
        .entry;

    match workflow.open_step(&bob, Step::Exhibit, Some(entry.exhibit.id)) {
        Err(WorkflowError::Redirect(Step::Exhibit)) => {}
        other => panic!("expected redirect, got {other:?}"),
    }
    match workflow.submit_exhibit(&bob, Some(entry.exhibit.id), &exhibit_form("Mine", "C1", 0)) {
        Err(WorkflowError::Redirect(Step::Exhibit)) => {}
        other => panic!("expected redirect, got {other:?}"),
    }
    assert!(!workflow
        .remove_exhibit(&bob, entry.exhibit.id)
        .expect("foreign remove is a no-op"));
    assert!(!workflow
        .remove_exhibit(&alice, ExhibitId(9_999))
        .expect("unknown remove is a no-op"));

    let view = workflow
        .open_step(&alice, Step::Exhibit, Some(entry.exhibit.id))
        .expect("owner opens entry");
    assert_eq!(view.form_title, "Edit entry");
    assert!(workflow
        .remove_exhibit(&alice, entry.exhibit.id)
        .expect("owner removes entry"));
}

#[test]
fn exhibit_list_shortens_descriptions() {
    let (workflow, _, _) = build_workflow();
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");
    let mut form = exhibit_form("Airmail", "C4", 0);
    form.short_description = "word ".repeat(40);
    workflow
        .submit_exhibit(&alice, None, &form)
        .expect("exhibit saved");

    let view = workflow
        .open_step(&alice, Step::Exhibit, None)
        .expect("list opens");
    assert_eq!(view.form_title, "Add entry");
    match view.record {
        StepRecord::ExhibitList { exhibits } => {
            assert_eq!(exhibits.len(), 1);
            assert!(exhibits[0].description.ends_with("..."));
            assert!(exhibits[0].description.chars().count() <= 80);
        }
        other => panic!("expected exhibit list, got {other:?}"),
    }
}

#[test]
fn closed_entry_forms_redirect_exhibit_submissions() {
    let mut exhibition = exhibition();
    exhibition.entry_forms_disabled_message = Some("Entry forms are closed.".to_string());
    let (workflow, store, _) = build_workflow_with(exhibition, mail_config());
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");

    match workflow.submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 0)) {
        Err(WorkflowError::Redirect(Step::Personal)) => {}
        other => panic!("expected redirect, got {other:?}"),
    }
    assert!(store.exhibits().expect("exhibits").is_empty());
    let overview = workflow.overview(&alice, None).expect("overview");
    assert_eq!(
        overview.entry_forms_disabled_message.as_deref(),
        Some("Entry forms are closed.")
    );
}

#[test]
fn printout_lists_every_section() {
    let (workflow, store, _) = build_workflow();
    let alice = user("alice");
    workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");
    let federation = store
        .insert_federation(federation_details("GR", ""))
        .expect("federation");
    workflow
        .submit_appointments(&alice, &appointments_form(federation.id.0, false))
        .expect("appointments saved");
    workflow
        .submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 2))
        .expect("first exhibit");
    workflow
        .submit_exhibit(&alice, None, &exhibit_form("Postal history", "C2", 0))
        .expect("second exhibit");
    workflow
        .submit_travel(&alice, &travel_form())
        .expect("travel saved");

    let sections = workflow.printout(&alice).expect("printout");
    let titles: Vec<&str> = sections.iter().map(|section| section.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Personal", "Appointments", "Entry #1", "Entry #2", "Travel details"]
    );
    assert_eq!(sections[2].subsections.len(), 2);
    assert_eq!(sections[2].subsections[1].title, "Previous participation #2");
    assert!(sections[3].subsections.is_empty());
}

#[test]
fn staff_review_and_cascade_delete() {
    let (workflow, store, _) = build_workflow();
    let alice = user("alice");
    let participant = workflow
        .submit_personal(&alice, &participant_form("Alpha", "GR"))
        .expect("personal saved");
    let entry = workflow
        .submit_exhibit(&alice, None, &exhibit_form("Airmail", "C4", 1))
        .expect("exhibit saved")
        .entry;

    match workflow.review_exhibit(
        entry.exhibit.id,
        ExhibitReview {
            jury_group: Some(0),
            ..ExhibitReview::default()
        },
    ) {
        Err(WorkflowError::Validation(errors)) => assert!(errors.contains("jury_group")),
        other => panic!("expected jury group validation, got {other:?}"),
    }
    let reviewed = workflow
        .review_exhibit(
            entry.exhibit.id,
            ExhibitReview {
                jury_group: Some(2),
                start_frame: Some(41),
                ..ExhibitReview::default()
            },
        )
        .expect("review saved");
    assert_eq!(reviewed.review.jury_group, Some(2));
    assert_eq!(reviewed.review.start_frame, Some(41));
    assert!(!reviewed.review.received);

    assert!(workflow
        .delete_participant(participant.id)
        .expect("participant removed"));
    assert!(store.exhibits().expect("exhibits").is_empty());
    assert!(store.participations().expect("participations").is_empty());
    match workflow.open_step(&alice, Step::Exhibit, None) {
        Err(WorkflowError::Redirect(Step::Personal)) => {}
        other => panic!("expected redirect, got {other:?}"),
    }
}

#[test]
fn federation_creation_validates_country_code() {
    let (workflow, _, _) = build_workflow();
    let created = workflow
        .create_federation(&federation_form("GR", "info@hpf.gr"))
        .expect("federation created");
    assert_eq!(created.details.country_code, "GR");

    match workflow.create_federation(&federation_form("QQ", "info@example.org")) {
        Err(WorkflowError::Validation(errors)) => assert!(errors.contains("country_code")),
        other => panic!("expected validation error, got {other:?}"),
    }
}
