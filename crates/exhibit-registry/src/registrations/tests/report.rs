use std::collections::HashSet;

use super::common::*;
use crate::registrations::domain::{ExhibitClass, ExhibitId, ExhibitReview};
use crate::registrations::report::{CatalogExtras, CatalogReport, ReportMode, EMPTY_JURY_GROUP};
use crate::registrations::store::RecordStore;

struct Seeded {
    ids: Vec<ExhibitId>,
}

/// Greek and Cypriot exhibitors across three classes, one A4 exhibit.
fn seed(store: &dyn RecordStore) -> Seeded {
    let zeta = store
        .upsert_participant(&user("zeta"), participant_details("Zeta", "GR"))
        .expect("participant");
    let alpha = store
        .upsert_participant(&user("alpha"), participant_details("Alpha", "CY"))
        .expect("participant");
    let mu = store
        .upsert_participant(&user("mu"), participant_details("Mu", "GR"))
        .expect("participant");

    let mut ids = Vec::new();
    for (owner, title, class) in [
        (zeta.id, "Cretan State", ExhibitClass::C2),
        (alpha.id, "Cyprus Airmail", ExhibitClass::C4),
        (mu.id, "Olympic Games", ExhibitClass::C2),
        (alpha.id, "Postal stationery", ExhibitClass::C2),
        (mu.id, "Club archive", ExhibitClass::A4),
    ] {
        let entry = store
            .insert_exhibit(owner, exhibit_details(title, class), Vec::new())
            .expect("exhibit");
        ids.push(entry.exhibit.id);
    }
    Seeded { ids }
}

fn review(store: &dyn RecordStore, id: ExhibitId, jury_group: Option<u32>, rejected: bool) {
    store
        .review_exhibit(
            id,
            ExhibitReview {
                jury_group,
                rejected,
                ..ExhibitReview::default()
            },
        )
        .expect("review");
}

#[test]
fn classes_without_exhibits_are_absent() {
    for_each_store(|store| {
        seed(store);
        let report = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::Plain)
            .expect("report");
        let titles: Vec<&str> = report.groups.iter().map(|group| group.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                ExhibitClass::C2.label(),
                ExhibitClass::C4.label(),
                ExhibitClass::A4.label()
            ]
        );
        assert!(report.group(ExhibitClass::C1.label()).is_none());
        assert_eq!(report.total_exhibits, 5);
        assert!(report.groups[0].competitive);
        assert!(!report.groups[2].competitive);
    });
}

#[test]
fn entries_are_ordered_by_surname() {
    for_each_store(|store| {
        seed(store);
        let report = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::Plain)
            .expect("report");
        let postal_history = report
            .group(ExhibitClass::C2.label())
            .expect("C2 group present");
        let surnames: Vec<&str> = postal_history
            .entries()
            .map(|entry| entry.surname.as_str())
            .collect();
        assert_eq!(surnames, vec!["Alpha", "Mu", "Zeta"]);
    });
}

#[test]
fn jury_groups_split_into_disjoint_sections() {
    for_each_store(|store| {
        let seeded = seed(store);
        review(store, seeded.ids[0], Some(2), false);
        review(store, seeded.ids[2], Some(1), false);

        let report = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::JuryGroups)
            .expect("report");
        let postal_history = report
            .group(ExhibitClass::C2.label())
            .expect("C2 group present");
        let titles: Vec<Option<&str>> = postal_history
            .sections
            .iter()
            .map(|section| section.title.as_deref())
            .collect();
        assert_eq!(titles, vec![Some("1"), Some("2"), Some(EMPTY_JURY_GROUP)]);

        let mut seen = HashSet::new();
        for section in &postal_history.sections {
            for entry in &section.entries {
                assert!(seen.insert(entry.exhibit), "exhibit listed twice");
            }
        }
        assert_eq!(seen.len(), 3);

        let without_extras =
            CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::Plain)
                .expect("report");
        let postal_history = without_extras
            .group(ExhibitClass::C2.label())
            .expect("C2 group present");
        assert_eq!(postal_history.sections.len(), 1);
        assert_eq!(postal_history.sections[0].title, None);
    });
}

#[test]
fn rejected_exhibits_are_left_out() {
    for_each_store(|store| {
        let seeded = seed(store);
        review(store, seeded.ids[1], None, true);
        let report = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::Plain)
            .expect("report");
        assert!(report.group(ExhibitClass::C4.label()).is_none());
        assert_eq!(report.total_exhibits, 4);
    });
}

#[test]
fn country_mode_orders_countries_by_name() {
    for_each_store(|store| {
        seed(store);
        let report =
            CatalogReport::from_store(store, ReportMode::Country, CatalogExtras::Plain)
                .expect("report");
        let countries: Vec<&str> = report.groups.iter().map(|group| group.title.as_str()).collect();
        assert_eq!(countries, vec!["Cyprus", "Greece"]);

        let greece = report.group("Greece").expect("Greece group present");
        assert_eq!(greece.country_code.as_deref(), Some("GR"));
        let classes: Vec<Option<&str>> = greece
            .sections
            .iter()
            .map(|section| section.title.as_deref())
            .collect();
        assert_eq!(
            classes,
            vec![
                Some(ExhibitClass::C2.label()),
                Some(ExhibitClass::A4.label())
            ]
        );
        let surnames: Vec<&str> = greece.sections[0]
            .entries
            .iter()
            .map(|entry| entry.surname.as_str())
            .collect();
        assert_eq!(surnames, vec!["Mu", "Zeta"]);
    });
}

#[test]
fn empty_store_renders_an_empty_catalog() {
    for_each_store(|store| {
        let report = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::JuryGroups)
            .expect("report");
        assert!(report.groups.is_empty());
        assert!(report.to_text().contains("Total: 0 exhibits, 0 frames"));
        let html = report.to_html("Philatelia 2026");
        assert!(html.contains("<h1>Philatelia 2026</h1>"));
        assert!(!html.contains("<h2>"));
    });
}

#[test]
fn html_escapes_exhibit_titles() {
    let store = crate::registrations::MemoryRecordStore::new();
    let owner = store
        .upsert_participant(&user("alpha"), participant_details("Alpha", "GR"))
        .expect("participant");
    store
        .insert_exhibit(
            owner.id,
            exhibit_details("Stamps & <Covers>", ExhibitClass::C1),
            Vec::new(),
        )
        .expect("exhibit");
    let report = CatalogReport::from_store(&store, ReportMode::Class, CatalogExtras::Plain)
        .expect("report");
    let html = report.to_html("Catalog");
    assert!(html.contains("Stamps &amp; &lt;Covers&gt;"));
    assert_eq!(report.groups[0].sections[0].entries[0].participant, owner.id);
}

#[test]
fn inventory_mode_skips_literature_classes() {
    for_each_store(|store| {
        seed(store);
        let author = store
            .upsert_participant(&user("beta"), participant_details("Beta", "GR"))
            .expect("participant");
        store
            .insert_exhibit(
                author.id,
                exhibit_details("Handbook of Greek postmarks", ExhibitClass::L1),
                Vec::new(),
            )
            .expect("literature exhibit");

        let full = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::Plain)
            .expect("report");
        assert!(full.group(ExhibitClass::L1.label()).is_some());
        assert_eq!(full.total_exhibits, 6);

        let inventory =
            CatalogReport::from_store(store, ReportMode::Inventory, CatalogExtras::Plain)
                .expect("report");
        assert!(inventory.group(ExhibitClass::L1.label()).is_none());
        assert!(inventory
            .groups
            .iter()
            .all(|group| group.exhibit_class.is_some_and(|class| !class.is_literature())));
        assert_eq!(inventory.total_exhibits, 5);
        assert_eq!(inventory.total_frames, 25);
    });
}

#[test]
fn synopsis_level_lists_intro_files_per_entry() {
    for_each_store(|store| {
        let owner = store
            .upsert_participant(&user("alpha"), participant_details("Alpha", "GR"))
            .expect("participant");
        let mut details = exhibit_details("Airmail", ExhibitClass::C4);
        details.synopsis = Some("airmail-synopsis.pdf".to_string());
        store.insert_exhibit(owner.id, details, Vec::new()).expect("exhibit");

        let jury_only =
            CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::JuryGroups)
                .expect("report");
        let entry = &jury_only.groups[0].sections[0].entries[0];
        assert_eq!(entry.introductory_page, None);
        assert_eq!(entry.synopsis, None);

        let report = CatalogReport::from_store(store, ReportMode::Class, CatalogExtras::Synopsis)
            .expect("report");
        let entry = &report.groups[0].sections[0].entries[0];
        assert_eq!(entry.introductory_page.as_deref(), Some("intro.pdf"));
        assert_eq!(entry.synopsis.as_deref(), Some("airmail-synopsis.pdf"));
        let html = report.to_html("Philatelia 2026");
        assert!(html.contains("<td>intro.pdf</td><td>airmail-synopsis.pdf</td>"));
        assert!(report.to_text().contains("Synopsis: airmail-synopsis.pdf"));
    });
}
