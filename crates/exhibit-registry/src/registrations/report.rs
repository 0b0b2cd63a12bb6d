//! Printed catalog grouping.
//!
//! Exhibits are grouped by class in declared order, or by exhibitor country in
//! lexical order of the country name with classes listed inside each country.
//! The inventory mode groups by class but leaves out the literature classes.
//! Within any group entries are stably ordered by exhibitor surname. From the
//! jury group extras level up, a class holding more than one distinct jury
//! group value is split into one section per value, ascending, with unassigned
//! exhibits in a trailing `empty` section. The synopsis level also carries the
//! introductory page and synopsis of every entry.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::str::FromStr;

use rust_xlsxwriter::{Format, Worksheet, XlsxError};
use serde::Serialize;

use super::domain::{Exhibit, ExhibitClass, ExhibitId, Participant, ParticipantId};
use super::printout::escape_html;
use super::store::{RecordStore, StoreError};

pub const EMPTY_JURY_GROUP: &str = "empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    #[default]
    Class,
    Country,
    /// Class grouping without the literature classes.
    Inventory,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown report mode '{0}', expected 'class', 'country' or 'inventory'")]
pub struct UnknownReportMode(pub String);

impl FromStr for ReportMode {
    type Err = UnknownReportMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "class" => Ok(ReportMode::Class),
            "country" => Ok(ReportMode::Country),
            "inventory" => Ok(ReportMode::Inventory),
            other => Err(UnknownReportMode(other.to_string())),
        }
    }
}

/// How much staff detail the catalog carries beyond the plain listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogExtras {
    #[default]
    Plain,
    /// Classes are split into jury group sections.
    JuryGroups,
    /// Jury group sections plus each entry's introductory page and synopsis.
    Synopsis,
}

impl CatalogExtras {
    pub fn jury_groups(self) -> bool {
        self >= CatalogExtras::JuryGroups
    }

    pub fn synopsis(self) -> bool {
        self == CatalogExtras::Synopsis
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown catalog extras level '{0}', expected 0, 1 or 2")]
pub struct UnknownCatalogExtras(pub String);

impl FromStr for CatalogExtras {
    type Err = UnknownCatalogExtras;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" | "plain" => Ok(CatalogExtras::Plain),
            "1" | "true" | "yes" | "on" | "jury_groups" => Ok(CatalogExtras::JuryGroups),
            "2" | "synopsis" => Ok(CatalogExtras::Synopsis),
            other => Err(UnknownCatalogExtras(other.to_string())),
        }
    }
}

/// One catalog line: an accepted exhibit joined with its exhibitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub exhibit: ExhibitId,
    pub participant: ParticipantId,
    pub title: String,
    pub exhibit_class: ExhibitClass,
    pub frames: u8,
    pub jury_group: Option<u32>,
    pub start_frame: Option<u32>,
    pub received: bool,
    pub surname: String,
    pub name: String,
    pub country_code: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introductory_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
}

impl CatalogEntry {
    pub fn new(exhibit: &Exhibit, participant: &Participant) -> Self {
        Self {
            exhibit: exhibit.id,
            participant: participant.id,
            title: exhibit.details.title.clone(),
            exhibit_class: exhibit.details.exhibit_class,
            frames: exhibit.details.frames,
            jury_group: exhibit.review.jury_group,
            start_frame: exhibit.review.start_frame,
            received: exhibit.review.received,
            surname: participant.details.surname.clone(),
            name: participant.details.name.clone(),
            country_code: participant.details.country.clone(),
            country: participant.details.country_name().to_string(),
            introductory_page: Some(exhibit.details.introductory_page.clone())
                .filter(|page| !page.is_empty()),
            synopsis: exhibit
                .details
                .synopsis
                .clone()
                .filter(|synopsis| !synopsis.is_empty()),
        }
    }

    fn without_synopsis(self) -> Self {
        Self {
            introductory_page: None,
            synopsis: None,
            ..self
        }
    }

    pub fn exhibitor(&self) -> String {
        format!("{} {}", self.surname, self.name)
    }
}

/// Entries under a group, optionally titled when a group is subdivided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogGroup {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhibit_class: Option<ExhibitClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub competitive: bool,
    pub sections: Vec<CatalogSection>,
}

impl CatalogGroup {
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.sections.iter().flat_map(|section| section.entries.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub mode: ReportMode,
    pub extras: CatalogExtras,
    pub groups: Vec<CatalogGroup>,
    pub total_exhibits: usize,
    pub total_frames: u32,
}

fn sort_by_surname(entries: &mut [CatalogEntry]) {
    entries.sort_by_cached_key(|entry| entry.surname.to_lowercase());
}

/// Splits a class by jury group when it carries more than one distinct value.
fn class_sections(entries: Vec<CatalogEntry>, extras: CatalogExtras) -> Vec<CatalogSection> {
    let distinct: BTreeSet<Option<u32>> = entries.iter().map(|entry| entry.jury_group).collect();
    if !extras.jury_groups() || distinct.len() < 2 {
        return vec![CatalogSection {
            title: None,
            entries,
        }];
    }

    let mut assigned: BTreeMap<u32, Vec<CatalogEntry>> = BTreeMap::new();
    let mut unassigned = Vec::new();
    for entry in entries {
        match entry.jury_group {
            Some(group) => assigned.entry(group).or_default().push(entry),
            None => unassigned.push(entry),
        }
    }
    let mut sections: Vec<CatalogSection> = assigned
        .into_iter()
        .map(|(group, entries)| CatalogSection {
            title: Some(group.to_string()),
            entries,
        })
        .collect();
    if !unassigned.is_empty() {
        sections.push(CatalogSection {
            title: Some(EMPTY_JURY_GROUP.to_string()),
            entries: unassigned,
        });
    }
    sections
}

fn by_class(entries: Vec<CatalogEntry>, extras: CatalogExtras) -> Vec<CatalogGroup> {
    let mut buckets: HashMap<ExhibitClass, Vec<CatalogEntry>> = HashMap::new();
    for entry in entries {
        buckets.entry(entry.exhibit_class).or_default().push(entry);
    }
    ExhibitClass::ORDERED
        .into_iter()
        .filter_map(|class| {
            let mut entries = buckets.remove(&class)?;
            sort_by_surname(&mut entries);
            Some(CatalogGroup {
                title: class.label().to_string(),
                exhibit_class: Some(class),
                country_code: None,
                competitive: class.is_competitive(),
                sections: class_sections(entries, extras),
            })
        })
        .collect()
}

fn by_country(entries: Vec<CatalogEntry>) -> Vec<CatalogGroup> {
    let mut countries: BTreeMap<(String, String), Vec<CatalogEntry>> = BTreeMap::new();
    for entry in entries {
        countries
            .entry((entry.country.clone(), entry.country_code.clone()))
            .or_default()
            .push(entry);
    }
    countries
        .into_iter()
        .map(|((country, code), entries)| {
            let mut buckets: HashMap<ExhibitClass, Vec<CatalogEntry>> = HashMap::new();
            for entry in entries {
                buckets.entry(entry.exhibit_class).or_default().push(entry);
            }
            let sections: Vec<CatalogSection> = ExhibitClass::ORDERED
                .into_iter()
                .filter_map(|class| {
                    let mut entries = buckets.remove(&class)?;
                    sort_by_surname(&mut entries);
                    Some(CatalogSection {
                        title: Some(class.label().to_string()),
                        entries,
                    })
                })
                .collect();
            let competitive = sections
                .iter()
                .flat_map(|section| section.entries.iter())
                .any(|entry| entry.exhibit_class.is_competitive());
            CatalogGroup {
                title: country,
                exhibit_class: None,
                country_code: Some(code),
                competitive,
                sections,
            }
        })
        .collect()
}

impl CatalogReport {
    /// Groups entries; input order only matters between equal surnames.
    pub fn build(entries: Vec<CatalogEntry>, mode: ReportMode, extras: CatalogExtras) -> Self {
        let entries: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|entry| {
                mode != ReportMode::Inventory || !entry.exhibit_class.is_literature()
            })
            .map(|entry| {
                if extras.synopsis() {
                    entry
                } else {
                    entry.without_synopsis()
                }
            })
            .collect();
        let total_exhibits = entries.len();
        let total_frames = entries.iter().map(|entry| u32::from(entry.frames)).sum();
        let groups = match mode {
            ReportMode::Class | ReportMode::Inventory => by_class(entries, extras),
            ReportMode::Country => by_country(entries),
        };
        Self {
            mode,
            extras,
            groups,
            total_exhibits,
            total_frames,
        }
    }

    /// Reads accepted exhibits from the store; rejected ones are left out.
    pub fn from_store<S: RecordStore + ?Sized>(
        store: &S,
        mode: ReportMode,
        extras: CatalogExtras,
    ) -> Result<Self, StoreError> {
        let participants: HashMap<ParticipantId, Participant> = store
            .participants()?
            .into_iter()
            .map(|participant| (participant.id, participant))
            .collect();
        let entries = store
            .exhibits()?
            .iter()
            .filter(|exhibit| !exhibit.review.rejected)
            .filter_map(|exhibit| {
                participants
                    .get(&exhibit.participant)
                    .map(|participant| CatalogEntry::new(exhibit, participant))
            })
            .collect();
        Ok(Self::build(entries, mode, extras))
    }

    pub fn group(&self, title: &str) -> Option<&CatalogGroup> {
        self.groups.iter().find(|group| group.title == title)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            let _ = writeln!(out, "{}", group.title);
            for section in &group.sections {
                let indent = if let Some(title) = &section.title {
                    let _ = writeln!(out, "  [{title}]");
                    "    "
                } else {
                    "  "
                };
                for entry in &section.entries {
                    let _ = writeln!(
                        out,
                        "{indent}{} ({}) - {} [{} frames]",
                        entry.exhibitor(),
                        entry.country_code,
                        entry.title,
                        entry.frames
                    );
                    if self.extras.synopsis() {
                        let _ = writeln!(
                            out,
                            "{indent}  Introductory page: {}",
                            entry.introductory_page.as_deref().unwrap_or_default()
                        );
                        let _ = writeln!(
                            out,
                            "{indent}  Synopsis: {}",
                            entry.synopsis.as_deref().unwrap_or_default()
                        );
                    }
                }
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "Total: {} exhibits, {} frames",
            self.total_exhibits, self.total_frames
        );
        out
    }

    pub fn to_html(&self, heading: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{0}</title>\n</head>\n<body>\n<h1>{0}</h1>",
            escape_html(heading)
        );
        for group in &self.groups {
            let _ = writeln!(out, "<h2>{}</h2>", escape_html(&group.title));
            for section in &group.sections {
                if let Some(title) = &section.title {
                    let _ = writeln!(out, "<h3>{}</h3>", escape_html(title));
                }
                out.push_str("<table>\n<tr><th>#</th><th>Exhibitor</th><th>Country</th><th>Title</th><th>Frames</th>");
                if self.extras.synopsis() {
                    out.push_str("<th>Introductory page</th><th>Synopsis</th>");
                }
                out.push_str("</tr>\n");
                for (index, entry) in section.entries.iter().enumerate() {
                    let _ = write!(
                        out,
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                        index + 1,
                        escape_html(&entry.exhibitor()),
                        escape_html(&entry.country),
                        escape_html(&entry.title),
                        entry.frames
                    );
                    if self.extras.synopsis() {
                        let _ = write!(
                            out,
                            "<td>{}</td><td>{}</td>",
                            escape_html(entry.introductory_page.as_deref().unwrap_or_default()),
                            escape_html(entry.synopsis.as_deref().unwrap_or_default())
                        );
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</table>\n");
            }
        }
        let _ = writeln!(
            out,
            "<p>Total: {} exhibits, {} frames</p>\n</body>\n</html>",
            self.total_exhibits, self.total_frames
        );
        out
    }

    /// Writes the catalog as a flat sheet, one row per entry.
    pub fn write_sheet(&self, worksheet: &mut Worksheet) -> Result<(), XlsxError> {
        let bold = Format::new().set_bold();
        let header = [
            "group",
            "section",
            "exhibit_id",
            "exhibit_class",
            "title",
            "frames",
            "surname",
            "name",
            "country",
            "jury_group",
            "start_frame",
            "received",
        ];
        for (col, label) in header.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *label, &bold)?;
        }

        let mut row: u32 = 1;
        for group in &self.groups {
            for section in &group.sections {
                for entry in &section.entries {
                    let cells = [
                        group.title.clone(),
                        section.title.clone().unwrap_or_default(),
                        entry.exhibit.to_string(),
                        entry.exhibit_class.code().to_string(),
                        entry.title.clone(),
                        entry.frames.to_string(),
                        entry.surname.clone(),
                        entry.name.clone(),
                        entry.country.clone(),
                        entry
                            .jury_group
                            .map(|group| group.to_string())
                            .unwrap_or_default(),
                        entry
                            .start_frame
                            .map(|frame| frame.to_string())
                            .unwrap_or_default(),
                        if entry.received { "True" } else { "" }.to_string(),
                    ];
                    for (col, value) in cells.iter().enumerate() {
                        worksheet.write_string(row, col as u16, value)?;
                    }
                    row += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, surname: &str, class: ExhibitClass, jury_group: Option<u32>) -> CatalogEntry {
        CatalogEntry {
            exhibit: ExhibitId(id),
            participant: ParticipantId(id),
            title: format!("Exhibit {id}"),
            exhibit_class: class,
            frames: 5,
            jury_group,
            start_frame: None,
            received: false,
            surname: surname.to_string(),
            name: "A".to_string(),
            country_code: "GR".to_string(),
            country: "Greece".to_string(),
            introductory_page: Some(format!("intro-{id}.pdf")),
            synopsis: None,
        }
    }

    #[test]
    fn report_mode_parses_known_values() {
        assert_eq!("country".parse::<ReportMode>(), Ok(ReportMode::Country));
        assert_eq!("".parse::<ReportMode>(), Ok(ReportMode::Class));
        assert_eq!("Inventory".parse::<ReportMode>(), Ok(ReportMode::Inventory));
        assert!("jury".parse::<ReportMode>().is_err());
    }

    #[test]
    fn extras_levels_parse_from_numbers_and_flags() {
        assert_eq!("".parse::<CatalogExtras>(), Ok(CatalogExtras::Plain));
        assert_eq!("0".parse::<CatalogExtras>(), Ok(CatalogExtras::Plain));
        assert_eq!("1".parse::<CatalogExtras>(), Ok(CatalogExtras::JuryGroups));
        assert_eq!("true".parse::<CatalogExtras>(), Ok(CatalogExtras::JuryGroups));
        assert_eq!("2".parse::<CatalogExtras>(), Ok(CatalogExtras::Synopsis));
        assert!("3".parse::<CatalogExtras>().is_err());
        assert!(CatalogExtras::Synopsis.jury_groups());
        assert!(!CatalogExtras::JuryGroups.synopsis());
    }

    #[test]
    fn inventory_leaves_out_literature() {
        let report = CatalogReport::build(
            vec![
                entry(1, "Alpha", ExhibitClass::C1, None),
                entry(2, "Beta", ExhibitClass::L1, None),
                entry(3, "Gamma", ExhibitClass::L4, None),
            ],
            ReportMode::Inventory,
            CatalogExtras::Plain,
        );
        assert_eq!(report.mode, ReportMode::Inventory);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].exhibit_class, Some(ExhibitClass::C1));
        assert_eq!(report.total_exhibits, 1);
        assert_eq!(report.total_frames, 5);
    }

    #[test]
    fn synopsis_level_keeps_introductory_pages() {
        let entries = vec![entry(1, "Alpha", ExhibitClass::C1, Some(1))];
        let plain =
            CatalogReport::build(entries.clone(), ReportMode::Class, CatalogExtras::JuryGroups);
        assert_eq!(plain.groups[0].sections[0].entries[0].introductory_page, None);
        assert!(!plain.to_text().contains("Introductory page"));

        let report = CatalogReport::build(entries, ReportMode::Class, CatalogExtras::Synopsis);
        let text = report.to_text();
        assert!(text.contains(
            "  Alpha A (GR) - Exhibit 1 [5 frames]\n    Introductory page: intro-1.pdf\n    Synopsis: \n"
        ));
        let html = report.to_html("Philatelia");
        assert!(html.contains("<th>Introductory page</th><th>Synopsis</th>"));
        assert!(html.contains("<td>intro-1.pdf</td><td></td></tr>"));
    }

    #[test]
    fn single_jury_group_value_is_not_split() {
        let report = CatalogReport::build(
            vec![
                entry(1, "Zeta", ExhibitClass::C1, Some(2)),
                entry(2, "Alpha", ExhibitClass::C1, Some(2)),
            ],
            ReportMode::Class,
            CatalogExtras::JuryGroups,
        );
        let group = &report.groups[0];
        assert_eq!(group.sections.len(), 1);
        assert_eq!(group.sections[0].title, None);
        let surnames: Vec<&str> = group.entries().map(|e| e.surname.as_str()).collect();
        assert_eq!(surnames, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn totals_cover_every_entry() {
        let report = CatalogReport::build(
            vec![
                entry(1, "A", ExhibitClass::C1, None),
                entry(2, "B", ExhibitClass::A4, None),
            ],
            ReportMode::Class,
            CatalogExtras::Plain,
        );
        assert_eq!(report.total_exhibits, 2);
        assert_eq!(report.total_frames, 10);
        assert!(!report.groups[1].competitive);
    }

    #[test]
    fn text_rendering_lists_sections() {
        let report = CatalogReport::build(
            vec![
                entry(1, "Alpha", ExhibitClass::C1, Some(1)),
                entry(2, "Beta", ExhibitClass::C1, None),
            ],
            ReportMode::Class,
            CatalogExtras::JuryGroups,
        );
        let text = report.to_text();
        assert!(text.contains("C1. Traditional Philately"));
        assert!(text.contains("  [1]\n    Alpha A (GR) - Exhibit 1 [5 frames]"));
        assert!(text.contains("  [empty]\n    Beta A (GR)"));
    }
}
