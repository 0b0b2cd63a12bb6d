use std::fmt::Write as _;

use serde::Serialize;

use super::domain::{
    AppointmentsDetails, ExhibitDetails, Federation, ParticipantDetails, ParticipationDetails,
    TravelDetailsData,
};
use crate::config::NativeLanguage;

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Ordered label/value pairs describing one record.
pub type Fields = Vec<(&'static str, String)>;

/// Titled block of a printout or notification summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub fields: Fields,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(title: impl Into<String>, fields: Fields) -> Self {
        Self {
            title: title.into(),
            fields,
            subsections: Vec::new(),
        }
    }

    pub fn with_subsections(mut self, subsections: Vec<Section>) -> Self {
        self.subsections = subsections;
        self
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, value)| value.as_str())
    }
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "Yes" } else { "No" };
    label.to_string()
}

pub fn language_label(code: &str, native: &NativeLanguage) -> String {
    if code.eq_ignore_ascii_case("EN") {
        "English".to_string()
    } else if code.eq_ignore_ascii_case(&native.code) {
        native.label.clone()
    } else {
        code.to_string()
    }
}

pub fn participant_fields(details: &ParticipantDetails, native: &NativeLanguage) -> Fields {
    vec![
        ("Title", details.title.label().to_string()),
        ("Name", details.name.clone()),
        ("Surname", details.surname.clone()),
        ("Photo", details.photo.clone().unwrap_or_default()),
        ("Address", details.address.clone()),
        ("Country", details.country_name().to_string()),
        ("Language", language_label(&details.language, native)),
        ("Email", details.email.clone()),
        ("Mobile", details.mobile.clone()),
        ("Telephone", details.telephone.clone()),
        ("Remarks", details.remarks.clone()),
    ]
}

pub fn appointments_fields(details: &AppointmentsDetails, federation: Option<&Federation>) -> Fields {
    vec![
        (
            "National federation name",
            federation
                .map(|federation| federation.details.full_name())
                .unwrap_or_default(),
        ),
        ("Appointed national commissioner", yes_no(details.commissioner)),
        ("Proposed as jury member", yes_no(details.jury)),
        ("Proposed as apprentice jury member", yes_no(details.apprentice_jury)),
        (
            "Accredited juror",
            details
                .accredited_juror
                .map(|juror| juror.label().to_string())
                .unwrap_or_default(),
        ),
        (
            "Accredited juror discipline(s)",
            details.accredited_juror_disciplines.clone(),
        ),
        ("Team leader", yes_no(details.team_leader)),
        ("Team leader discipline(s)", details.team_leader_disciplines.clone()),
    ]
}

/// Literature classes print the publication block; youth classes add the birth date.
pub fn exhibit_fields(details: &ExhibitDetails) -> Fields {
    let class = details.exhibit_class;
    let mut fields = vec![
        ("Title", details.title.clone()),
        ("Short description", details.short_description.clone()),
        ("Exhibit class", class.label().to_string()),
        ("Frames", details.frames.to_string()),
    ];
    if class.is_youth() {
        fields.push((
            "Date of birth",
            details
                .date_of_birth
                .map(|date| date.to_string())
                .unwrap_or_default(),
        ));
    }
    let synopsis = details.synopsis.clone().unwrap_or_default();
    if class.is_literature() {
        fields.extend([
            ("Front cover", details.introductory_page.clone()),
            ("Short abstract", synopsis),
            ("Author", details.author.clone()),
            ("Publisher", details.publisher.clone()),
            (
                "Year of publication",
                details
                    .year_of_publication
                    .map(|year| year.to_string())
                    .unwrap_or_default(),
            ),
            ("Language(s)", details.language.clone()),
            ("ISBN/ISSN", details.isbn.clone()),
            (
                "Pages",
                details.pages.map(|pages| pages.to_string()).unwrap_or_default(),
            ),
            ("Format", details.format.clone()),
            ("Frequency", details.frequency.clone()),
            ("Availability", details.availability.clone()),
            ("Price", details.price.clone()),
        ]);
    } else {
        fields.extend([
            ("Introductory page", details.introductory_page.clone()),
            ("Synopsis", synopsis),
        ]);
    }
    fields.push(("Remarks", details.remarks.clone()));
    fields
}

pub fn participation_fields(details: &ParticipationDetails) -> Fields {
    vec![
        ("Exhibition level", details.exhibition_level.label().to_string()),
        ("Exhibition name", details.exhibition_name.clone()),
        ("Points", details.points.to_string()),
        (
            "Award/Medal",
            details
                .medal
                .map(|medal| medal.label().to_string())
                .unwrap_or_default(),
        ),
        ("Special prize", yes_no(details.special_prize)),
        ("Felicitations", yes_no(details.felicitations)),
    ]
}

pub fn travel_fields(details: &TravelDetailsData) -> Fields {
    let when = |value: Option<chrono::NaiveDateTime>| {
        value
            .map(|value| value.format(DATETIME_FORMAT).to_string())
            .unwrap_or_default()
    };
    let mut fields = vec![
        ("Arrival", when(details.arrival)),
        ("Arrival flight number", details.arrival_flight_number.clone()),
        ("Departure", when(details.departure)),
        ("Departure flight number", details.departure_flight_number.clone()),
        ("Ticket price", details.ticket_price.clone()),
        ("Spouse/Partner", yes_no(details.spouse)),
    ];
    if details.spouse {
        fields.extend([
            ("Spouse/Partner name", details.spouse_name.clone()),
            ("Spouse/Partner surname", details.spouse_surname.clone()),
        ]);
    }
    fields.extend([
        ("Hotel", details.hotel.clone()),
        ("Hotel website", details.hotel_website.clone()),
        ("Remarks", details.remarks.clone()),
    ]);
    fields
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escapes a value and keeps its line breaks visible.
fn html_value(raw: &str) -> String {
    raw.lines().map(escape_html).collect::<Vec<_>>().join("<br />")
}

fn write_fields(out: &mut String, fields: &Fields) {
    out.push_str("<table class=\"fields\">\n");
    for (label, value) in fields {
        let _ = writeln!(
            out,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(label),
            html_value(value)
        );
    }
    out.push_str("</table>\n");
}

/// Renders sections as an HTML fragment; `message` is trusted markup.
pub fn render_sections_html(title: &str, message: Option<&str>, sections: &[Section]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<h1>{}</h1>", escape_html(title));
    if let Some(message) = message {
        let _ = writeln!(out, "<p>{message}</p>");
    }
    for section in sections {
        let _ = writeln!(out, "<h2>{}</h2>", escape_html(&section.title));
        write_fields(&mut out, &section.fields);
        for subsection in &section.subsections {
            let _ = writeln!(out, "<h3>{}</h3>", escape_html(&subsection.title));
            write_fields(&mut out, &subsection.fields);
        }
    }
    out
}

/// Full printable document.
pub fn render_document(page_title: &str, heading: &str, sections: &[Section]) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(page_title),
        render_sections_html(heading, None, sections)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrations::domain::ExhibitClass;

    fn exhibit(class: ExhibitClass) -> ExhibitDetails {
        ExhibitDetails {
            title: "Hellenic Airmail".to_string(),
            short_description: "First flights".to_string(),
            exhibit_class: class,
            date_of_birth: None,
            frames: 5,
            introductory_page: "intro.pdf".to_string(),
            synopsis: None,
            remarks: String::new(),
            author: String::new(),
            publisher: String::new(),
            year_of_publication: Some(2019),
            language: String::new(),
            isbn: String::new(),
            pages: None,
            format: String::new(),
            frequency: String::new(),
            availability: String::new(),
            price: String::new(),
        }
    }

    #[test]
    fn literature_entries_use_publication_labels() {
        let fields = exhibit_fields(&exhibit(ExhibitClass::L1));
        let section = Section::new("Entry #1", fields);
        assert_eq!(section.value("Front cover"), Some("intro.pdf"));
        assert_eq!(section.value("Year of publication"), Some("2019"));
        assert_eq!(section.value("Introductory page"), None);
        assert_eq!(section.value("Date of birth"), None);
    }

    #[test]
    fn youth_entries_show_date_of_birth() {
        let section = Section::new("Entry #1", exhibit_fields(&exhibit(ExhibitClass::Y2)));
        assert_eq!(section.value("Date of birth"), Some(""));
        assert_eq!(section.value("Synopsis"), Some(""));
    }

    #[test]
    fn html_rendering_escapes_values() {
        let sections = vec![Section::new(
            "Personal",
            vec![("Remarks", "<b>bold</b>\nsecond line".to_string())],
        )];
        let html = render_sections_html("Print & go", None, &sections);
        assert!(html.contains("<h1>Print &amp; go</h1>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;<br />second line"));
    }

    #[test]
    fn spouse_names_only_when_travelling_with_partner() {
        let mut details = TravelDetailsData::default();
        assert!(!travel_fields(&details).iter().any(|(label, _)| *label == "Spouse/Partner name"));
        details.spouse = true;
        assert!(travel_fields(&details).iter().any(|(label, _)| *label == "Spouse/Partner name"));
    }
}
