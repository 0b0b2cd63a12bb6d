use std::collections::HashMap;
use std::fmt::Display;

use chrono::NaiveDateTime;

use super::ExportError;
use crate::config::NativeLanguage;
use crate::registrations::countries::COUNTRIES;
use crate::registrations::domain::{
    AccreditedJuror, Appointments, Exhibit, ExhibitClass, ExhibitParticipation, ExhibitionLevel,
    Federation, Medal, Participant, ParticipantId, Title, TravelDetails,
};
use crate::registrations::store::{RecordStore, StoreError};

const EXPORT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PARTICIPANT_COLUMNS: [&str; 11] = [
    "id",
    "title_id",
    "surname",
    "name",
    "address",
    "country_id",
    "email",
    "telephone",
    "mobile",
    "language_id",
    "remarks",
];

const APPOINTMENTS_COLUMNS: [&str; 8] = [
    "federation_id",
    "commissioner",
    "jury",
    "apprentice_jury",
    "accredited_juror_id",
    "accredited_juror_disciplines",
    "team_leader",
    "team_leader_disciplines",
];

const TRAVEL_COLUMNS: [&str; 11] = [
    "arrival",
    "arrival_flight_number",
    "departure",
    "departure_flight_number",
    "ticket_price",
    "spouse",
    "spouse_surname",
    "spouse_name",
    "hotel",
    "hotel_website",
    "travel_remarks",
];

const EXHIBIT_COLUMNS: [&str; 24] = [
    "id",
    "registrant_id",
    "title",
    "short_description",
    "exhibit_class",
    "date_of_birth",
    "frames",
    "introductory_page",
    "synopsis",
    "remarks",
    "author",
    "publisher",
    "year_of_publication",
    "language",
    "isbn",
    "pages",
    "format",
    "frequency",
    "availability",
    "price",
    "jury_group",
    "rejected",
    "start_frame",
    "received",
];

const PARTICIPATION_COLUMNS: [&str; 8] = [
    "id",
    "exhibit_id",
    "exhibition_level_id",
    "exhibition_name",
    "points",
    "medal_id",
    "special_prize",
    "felicitations",
];

const FEDERATION_COLUMNS: [&str; 6] = [
    "id",
    "country",
    "country_code",
    "name",
    "commissioner_email",
    "email",
];

/// A header row plus one row of rendered cells per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub name: &'static str,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    fn new(name: &'static str, header: &[&str]) -> Self {
        Self {
            name,
            header: header.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn choices<'a>(name: &'static str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table = Self::new(name, &["id", "value"]);
        table.rows = pairs
            .into_iter()
            .map(|(id, value)| vec![id.to_string(), value.to_string()])
            .collect();
        table
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }

    /// Parses a table previously written by [`ExportTable::to_csv`].
    pub fn from_csv(name: &'static str, bytes: &[u8]) -> Result<Self, ExportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);
        let header = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
        Ok(Self { name, header, rows })
    }
}

/// Multi-line values are re-joined line by line, so `\r\n` becomes `\n`.
pub(crate) fn text(value: &str) -> String {
    value.lines().collect::<Vec<_>>().join("\n")
}

fn optional<T: Display>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Falsy values export as empty cells: `false` and zero leave the cell blank.
fn flag(value: bool) -> String {
    let rendered = if value { "True" } else { "" };
    rendered.to_string()
}

fn number<T: Display + Default + PartialEq>(value: T) -> String {
    if value == T::default() {
        String::new()
    } else {
        value.to_string()
    }
}

fn optional_number<T: Display + Default + PartialEq>(value: Option<T>) -> String {
    value.map(number).unwrap_or_default()
}

fn datetime(value: Option<NaiveDateTime>) -> String {
    optional(value.map(|value| value.format(EXPORT_DATETIME_FORMAT)))
}

fn participant_cells(participant: &Participant) -> Vec<String> {
    let details = &participant.details;
    vec![
        participant.id.to_string(),
        details.title.code().to_string(),
        text(&details.surname),
        text(&details.name),
        text(&details.address),
        details.country.clone(),
        text(&details.email),
        text(&details.telephone),
        text(&details.mobile),
        details.language.clone(),
        text(&details.remarks),
    ]
}

fn appointments_cells(appointments: Option<&Appointments>) -> Vec<String> {
    let Some(appointments) = appointments else {
        return vec![String::new(); APPOINTMENTS_COLUMNS.len()];
    };
    let details = &appointments.details;
    vec![
        details.federation.to_string(),
        flag(details.commissioner),
        flag(details.jury),
        flag(details.apprentice_jury),
        optional(details.accredited_juror.map(AccreditedJuror::code)),
        text(&details.accredited_juror_disciplines),
        flag(details.team_leader),
        text(&details.team_leader_disciplines),
    ]
}

fn travel_cells(travel: Option<&TravelDetails>) -> Vec<String> {
    let Some(travel) = travel else {
        return vec![String::new(); TRAVEL_COLUMNS.len()];
    };
    let details = &travel.details;
    vec![
        datetime(details.arrival),
        text(&details.arrival_flight_number),
        datetime(details.departure),
        text(&details.departure_flight_number),
        text(&details.ticket_price),
        flag(details.spouse),
        text(&details.spouse_surname),
        text(&details.spouse_name),
        text(&details.hotel),
        text(&details.hotel_website),
        text(&details.remarks),
    ]
}

fn exhibit_cells(exhibit: &Exhibit) -> Vec<String> {
    let details = &exhibit.details;
    vec![
        exhibit.id.to_string(),
        exhibit.participant.to_string(),
        text(&details.title),
        text(&details.short_description),
        details.exhibit_class.code().to_string(),
        optional(details.date_of_birth),
        number(details.frames),
        text(&details.introductory_page),
        optional(details.synopsis.as_deref()),
        text(&details.remarks),
        text(&details.author),
        text(&details.publisher),
        optional_number(details.year_of_publication),
        text(&details.language),
        text(&details.isbn),
        optional_number(details.pages),
        text(&details.format),
        text(&details.frequency),
        text(&details.availability),
        text(&details.price),
        optional_number(exhibit.review.jury_group),
        flag(exhibit.review.rejected),
        optional_number(exhibit.review.start_frame),
        flag(exhibit.review.received),
    ]
}

fn participation_cells(participation: &ExhibitParticipation) -> Vec<String> {
    let details = &participation.details;
    vec![
        participation.id.to_string(),
        participation.exhibit.to_string(),
        details.exhibition_level.code().to_string(),
        text(&details.exhibition_name),
        number(details.points),
        optional(details.medal.map(Medal::code)),
        flag(details.special_prize),
        flag(details.felicitations),
    ]
}

fn federation_cells(federation: &Federation) -> Vec<String> {
    let details = &federation.details;
    vec![
        federation.id.to_string(),
        text(&details.country),
        details.country_code.clone(),
        text(&details.name),
        optional(details.commissioner_email.as_deref()),
        text(&details.email),
    ]
}

/// Registrants joined with their optional appointments and travel details.
pub fn registrants_table<S: RecordStore + ?Sized>(store: &S) -> Result<ExportTable, StoreError> {
    let header: Vec<&str> = PARTICIPANT_COLUMNS
        .iter()
        .chain(APPOINTMENTS_COLUMNS.iter())
        .chain(TRAVEL_COLUMNS.iter())
        .copied()
        .collect();
    let mut table = ExportTable::new("registrants", &header);

    let appointments: HashMap<ParticipantId, Appointments> = store
        .all_appointments()?
        .into_iter()
        .map(|row| (row.participant, row))
        .collect();
    let travel: HashMap<ParticipantId, TravelDetails> = store
        .all_travel_details()?
        .into_iter()
        .map(|row| (row.participant, row))
        .collect();

    for participant in store.participants()? {
        let mut row = participant_cells(&participant);
        row.extend(appointments_cells(appointments.get(&participant.id)));
        row.extend(travel_cells(travel.get(&participant.id)));
        table.rows.push(row);
    }
    Ok(table)
}

/// Every flat table of the export, in archive order.
pub fn collect_tables<S: RecordStore + ?Sized>(
    store: &S,
    native: &NativeLanguage,
) -> Result<Vec<ExportTable>, StoreError> {
    let mut exhibits = ExportTable::new("exhibits", &EXHIBIT_COLUMNS);
    exhibits.rows = store.exhibits()?.iter().map(exhibit_cells).collect();

    let mut participations = ExportTable::new("exhibit_participations", &PARTICIPATION_COLUMNS);
    participations.rows = store
        .participations()?
        .iter()
        .map(participation_cells)
        .collect();

    let mut federations = ExportTable::new("federations", &FEDERATION_COLUMNS);
    federations.rows = store.federations()?.iter().map(federation_cells).collect();

    Ok(vec![
        registrants_table(store)?,
        exhibits,
        participations,
        federations,
        ExportTable::choices("countries", COUNTRIES.iter().copied()),
        ExportTable::choices("titles", Title::ALL.map(|title| (title.code(), title.label()))),
        ExportTable::choices(
            "languages",
            [("EN", "English"), (native.code.as_str(), native.label.as_str())],
        ),
        ExportTable::choices(
            "accredited_jurors",
            AccreditedJuror::ALL.map(|juror| (juror.code(), juror.label())),
        ),
        ExportTable::choices(
            "exhibit_classes",
            ExhibitClass::ORDERED.map(|class| (class.code(), class.label())),
        ),
        ExportTable::choices(
            "exhibition_levels",
            ExhibitionLevel::ALL.map(|level| (level.code(), level.label())),
        ),
        ExportTable::choices("medals", Medal::ALL.map(|medal| (medal.code(), medal.label()))),
    ])
}
