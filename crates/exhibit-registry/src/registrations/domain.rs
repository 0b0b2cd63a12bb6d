use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::countries;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Store-assigned participant key.
    ParticipantId
);
record_id!(FederationId);
record_id!(AppointmentsId);
record_id!(ExhibitId);
record_id!(ParticipationId);
record_id!(TravelDetailsId);

/// Identity of the authenticated account owning a participant record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Maximum number of previous participations recorded per exhibit.
pub const MAX_PARTICIPATIONS_PER_EXHIBIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Title {
    #[default]
    #[serde(rename = "MR")]
    Mr,
    #[serde(rename = "MRS")]
    Mrs,
    #[serde(rename = "MISS")]
    Miss,
    #[serde(rename = "DR")]
    Dr,
    #[serde(rename = "NONE")]
    None,
}

impl Title {
    pub const ALL: [Title; 5] = [Title::Mr, Title::Mrs, Title::Miss, Title::Dr, Title::None];

    pub const fn code(self) -> &'static str {
        match self {
            Title::Mr => "MR",
            Title::Mrs => "MRS",
            Title::Miss => "MISS",
            Title::Dr => "DR",
            Title::None => "NONE",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Title::Mr => "Mr",
            Title::Mrs => "Mrs",
            Title::Miss => "Miss",
            Title::Dr => "Dr",
            Title::None => "None",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|title| title.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccreditedJuror {
    #[serde(rename = "FIP")]
    Fip,
    #[serde(rename = "FEPA")]
    Fepa,
    #[serde(rename = "NAT")]
    National,
}

impl AccreditedJuror {
    pub const ALL: [AccreditedJuror; 3] = [
        AccreditedJuror::Fip,
        AccreditedJuror::Fepa,
        AccreditedJuror::National,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            AccreditedJuror::Fip => "FIP",
            AccreditedJuror::Fepa => "FEPA",
            AccreditedJuror::National => "NAT",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AccreditedJuror::Fip => "FIP",
            AccreditedJuror::Fepa => "FEPA",
            AccreditedJuror::National => "National",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|juror| juror.code() == code)
    }
}

/// Competition category an exhibit is entered under, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExhibitClass {
    B1,
    C1,
    C2,
    C3,
    C4,
    C5,
    C6,
    C7,
    C8,
    C9,
    C10,
    L1,
    L2,
    L3,
    L4,
    L5,
    L6,
    L7,
    L8,
    Y1,
    Y2,
    Y3,
    A4,
}

impl ExhibitClass {
    /// Declared catalog order; intentionally not alphabetical.
    pub const ORDERED: [ExhibitClass; 23] = [
        ExhibitClass::B1,
        ExhibitClass::C1,
        ExhibitClass::C2,
        ExhibitClass::C3,
        ExhibitClass::C4,
        ExhibitClass::C5,
        ExhibitClass::C6,
        ExhibitClass::C7,
        ExhibitClass::C8,
        ExhibitClass::C9,
        ExhibitClass::C10,
        ExhibitClass::L1,
        ExhibitClass::L2,
        ExhibitClass::L3,
        ExhibitClass::L4,
        ExhibitClass::L5,
        ExhibitClass::L6,
        ExhibitClass::L7,
        ExhibitClass::L8,
        ExhibitClass::Y1,
        ExhibitClass::Y2,
        ExhibitClass::Y3,
        ExhibitClass::A4,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            ExhibitClass::B1 => "B1",
            ExhibitClass::C1 => "C1",
            ExhibitClass::C2 => "C2",
            ExhibitClass::C3 => "C3",
            ExhibitClass::C4 => "C4",
            ExhibitClass::C5 => "C5",
            ExhibitClass::C6 => "C6",
            ExhibitClass::C7 => "C7",
            ExhibitClass::C8 => "C8",
            ExhibitClass::C9 => "C9",
            ExhibitClass::C10 => "C10",
            ExhibitClass::L1 => "L1",
            ExhibitClass::L2 => "L2",
            ExhibitClass::L3 => "L3",
            ExhibitClass::L4 => "L4",
            ExhibitClass::L5 => "L5",
            ExhibitClass::L6 => "L6",
            ExhibitClass::L7 => "L7",
            ExhibitClass::L8 => "L8",
            ExhibitClass::Y1 => "Y1",
            ExhibitClass::Y2 => "Y2",
            ExhibitClass::Y3 => "Y3",
            ExhibitClass::A4 => "A4",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExhibitClass::B1 => "B1. Classe des Champions",
            ExhibitClass::C1 => "C1. Traditional Philately",
            ExhibitClass::C2 => "C2. Postal History",
            ExhibitClass::C3 => "C3. Postal Stationery",
            ExhibitClass::C4 => "C4. Aerophilately",
            ExhibitClass::C5 => "C5. Astrophilately",
            ExhibitClass::C6 => "C6. Revenues",
            ExhibitClass::C7 => "C7. Thematic Philately",
            ExhibitClass::C8 => "C8. Maximaphily",
            ExhibitClass::C9 => "C9. Open Philately",
            ExhibitClass::C10 => "C10. Picture Postcards",
            ExhibitClass::L1 => {
                "L1. Philatelic Literature – Books of research nature, specialised catalogues"
            }
            ExhibitClass::L2 => {
                "L2. Philatelic Literature – Books of promotional and documentary character"
            }
            ExhibitClass::L3 => "L3. Philatelic Literature – General catalogues",
            ExhibitClass::L4 => "L4. Philatelic Literature – Periodicals",
            ExhibitClass::L5 => "L5. Philatelic Literature – Articles (collections of)",
            ExhibitClass::L6 => "L6. Philatelic Literature – Websites",
            ExhibitClass::L7 => "L7. Philatelic Literature – Software",
            ExhibitClass::L8 => "L8. Philatelic Literature – Other digital works",
            ExhibitClass::Y1 => "Y1. Youth Philately - Exhibitor’s age 10-15 years",
            ExhibitClass::Y2 => "Y2. Youth Philately - Exhibitor’s age 16-18 years",
            ExhibitClass::Y3 => "Y3. Youth Philately - Exhibitor’s age 19-21 years",
            ExhibitClass::A4 => "A4. Other exhibits (non-competitive)",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ORDERED.into_iter().find(|class| class.code() == code)
    }

    pub const fn is_competitive(self) -> bool {
        !matches!(self, ExhibitClass::A4)
    }

    pub const fn is_literature(self) -> bool {
        matches!(
            self,
            ExhibitClass::L1
                | ExhibitClass::L2
                | ExhibitClass::L3
                | ExhibitClass::L4
                | ExhibitClass::L5
                | ExhibitClass::L6
                | ExhibitClass::L7
                | ExhibitClass::L8
        )
    }

    pub const fn is_youth(self) -> bool {
        matches!(self, ExhibitClass::Y1 | ExhibitClass::Y2 | ExhibitClass::Y3)
    }

    /// Position in the declared order, used as a sort key.
    pub fn position(self) -> usize {
        Self::ORDERED
            .iter()
            .position(|class| *class == self)
            .unwrap_or(Self::ORDERED.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhibitionLevel {
    #[serde(rename = "WORLD")]
    World,
    #[serde(rename = "CONT")]
    Continental,
    #[serde(rename = "INT")]
    International,
    #[serde(rename = "NAT")]
    National,
}

impl ExhibitionLevel {
    pub const ALL: [ExhibitionLevel; 4] = [
        ExhibitionLevel::World,
        ExhibitionLevel::Continental,
        ExhibitionLevel::International,
        ExhibitionLevel::National,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            ExhibitionLevel::World => "WORLD",
            ExhibitionLevel::Continental => "CONT",
            ExhibitionLevel::International => "INT",
            ExhibitionLevel::National => "NAT",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExhibitionLevel::World => "FIP World",
            ExhibitionLevel::Continental => "FEPA/FIAF/FIAP Continental",
            ExhibitionLevel::International => "Other International",
            ExhibitionLevel::National => "National",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medal {
    #[serde(rename = "GPdH")]
    GrandPrixDHonneurCandidate,
    #[serde(rename = "GP")]
    GrandPrixWinner,
    #[serde(rename = "GPC")]
    GrandPrixCandidate,
    #[serde(rename = "LG")]
    LargeGold,
    #[serde(rename = "G")]
    Gold,
    #[serde(rename = "LV")]
    LargeVermeil,
    #[serde(rename = "V")]
    Vermeil,
    #[serde(rename = "LS")]
    LargeSilver,
    #[serde(rename = "S")]
    Silver,
    #[serde(rename = "SB")]
    SilverBronze,
    #[serde(rename = "B")]
    Bronze,
}

impl Medal {
    pub const ALL: [Medal; 11] = [
        Medal::GrandPrixDHonneurCandidate,
        Medal::GrandPrixWinner,
        Medal::GrandPrixCandidate,
        Medal::LargeGold,
        Medal::Gold,
        Medal::LargeVermeil,
        Medal::Vermeil,
        Medal::LargeSilver,
        Medal::Silver,
        Medal::SilverBronze,
        Medal::Bronze,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Medal::GrandPrixDHonneurCandidate => "GPdH",
            Medal::GrandPrixWinner => "GP",
            Medal::GrandPrixCandidate => "GPC",
            Medal::LargeGold => "LG",
            Medal::Gold => "G",
            Medal::LargeVermeil => "LV",
            Medal::Vermeil => "V",
            Medal::LargeSilver => "LS",
            Medal::Silver => "S",
            Medal::SilverBronze => "SB",
            Medal::Bronze => "B",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Medal::GrandPrixDHonneurCandidate => "GPd'H Candidate",
            Medal::GrandPrixWinner => "GP Winner",
            Medal::GrandPrixCandidate => "GP Candidate",
            Medal::LargeGold => "Large Gold",
            Medal::Gold => "Gold",
            Medal::LargeVermeil => "Large Vermeil",
            Medal::Vermeil => "Vermeil",
            Medal::LargeSilver => "Large Silver",
            Medal::Silver => "Silver",
            Medal::SilverBronze => "Silver Bronze",
            Medal::Bronze => "Bronze",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|medal| medal.code() == code)
    }
}

/// Validated personal step data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDetails {
    pub title: Title,
    pub surname: String,
    pub name: String,
    pub photo: Option<String>,
    pub address: String,
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
    pub email: String,
    pub telephone: String,
    pub mobile: String,
    /// `EN` or the configured native language code.
    pub language: String,
    pub remarks: String,
}

impl ParticipantDetails {
    pub fn full_name(&self) -> String {
        format!("{}, {}, {}", self.surname, self.name, self.title.label())
    }

    pub fn country_name(&self) -> &str {
        countries::country_name(&self.country).unwrap_or(&self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub user: UserId,
    #[serde(flatten)]
    pub details: ParticipantDetails,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

/// National philatelic association, one per country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationDetails {
    pub country: String,
    pub country_code: String,
    pub name: String,
    #[serde(default)]
    pub commissioner_email: Option<String>,
    #[serde(default)]
    pub email: String,
}

impl FederationDetails {
    pub fn full_name(&self) -> String {
        format!("FED {} - {}", self.country, self.name)
    }

    /// The comma separated general address list.
    pub fn email_list(&self) -> Vec<String> {
        crate::config::split_addresses(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Federation {
    pub id: FederationId,
    #[serde(flatten)]
    pub details: FederationDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentsDetails {
    pub federation: FederationId,
    pub commissioner: bool,
    pub jury: bool,
    pub apprentice_jury: bool,
    pub accredited_juror: Option<AccreditedJuror>,
    pub accredited_juror_disciplines: String,
    pub team_leader: bool,
    pub team_leader_disciplines: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointments {
    pub id: AppointmentsId,
    pub participant: ParticipantId,
    #[serde(flatten)]
    pub details: AppointmentsDetails,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhibitDetails {
    pub title: String,
    pub short_description: String,
    pub exhibit_class: ExhibitClass,
    pub date_of_birth: Option<NaiveDate>,
    pub frames: u8,
    pub introductory_page: String,
    pub synopsis: Option<String>,
    pub remarks: String,
    pub author: String,
    pub publisher: String,
    pub year_of_publication: Option<i32>,
    pub language: String,
    pub isbn: String,
    pub pages: Option<u32>,
    pub format: String,
    pub frequency: String,
    pub availability: String,
    pub price: String,
}

/// Fields only staff may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExhibitReview {
    #[serde(default)]
    pub jury_group: Option<u32>,
    #[serde(default)]
    pub rejected: bool,
    /// First frame number assigned on the exhibition floor.
    #[serde(default)]
    pub start_frame: Option<u32>,
    /// Set once the exhibit material has arrived.
    #[serde(default)]
    pub received: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exhibit {
    pub id: ExhibitId,
    pub participant: ParticipantId,
    #[serde(flatten)]
    pub details: ExhibitDetails,
    #[serde(flatten)]
    pub review: ExhibitReview,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationDetails {
    pub exhibition_level: ExhibitionLevel,
    pub exhibition_name: String,
    pub points: u8,
    pub medal: Option<Medal>,
    pub special_prize: bool,
    pub felicitations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhibitParticipation {
    pub id: ParticipationId,
    pub exhibit: ExhibitId,
    #[serde(flatten)]
    pub details: ParticipationDetails,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TravelDetailsData {
    pub arrival: Option<NaiveDateTime>,
    pub arrival_flight_number: String,
    pub departure: Option<NaiveDateTime>,
    pub departure_flight_number: String,
    pub ticket_price: String,
    pub spouse: bool,
    pub spouse_surname: String,
    pub spouse_name: String,
    pub hotel: String,
    pub hotel_website: String,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelDetails {
    pub id: TravelDetailsId,
    pub participant: ParticipantId,
    #[serde(flatten)]
    pub details: TravelDetailsData,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

/// An exhibit together with its previous participations, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExhibitEntry {
    pub exhibit: Exhibit,
    pub participations: Vec<ExhibitParticipation>,
}
