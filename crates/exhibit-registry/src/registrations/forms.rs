use serde::Deserialize;

use super::countries;
use super::domain::{
    AccreditedJuror, AppointmentsDetails, ExhibitClass, ExhibitDetails, ExhibitionLevel,
    FederationDetails, FederationId, Medal, ParticipantDetails, ParticipationDetails,
    TravelDetailsData, Title, MAX_PARTICIPATIONS_PER_EXHIBIT,
};
use super::validation::{Cleaner, FieldErrors, NON_FIELD_ERRORS};
use crate::config::NativeLanguage;

/// Raw personal step submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParticipantForm {
    pub title: String,
    pub surname: String,
    pub name: String,
    pub photo: String,
    pub address: String,
    pub country: String,
    pub email: String,
    pub telephone: String,
    pub mobile: String,
    pub language: String,
    pub remarks: String,
}

impl ParticipantForm {
    pub fn validate(&self, native: &NativeLanguage) -> Result<ParticipantDetails, FieldErrors> {
        let mut cleaner = Cleaner::new();

        let title = if self.title.trim().is_empty() {
            Some(Title::default())
        } else {
            cleaner.choice("title", &self.title, true, Title::from_code)
        };
        let surname = cleaner.text("surname", &self.surname, true, Some(128));
        let name = cleaner.text("name", &self.name, true, Some(128));
        let photo = cleaner.optional_text("photo", &self.photo, Some(100));
        let address = cleaner.text("address", &self.address, true, None);
        let country = cleaner
            .choice("country", &self.country, true, |code| {
                countries::is_known(code).then(|| code.to_ascii_uppercase())
            })
            .unwrap_or_default();
        let email = cleaner.text("email", &self.email, true, Some(128));
        let telephone = cleaner.text("telephone", &self.telephone, false, Some(32));
        let mobile = cleaner.text("mobile", &self.mobile, true, Some(32));
        let language = if self.language.trim().is_empty() {
            "EN".to_string()
        } else {
            cleaner
                .choice("language", &self.language, true, |code| {
                    let code = code.to_ascii_uppercase();
                    (code == "EN" || code == native.code).then_some(code)
                })
                .unwrap_or_default()
        };
        let remarks = cleaner.text("remarks", &self.remarks, false, None);

        let errors = cleaner.finish();
        match title {
            Some(title) if errors.is_empty() => Ok(ParticipantDetails {
                title,
                surname,
                name,
                photo,
                address,
                country,
                email,
                telephone,
                mobile,
                language,
                remarks,
            }),
            _ => Err(errors),
        }
    }
}

/// Raw appointments step submission, including the federation key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentsForm {
    pub federation: String,
    pub commissioner: bool,
    pub jury: bool,
    pub apprentice_jury: bool,
    pub accredited_juror: String,
    pub accredited_juror_disciplines: String,
    pub team_leader: bool,
    pub team_leader_disciplines: String,
    pub authorization_key: String,
}

impl AppointmentsForm {
    /// Federation existence is checked by the caller against the store.
    pub fn validate(&self, authorization_key: &str) -> Result<AppointmentsDetails, FieldErrors> {
        let mut cleaner = Cleaner::new();

        let federation = cleaner.integer::<u64>("federation", &self.federation, true, 1, u64::MAX);
        let accredited_juror = cleaner.choice(
            "accredited_juror",
            &self.accredited_juror,
            false,
            AccreditedJuror::from_code,
        );
        let accredited_juror_disciplines = cleaner.text(
            "accredited_juror_disciplines",
            &self.accredited_juror_disciplines,
            false,
            Some(128),
        );
        let team_leader_disciplines = cleaner.text(
            "team_leader_disciplines",
            &self.team_leader_disciplines,
            false,
            Some(128),
        );
        let key = cleaner.text("authorization_key", &self.authorization_key, true, None);
        if !key.is_empty() && key != authorization_key {
            cleaner.error("authorization_key", "Invalid key");
        }

        let errors = cleaner.finish();
        match federation {
            Some(federation) if errors.is_empty() => Ok(AppointmentsDetails {
                federation: FederationId(federation),
                commissioner: self.commissioner,
                jury: self.jury,
                apprentice_jury: self.apprentice_jury,
                accredited_juror,
                accredited_juror_disciplines,
                team_leader: self.team_leader,
                team_leader_disciplines,
            }),
            _ => Err(errors),
        }
    }
}

/// One previous participation row nested in an exhibit submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParticipationForm {
    pub exhibition_level: String,
    pub exhibition_name: String,
    pub points: String,
    pub medal: String,
    pub special_prize: bool,
    pub felicitations: bool,
}

impl ParticipationForm {
    /// Untouched extra rows are dropped instead of reported.
    pub fn is_blank(&self) -> bool {
        self.exhibition_level.trim().is_empty()
            && self.exhibition_name.trim().is_empty()
            && self.points.trim().is_empty()
            && self.medal.trim().is_empty()
            && !self.special_prize
            && !self.felicitations
    }

    pub fn validate(&self) -> Result<ParticipationDetails, FieldErrors> {
        let mut cleaner = Cleaner::new();
        let exhibition_level = cleaner.choice(
            "exhibition_level",
            &self.exhibition_level,
            true,
            ExhibitionLevel::from_code,
        );
        let exhibition_name =
            cleaner.text("exhibition_name", &self.exhibition_name, true, Some(128));
        let points = cleaner.integer::<u8>("points", &self.points, true, 0, 100);
        let medal = cleaner.choice("medal", &self.medal, false, Medal::from_code);

        let errors = cleaner.finish();
        match (exhibition_level, points) {
            (Some(exhibition_level), Some(points)) if errors.is_empty() => {
                Ok(ParticipationDetails {
                    exhibition_level,
                    exhibition_name,
                    points,
                    medal,
                    special_prize: self.special_prize,
                    felicitations: self.felicitations,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Raw exhibit entry submission with its previous participations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExhibitForm {
    pub title: String,
    pub short_description: String,
    pub exhibit_class: String,
    pub date_of_birth: String,
    pub frames: String,
    pub introductory_page: String,
    pub synopsis: String,
    pub remarks: String,
    pub author: String,
    pub publisher: String,
    pub year_of_publication: String,
    pub language: String,
    pub isbn: String,
    pub pages: String,
    pub format: String,
    pub frequency: String,
    pub availability: String,
    pub price: String,
    pub participations: Vec<ParticipationForm>,
}

/// Validated exhibit entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhibitDraft {
    pub details: ExhibitDetails,
    pub participations: Vec<ParticipationDetails>,
}

impl ExhibitForm {
    pub fn validate(&self) -> Result<ExhibitDraft, FieldErrors> {
        let mut cleaner = Cleaner::new();

        let title = cleaner.text("title", &self.title, true, Some(128));
        let short_description =
            cleaner.text("short_description", &self.short_description, true, None);
        let exhibit_class =
            cleaner.choice("exhibit_class", &self.exhibit_class, true, ExhibitClass::from_code);
        let date_of_birth = cleaner.date("date_of_birth", &self.date_of_birth);
        let frames = cleaner.integer::<u8>("frames", &self.frames, true, 0, 8);
        let introductory_page =
            cleaner.text("introductory_page", &self.introductory_page, true, Some(100));
        let synopsis = cleaner.optional_text("synopsis", &self.synopsis, Some(100));
        let remarks = cleaner.text("remarks", &self.remarks, false, None);
        let author = cleaner.text("author", &self.author, false, Some(256));
        let publisher = cleaner.text("publisher", &self.publisher, false, Some(128));
        let year_of_publication = cleaner.integer::<i32>(
            "year_of_publication",
            &self.year_of_publication,
            false,
            1840,
            2100,
        );
        let language = cleaner.text("language", &self.language, false, Some(64));
        let isbn = cleaner.text("isbn", &self.isbn, false, Some(32));
        let pages = cleaner.integer::<u32>("pages", &self.pages, false, 1, u32::MAX);
        let format = cleaner.text("format", &self.format, false, Some(64));
        let frequency = cleaner.text("frequency", &self.frequency, false, Some(64));
        let availability = cleaner.text("availability", &self.availability, false, Some(64));
        let price = cleaner.text("price", &self.price, false, Some(64));

        let mut errors = cleaner.finish();

        let rows: Vec<(usize, &ParticipationForm)> = self
            .participations
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_blank())
            .collect();
        if rows.len() > MAX_PARTICIPATIONS_PER_EXHIBIT {
            errors.add(
                NON_FIELD_ERRORS,
                format!("Please submit at most {MAX_PARTICIPATIONS_PER_EXHIBIT} forms."),
            );
        }
        let mut participations = Vec::with_capacity(rows.len());
        for (index, row) in rows {
            match row.validate() {
                Ok(details) => participations.push(details),
                Err(row_errors) => {
                    errors.merge_prefixed(&format!("participations[{index}]"), row_errors)
                }
            }
        }

        match (exhibit_class, frames) {
            (Some(exhibit_class), Some(frames)) if errors.is_empty() => Ok(ExhibitDraft {
                details: ExhibitDetails {
                    title,
                    short_description,
                    exhibit_class,
                    date_of_birth,
                    frames,
                    introductory_page,
                    synopsis,
                    remarks,
                    author,
                    publisher,
                    year_of_publication,
                    language,
                    isbn,
                    pages,
                    format,
                    frequency,
                    availability,
                    price,
                },
                participations,
            }),
            _ => Err(errors),
        }
    }
}

/// Raw travel step submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TravelForm {
    pub arrival: String,
    pub arrival_flight_number: String,
    pub departure: String,
    pub departure_flight_number: String,
    pub ticket_price: String,
    pub spouse: bool,
    pub spouse_surname: String,
    pub spouse_name: String,
    pub hotel: String,
    pub hotel_website: String,
    pub remarks: String,
}

impl TravelForm {
    pub fn validate(&self) -> Result<TravelDetailsData, FieldErrors> {
        let mut cleaner = Cleaner::new();
        let details = TravelDetailsData {
            arrival: cleaner.datetime("arrival", &self.arrival),
            arrival_flight_number: cleaner.text(
                "arrival_flight_number",
                &self.arrival_flight_number,
                false,
                Some(8),
            ),
            departure: cleaner.datetime("departure", &self.departure),
            departure_flight_number: cleaner.text(
                "departure_flight_number",
                &self.departure_flight_number,
                false,
                Some(8),
            ),
            ticket_price: cleaner.text("ticket_price", &self.ticket_price, false, Some(64)),
            spouse: self.spouse,
            spouse_surname: cleaner.text("spouse_surname", &self.spouse_surname, false, Some(128)),
            spouse_name: cleaner.text("spouse_name", &self.spouse_name, false, Some(128)),
            hotel: cleaner.text("hotel", &self.hotel, false, Some(128)),
            hotel_website: cleaner.text("hotel_website", &self.hotel_website, false, Some(256)),
            remarks: cleaner.text("remarks", &self.remarks, false, None),
        };
        cleaner.finish().into_result(details)
    }
}

/// Staff-side federation entry, also the shape of federation CSV rows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FederationForm {
    pub country: String,
    pub country_code: String,
    pub name: String,
    pub commissioner_email: String,
    pub email: String,
}

impl FederationForm {
    pub fn validate(&self) -> Result<FederationDetails, FieldErrors> {
        let mut cleaner = Cleaner::new();
        let country = cleaner.text("country", &self.country, true, Some(32));
        let country_code = cleaner.text("country_code", &self.country_code, true, Some(2));
        if !country_code.is_empty()
            && !cleaner.has_error("country_code")
            && !countries::is_known(&country_code)
        {
            cleaner.error(
                "country_code",
                format!("Select a valid choice. {country_code} is not one of the available choices."),
            );
        }
        let name = cleaner.text("name", &self.name, true, Some(128));
        let commissioner_email =
            cleaner.optional_text("commissioner_email", &self.commissioner_email, Some(128));
        let email = cleaner.text("email", &self.email, true, Some(128));
        let details = FederationDetails {
            country,
            country_code: country_code.to_ascii_uppercase(),
            name,
            commissioner_email,
            email,
        };
        cleaner.finish().into_result(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native() -> NativeLanguage {
        NativeLanguage::default()
    }

    fn participant_form() -> ParticipantForm {
        ParticipantForm {
            surname: "Papadopoulos".to_string(),
            name: "Nikos".to_string(),
            address: "1 Ermou St, Athens".to_string(),
            country: "gr".to_string(),
            email: "nikos@example.org".to_string(),
            mobile: "+30 690 000 0000".to_string(),
            ..ParticipantForm::default()
        }
    }

    #[test]
    fn participant_defaults_title_and_language() {
        let details = participant_form().validate(&native()).expect("valid form");
        assert_eq!(details.title, Title::Mr);
        assert_eq!(details.language, "EN");
        assert_eq!(details.country, "GR");
        assert_eq!(details.photo, None);
    }

    #[test]
    fn participant_accepts_native_language_only() {
        let mut form = participant_form();
        form.language = "el".to_string();
        assert_eq!(form.validate(&native()).expect("valid").language, "EL");

        form.language = "FR".to_string();
        let errors = form.validate(&native()).expect_err("FR not offered");
        assert!(errors.contains("language"));
    }

    #[test]
    fn participant_reports_every_missing_field() {
        let errors = ParticipantForm::default()
            .validate(&native())
            .expect_err("empty form rejected");
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(
            fields,
            vec!["address", "country", "email", "mobile", "name", "surname"]
        );
    }

    #[test]
    fn appointments_require_matching_key() {
        let form = AppointmentsForm {
            federation: "3".to_string(),
            commissioner: true,
            authorization_key: "wrong".to_string(),
            ..AppointmentsForm::default()
        };
        let errors = form.validate("KEY").expect_err("bad key");
        assert_eq!(errors.get("authorization_key"), Some(&["Invalid key".to_string()][..]));

        let form = AppointmentsForm {
            authorization_key: "KEY".to_string(),
            ..form
        };
        let details = form.validate("KEY").expect("key accepted");
        assert_eq!(details.federation, FederationId(3));
        assert!(details.commissioner);
    }

    fn participation_row(points: &str) -> ParticipationForm {
        ParticipationForm {
            exhibition_level: "NAT".to_string(),
            exhibition_name: "Athens 2019".to_string(),
            points: points.to_string(),
            medal: "LV".to_string(),
            ..ParticipationForm::default()
        }
    }

    fn exhibit_form() -> ExhibitForm {
        ExhibitForm {
            title: "Crete 1898-1913".to_string(),
            short_description: "Postal history of the Cretan State".to_string(),
            exhibit_class: "C2".to_string(),
            frames: "5".to_string(),
            introductory_page: "intro.pdf".to_string(),
            ..ExhibitForm::default()
        }
    }

    #[test]
    fn exhibit_skips_blank_rows_and_keeps_order() {
        let mut form = exhibit_form();
        form.participations = vec![
            participation_row("82"),
            ParticipationForm::default(),
            participation_row("85"),
        ];
        let draft = form.validate().expect("valid exhibit");
        let points: Vec<u8> = draft.participations.iter().map(|p| p.points).collect();
        assert_eq!(points, vec![82, 85]);
        assert_eq!(draft.details.exhibit_class, ExhibitClass::C2);
    }

    #[test]
    fn exhibit_rejects_seventh_participation() {
        let mut form = exhibit_form();
        form.participations = (0..7).map(|_| participation_row("80")).collect();
        let errors = form.validate().expect_err("seven rows rejected");
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&["Please submit at most 6 forms.".to_string()][..])
        );
    }

    #[test]
    fn exhibit_prefixes_nested_row_errors() {
        let mut form = exhibit_form();
        form.frames = "9".to_string();
        form.participations = vec![participation_row("101")];
        let errors = form.validate().expect_err("invalid");
        assert!(errors.contains("frames"));
        assert!(errors.contains("participations[0].points"));
    }

    #[test]
    fn travel_parses_datetimes_and_caps_flight_numbers() {
        let form = TravelForm {
            arrival: "2021-11-20 14:30".to_string(),
            arrival_flight_number: "A3-601-XYZ".to_string(),
            ..TravelForm::default()
        };
        let errors = form.validate().expect_err("flight number too long");
        assert!(errors.contains("arrival_flight_number"));
        assert!(!errors.contains("arrival"));
    }

    #[test]
    fn federation_rejects_unknown_country_code() {
        let form = FederationForm {
            country: "Atlantis".to_string(),
            country_code: "QQ".to_string(),
            name: "Atlantean Philatelists".to_string(),
            email: "info@atlantis.example".to_string(),
            ..FederationForm::default()
        };
        assert!(form.validate().expect_err("unknown code").contains("country_code"));
    }
}
