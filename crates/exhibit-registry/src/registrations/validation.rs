use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Field-level validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Folds another set of errors in, prefixing each field.
    pub fn merge_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, messages) in other.0 {
            let key = format!("{prefix}.{field}");
            self.0.entry(key).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        write!(f, "invalid submission ({})", rendered.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

pub(crate) const REQUIRED: &str = "This field is required.";

/// Collects errors while cleaning a submitted form.
pub(crate) struct Cleaner {
    errors: FieldErrors,
}

impl Cleaner {
    pub(crate) fn new() -> Self {
        Self {
            errors: FieldErrors::new(),
        }
    }

    pub(crate) fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub(crate) fn has_error(&self, field: &str) -> bool {
        self.errors.contains(field)
    }

    pub(crate) fn finish(self) -> FieldErrors {
        self.errors
    }

    /// Trimmed text, checked against an optional length cap.
    pub(crate) fn text(&mut self, field: &str, raw: &str, required: bool, max: Option<usize>) -> String {
        let value = raw.trim();
        if value.is_empty() {
            if required {
                self.error(field, REQUIRED);
            }
            return String::new();
        }
        if let Some(max) = max {
            let length = value.chars().count();
            if length > max {
                self.error(
                    field,
                    format!("Ensure this value has at most {max} characters (it has {length})."),
                );
            }
        }
        value.to_string()
    }

    pub(crate) fn optional_text(&mut self, field: &str, raw: &str, max: Option<usize>) -> Option<String> {
        let value = self.text(field, raw, false, max);
        (!value.is_empty()).then_some(value)
    }

    /// Maps a submitted code onto an enumerated choice.
    pub(crate) fn choice<T>(
        &mut self,
        field: &str,
        raw: &str,
        required: bool,
        lookup: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let value = raw.trim();
        if value.is_empty() {
            if required {
                self.error(field, REQUIRED);
            }
            return None;
        }
        match lookup(value) {
            Some(choice) => Some(choice),
            None => {
                self.error(
                    field,
                    format!("Select a valid choice. {value} is not one of the available choices."),
                );
                None
            }
        }
    }

    /// Whole number within an inclusive range.
    pub(crate) fn integer<T>(
        &mut self,
        field: &str,
        raw: &str,
        required: bool,
        min: T,
        max: T,
    ) -> Option<T>
    where
        T: FromStr + PartialOrd + Copy + fmt::Display,
    {
        let value = raw.trim();
        if value.is_empty() {
            if required {
                self.error(field, REQUIRED);
            }
            return None;
        }
        // out-of-type values still deserve a range message rather than a type one
        let parsed = match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) if value.parse::<i128>().is_ok() => {
                let message = if value.starts_with('-') {
                    format!("Ensure this value is greater than or equal to {min}.")
                } else {
                    format!("Ensure this value is less than or equal to {max}.")
                };
                self.error(field, message);
                return None;
            }
            Err(_) => {
                self.error(field, "Enter a whole number.");
                return None;
            }
        };
        if parsed < min {
            self.error(
                field,
                format!("Ensure this value is greater than or equal to {min}."),
            );
            return None;
        }
        if parsed > max {
            self.error(field, format!("Ensure this value is less than or equal to {max}."));
            return None;
        }
        Some(parsed)
    }

    pub(crate) fn date(&mut self, field: &str, raw: &str) -> Option<NaiveDate> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        match parse_date(value) {
            Some(date) => Some(date),
            None => {
                self.error(field, "Enter a valid date.");
                None
            }
        }
    }

    pub(crate) fn datetime(&mut self, field: &str, raw: &str) -> Option<NaiveDateTime> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        match parse_datetime(value) {
            Some(datetime) => Some(datetime),
            None => {
                self.error(field, "Enter a valid date/time.");
                None
            }
        }
    }
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d/%m/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
