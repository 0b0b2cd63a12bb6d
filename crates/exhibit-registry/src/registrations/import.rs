//! Federation seeding from a CSV file with `country,country_code,name,commissioner_email,email` columns.

use std::io::Read;
use std::path::Path;

use tracing::info;

use super::domain::{Federation, FederationDetails};
use super::forms::FederationForm;
use super::store::{RecordStore, StoreError};
use super::validation::FieldErrors;

#[derive(Debug)]
pub enum FederationImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Invalid { line: usize, errors: FieldErrors },
    Store(StoreError),
}

impl std::fmt::Display for FederationImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FederationImportError::Io(err) => write!(f, "failed to read federations file: {}", err),
            FederationImportError::Csv(err) => write!(f, "invalid federations CSV data: {}", err),
            FederationImportError::Invalid { line, errors } => {
                write!(f, "federation row {} rejected: {}", line, errors)
            }
            FederationImportError::Store(err) => write!(f, "could not store federation: {}", err),
        }
    }
}

impl std::error::Error for FederationImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FederationImportError::Io(err) => Some(err),
            FederationImportError::Csv(err) => Some(err),
            FederationImportError::Invalid { errors, .. } => Some(errors),
            FederationImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for FederationImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for FederationImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for FederationImportError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Parses and validates every row; the first invalid row aborts the read.
pub fn read_federations<R: Read>(reader: R) -> Result<Vec<FederationDetails>, FederationImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut federations = Vec::new();

    for (index, record) in csv_reader.deserialize::<FederationForm>().enumerate() {
        let form = record?;
        let details = form
            .validate()
            .map_err(|errors| FederationImportError::Invalid {
                // header is line 1
                line: index + 2,
                errors,
            })?;
        federations.push(details);
    }

    Ok(federations)
}

/// Inserts the rows only when the store holds no federations yet.
pub fn seed_federations<S, R>(store: &S, reader: R) -> Result<Vec<Federation>, FederationImportError>
where
    S: RecordStore + ?Sized,
    R: Read,
{
    if !store.federations()?.is_empty() {
        info!("federations already present, skipping seed");
        return Ok(Vec::new());
    }
    import_federations(store, reader)
}

pub fn seed_federations_from_path<S, P>(
    store: &S,
    path: P,
) -> Result<Vec<Federation>, FederationImportError>
where
    S: RecordStore + ?Sized,
    P: AsRef<Path>,
{
    let file = std::fs::File::open(path)?;
    seed_federations(store, file)
}

/// Validates the whole file before inserting anything.
pub fn import_federations<S, R>(store: &S, reader: R) -> Result<Vec<Federation>, FederationImportError>
where
    S: RecordStore + ?Sized,
    R: Read,
{
    let rows = read_federations(reader)?;
    let mut stored = Vec::with_capacity(rows.len());
    for details in rows {
        stored.push(store.insert_federation(details)?);
    }
    info!(count = stored.len(), "federations imported");
    Ok(stored)
}
