use chrono::Local;
use clap::{Args, ValueEnum};
use exhibit_registry::config::{AppConfig, ConfigError, StorageConfig};
use exhibit_registry::error::AppError;
use exhibit_registry::registrations::export::{
    collect_tables, export_name, xlsx_workbook, zip_archive,
};
use exhibit_registry::registrations::import::import_federations;
use exhibit_registry::registrations::{
    CatalogExtras, CatalogReport, ReportMode, SqliteRecordStore,
};
use exhibit_registry::telemetry;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum ExportFormat {
    /// One CSV file per table inside a zip archive
    #[default]
    Zip,
    /// One worksheet per table plus the class catalog
    Xlsx,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Zip => "zip",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum ReportFormat {
    #[default]
    Text,
    Html,
    Json,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Zip)]
    pub(crate) format: ExportFormat,
    /// Destination file (defaults to <exhibition>-export-<timestamp>.<ext>)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Leave literature classes out of the workbook catalog sheet
    #[arg(long)]
    pub(crate) inventory: bool,
    /// Registry database to read instead of DATABASE_PATH
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Group by exhibit class, by exhibitor country, or by class without literature
    #[arg(long, value_parser = parse_report_mode, default_value = "class")]
    pub(crate) mode: ReportMode,
    /// 1 splits classes into jury group sections, 2 also lists intro and synopsis
    #[arg(
        long,
        value_parser = parse_catalog_extras,
        num_args = 0..=1,
        default_value = "0",
        default_missing_value = "1"
    )]
    pub(crate) extras: CatalogExtras,
    /// Rendering of the catalog on stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub(crate) format: ReportFormat,
    /// Registry database to read instead of DATABASE_PATH
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportFederationsArgs {
    /// CSV file with country,country_code,name,commissioner_email,email columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Registry database to write instead of DATABASE_PATH
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

fn parse_report_mode(raw: &str) -> Result<ReportMode, String> {
    raw.parse::<ReportMode>().map_err(|err| err.to_string())
}

fn parse_catalog_extras(raw: &str) -> Result<CatalogExtras, String> {
    raw.parse::<CatalogExtras>().map_err(|err| err.to_string())
}

fn open_database(
    storage: &StorageConfig,
    database: Option<PathBuf>,
) -> Result<SqliteRecordStore, AppError> {
    let path = database
        .or_else(|| storage.database_path.clone())
        .ok_or(ConfigError::MissingDatabasePath)?;
    info!(path = %path.display(), "opening registry database");
    Ok(SqliteRecordStore::open(&path)?)
}

fn load_cli_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_cli(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        format,
        output,
        inventory,
        database,
    } = args;

    let config = load_cli_config()?;
    let store = open_database(&config.storage, database)?;
    let tables = collect_tables(&store, &config.exhibition.native_language)?;
    let name = export_name(&config.exhibition, Local::now().naive_local());

    let bytes = match format {
        ExportFormat::Zip => zip_archive(&tables, &name)?,
        ExportFormat::Xlsx => {
            let mode = if inventory {
                ReportMode::Inventory
            } else {
                ReportMode::Class
            };
            let catalog = CatalogReport::from_store(&store, mode, CatalogExtras::Plain)?;
            xlsx_workbook(&tables, &catalog)?
        }
    };
    let output = output.unwrap_or_else(|| PathBuf::from(format!("{name}.{}", format.extension())));
    std::fs::write(&output, &bytes)?;

    println!(
        "Wrote {} tables to {} ({} bytes)",
        tables.len(),
        output.display(),
        bytes.len()
    );
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        mode,
        extras,
        format,
        database,
    } = args;

    let config = load_cli_config()?;
    let store = open_database(&config.storage, database)?;
    let report = CatalogReport::from_store(&store, mode, extras)?;

    match format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Html => print!("{}", report.to_html(&config.exhibition.name)),
        ReportFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
            println!("{rendered}");
        }
    }
    Ok(())
}

pub(crate) fn run_import_federations(args: ImportFederationsArgs) -> Result<(), AppError> {
    let config = load_cli_config()?;
    let store = open_database(&config.storage, args.database)?;
    let file = std::fs::File::open(&args.csv)?;
    let imported = import_federations(&store, file)?;

    println!(
        "Imported {} federations from {}",
        imported.len(),
        args.csv.display()
    );
    for federation in &imported {
        println!(
            "  - {} ({}) {}",
            federation.details.country, federation.details.country_code, federation.details.name
        );
    }
    Ok(())
}
