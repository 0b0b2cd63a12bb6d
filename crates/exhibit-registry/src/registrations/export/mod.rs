//! Staff exports: flat CSV tables, zipped or packed into a workbook.

mod archive;
mod tables;

pub use archive::{export_name, xlsx_workbook, zip_archive};
pub use tables::{collect_tables, registrants_table, ExportTable};

use crate::registrations::store::StoreError;

/// Error raised while assembling an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip archive failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xlsx workbook failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
