use std::io::{Cursor, Write};

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};

use super::{ExportError, ExportTable};
use crate::config::ExhibitionConfig;
use crate::registrations::report::CatalogReport;

const CATALOG_SHEET: &str = "catalog";

/// Base name shared by the archive file and its inner folder.
pub fn export_name(exhibition: &ExhibitionConfig, now: NaiveDateTime) -> String {
    format!("{}-export-{}", exhibition.slug(), now.format("%Y%m%d%H%M%S"))
}

/// Packs every table as `{folder}/{table}.csv` into a deflated zip.
pub fn zip_archive(tables: &[ExportTable], folder: &str) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for table in tables {
            zip.start_file(format!("{folder}/{}", table.file_name()), options)?;
            zip.write_all(&table.to_csv()?)?;
        }
        zip.finish()?;
    }
    Ok(buffer.into_inner())
}

/// One worksheet per table plus the class catalog.
pub fn xlsx_workbook(
    tables: &[ExportTable],
    catalog: &CatalogReport,
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for table in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(table.name)?;
        for (col, label) in table.header.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, label, &bold)?;
        }
        for (index, row) in table.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                worksheet.write_string(index as u32 + 1, col as u16, value)?;
            }
        }
    }

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(CATALOG_SHEET)?;
    catalog.write_sheet(worksheet)?;

    Ok(workbook.save_to_buffer()?)
}
