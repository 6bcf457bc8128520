use super::ReportOperations;
use super::package::{active_sheet, read_entry, zip_err};
use super::patch::patch_sheet_xml;
use super::worksheet::{CellRef, CellValue, Worksheet};
use crate::error::{AppError, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Pacing reports stored as `.xlsx` files on local disk.
///
/// Only the workbook's active sheet is read and written.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxReports;

impl ReportOperations for XlsxReports {
    #[instrument(name = "Loading report", skip(self))]
    fn load(&self, path: &Path) -> Result<Worksheet> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(zip_err)?;
        let sheet = active_sheet(&mut archive)?;

        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
            AppError::Report(format!("Failed to open '{}': {}", path.display(), e))
        })?;
        let range = workbook.worksheet_range(&sheet.name).map_err(|e| {
            AppError::Report(format!("Failed to read sheet '{}': {}", sheet.name, e))
        })?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let cells = range.used_cells().map(|(row, col, data)| {
            (
                CellRef::new(start_row + row as u32, start_col + col as u32),
                cell_value(data),
            )
        });

        let worksheet = Worksheet::from_cells(sheet.name.clone(), cells);
        debug!(sheet = %sheet.name, cells = worksheet.cells().count(), "Loaded report sheet");

        Ok(worksheet)
    }

    /// Write the sheet's edits back to `path`.
    ///
    /// The new workbook is written next to the original and renamed over it,
    /// so a failure part-way leaves the original intact.
    #[instrument(name = "Saving report", skip(self, worksheet))]
    fn save(&self, path: &Path, worksheet: &Worksheet) -> Result<()> {
        if !worksheet.is_dirty() {
            debug!("No edits, leaving report untouched");
            return Ok(());
        }

        let original = fs::read(path)?;
        let patched = patch_package(&original, worksheet)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&patched)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| AppError::Io(e.error))?;

        debug!(edits = worksheet.edits().len(), "Report saved");

        Ok(())
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Copy every package entry unchanged except the edited sheet.
fn patch_package(original: &[u8], worksheet: &Worksheet) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(original)).map_err(zip_err)?;
    let sheet = active_sheet(&mut archive)?;

    if sheet.name != worksheet.name() {
        return Err(AppError::Report(format!(
            "Active sheet changed from '{}' to '{}' since the report was loaded",
            worksheet.name(),
            sheet.name
        )));
    }

    let sheet_xml = read_entry(&mut archive, &sheet.path)?;
    let patched_xml = patch_sheet_xml(&sheet_xml, worksheet.edits())?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(original.len())));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(zip_err)?;

        if entry.name() == sheet.path {
            writer
                .start_file(sheet.path.as_str(), options)
                .map_err(zip_err)?;
            writer.write_all(patched_xml.as_bytes())?;
            continue;
        }

        writer.raw_copy_file(entry).map_err(zip_err)?;
    }

    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}
