//! Just enough of the xlsx package structure to find the active sheet.

use crate::error::{AppError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";

/// A worksheet part inside the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetPart {
    pub name: String,
    /// Path of the sheet XML inside the archive, e.g. `xl/worksheets/sheet1.xml`.
    pub path: String,
}

pub(crate) fn xml_err(e: impl std::fmt::Display) -> AppError {
    AppError::Report(format!("Malformed workbook XML: {}", e))
}

pub(crate) fn zip_err(e: impl std::fmt::Display) -> AppError {
    AppError::Report(format!("Malformed xlsx archive: {}", e))
}

pub(crate) fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| AppError::Report(format!("Missing '{}' in workbook: {}", name, e)))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Read an attribute by its qualified name (e.g. `r:id`), unescaped.
pub(crate) fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(xml_err)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve the sheet that opens when the workbook is opened.
pub(crate) fn active_sheet<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<SheetPart> {
    let workbook_xml = read_entry(archive, WORKBOOK_PATH)?;
    let rels_xml = read_entry(archive, WORKBOOK_RELS_PATH)?;

    let (sheets, active_tab) = parse_workbook(&workbook_xml)?;
    let targets = parse_relationships(&rels_xml)?;

    let (name, rel_id) = sheets
        .get(active_tab)
        .or_else(|| sheets.first())
        .ok_or_else(|| AppError::Report("Workbook has no sheets".to_string()))?;

    let target = targets.get(rel_id).ok_or_else(|| {
        AppError::Report(format!("Sheet '{}' has no relationship '{}'", name, rel_id))
    })?;

    Ok(SheetPart {
        name: name.clone(),
        path: resolve_target(target),
    })
}

/// Sheets as (name, relationship id) in workbook order, plus the active tab.
fn parse_workbook(xml: &str) -> Result<(Vec<(String, String)>, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut active_tab = 0;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name")?.unwrap_or_default();
                let rel_id = attribute(&e, b"r:id")?.unwrap_or_default();
                sheets.push((name, rel_id));
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"workbookView" => {
                if let Some(tab) = attribute(&e, b"activeTab")? {
                    active_tab = tab.parse().unwrap_or(0);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, active_tab))
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}
