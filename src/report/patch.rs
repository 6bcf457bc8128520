//! Rewrite individual cells of a worksheet XML part.
//!
//! The sheet is streamed through unchanged except for the edited cells,
//! which are replaced in place or inserted in column order. Rows that gain
//! cells lose their `spans` hint, which Excel recomputes. Text is written as
//! inline strings so the shared string table never needs rebuilding.

use super::package::{attribute, xml_err};
use super::worksheet::{CellRef, CellValue};
use crate::error::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

type PendingRows<'a> = BTreeMap<u32, BTreeMap<u32, &'a CellValue>>;

pub(crate) fn patch_sheet_xml(xml: &str, edits: &BTreeMap<CellRef, CellValue>) -> Result<String> {
    let mut pending: PendingRows = BTreeMap::new();
    for (cell, value) in edits {
        pending.entry(cell.row).or_default().insert(cell.col, value);
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    let mut current_row: Option<u32> = None;
    let mut last_row: Option<u32> = None;
    let mut next_col: u32 = 0;
    // Inside a replaced <c>, dropping its original children.
    let mut skipping = false;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(xml_err)?;

        if skipping {
            if let Event::End(e) = &event {
                if e.local_name().as_ref() == b"c" {
                    skipping = false;
                }
            }
            continue;
        }

        match event {
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                let name = element_name(&e)?;
                emit(&mut writer, Event::Start(e))?;
                write_rows(&mut writer, std::mem::take(&mut pending))?;
                emit(&mut writer, Event::End(BytesEnd::new(name)))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                write_rows(&mut writer, std::mem::take(&mut pending))?;
                emit(&mut writer, Event::End(e))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let row = row_index(&e, last_row)?;
                write_rows(&mut writer, take_rows_before(&mut pending, row))?;
                last_row = Some(row);
                current_row = Some(row);
                next_col = 0;

                if pending.contains_key(&row) {
                    emit(&mut writer, Event::Start(without_spans(&e)?))?;
                } else {
                    emit(&mut writer, Event::Start(e))?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let row = row_index(&e, last_row)?;
                write_rows(&mut writer, take_rows_before(&mut pending, row))?;
                last_row = Some(row);

                match pending.remove(&row) {
                    Some(cells) => {
                        let name = element_name(&e)?;
                        emit(&mut writer, Event::Start(without_spans(&e)?))?;
                        write_cells(&mut writer, row, cells)?;
                        emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                    }
                    None => emit(&mut writer, Event::Empty(e))?,
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                if let Some(row) = current_row.take() {
                    if let Some(cells) = pending.remove(&row) {
                        write_cells(&mut writer, row, cells)?;
                    }
                }
                emit(&mut writer, Event::End(e))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let replaced =
                    patch_cell(&mut writer, &mut pending, &e, current_row, &mut next_col)?;
                if replaced {
                    skipping = true;
                } else {
                    emit(&mut writer, Event::Start(e))?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let replaced =
                    patch_cell(&mut writer, &mut pending, &e, current_row, &mut next_col)?;
                if !replaced {
                    emit(&mut writer, Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            e => emit(&mut writer, e)?,
        }
    }

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

/// Flush pending cells that sort before `e`, then write its replacement if
/// it is edited. Returns whether the original cell was replaced.
fn patch_cell<W: Write>(
    writer: &mut Writer<W>,
    pending: &mut PendingRows,
    e: &BytesStart,
    current_row: Option<u32>,
    next_col: &mut u32,
) -> Result<bool> {
    let Some(row) = current_row else {
        return Ok(false);
    };

    let col = match attribute(e, b"r")? {
        Some(reference) => reference
            .parse::<CellRef>()
            .map_err(xml_err)?
            .col,
        None => *next_col,
    };
    *next_col = col + 1;

    let Some(cells) = pending.get_mut(&row) else {
        return Ok(false);
    };

    let rest = cells.split_off(&col);
    let before = std::mem::replace(cells, rest);
    let replacement = cells.remove(&col);
    if cells.is_empty() {
        pending.remove(&row);
    }

    write_cells(writer, row, before)?;

    match replacement {
        Some(value) => {
            let style = attribute(e, b"s")?;
            write_cell(writer, CellRef::new(row, col), style.as_deref(), value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn take_rows_before<'a>(pending: &mut PendingRows<'a>, row: u32) -> PendingRows<'a> {
    let later = pending.split_off(&row);
    std::mem::replace(pending, later)
}

fn write_rows<W: Write>(writer: &mut Writer<W>, rows: PendingRows) -> Result<()> {
    for (row, cells) in rows {
        let number = (row + 1).to_string();
        let mut start = BytesStart::new("row");
        start.push_attribute(("r", number.as_str()));
        emit(writer, Event::Start(start))?;
        write_cells(writer, row, cells)?;
        emit(writer, Event::End(BytesEnd::new("row")))?;
    }
    Ok(())
}

fn write_cells<W: Write>(
    writer: &mut Writer<W>,
    row: u32,
    cells: BTreeMap<u32, &CellValue>,
) -> Result<()> {
    for (col, value) in cells {
        write_cell(writer, CellRef::new(row, col), None, value)?;
    }
    Ok(())
}

fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    cell: CellRef,
    style: Option<&str>,
    value: &CellValue,
) -> Result<()> {
    let reference = cell.to_string();
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }

    match value {
        CellValue::Number(n) if n.is_finite() => {
            emit(writer, Event::Start(start))?;
            write_value(writer, &n.to_string())?;
        }
        CellValue::Bool(b) => {
            start.push_attribute(("t", "b"));
            emit(writer, Event::Start(start))?;
            write_value(writer, if *b { "1" } else { "0" })?;
        }
        CellValue::Text(text) if !text.is_empty() => {
            start.push_attribute(("t", "inlineStr"));
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            if text.trim() != text {
                t.push_attribute(("xml:space", "preserve"));
            }
            emit(writer, Event::Start(t))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new("t")))?;
            emit(writer, Event::End(BytesEnd::new("is")))?;
        }
        // Cleared cells keep their style but lose their value.
        _ => return emit(writer, Event::Empty(start)),
    }

    emit(writer, Event::End(BytesEnd::new("c")))
}

fn write_value<W: Write>(writer: &mut Writer<W>, value: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("v")))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new("v")))
}

fn row_index(e: &BytesStart, last_row: Option<u32>) -> Result<u32> {
    match attribute(e, b"r")? {
        Some(r) => r
            .parse::<u32>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| xml_err(format!("invalid row number '{}'", r))),
        None => Ok(last_row.map_or(0, |row| row + 1)),
    }
}

fn without_spans(e: &BytesStart) -> Result<BytesStart<'static>> {
    let mut out = BytesStart::new(element_name(e)?);
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref() != b"spans" {
            out.push_attribute(attr);
        }
    }
    Ok(out)
}

fn element_name(e: &BytesStart) -> Result<String> {
    String::from_utf8(e.name().as_ref().to_vec()).map_err(xml_err)
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event) -> Result<()> {
    writer.write_event(event).map_err(xml_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::worksheet::test_helpers::at;

    fn sheet_xml(sheet_data: &str) -> String {
        format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C3"/>{}<pageMargins left="0.7"/></worksheet>"#,
            sheet_data
        )
    }

    fn patch(sheet_data: &str, edits: &[(&str, CellValue)]) -> String {
        let edits: BTreeMap<CellRef, CellValue> = edits
            .iter()
            .map(|(cell, value)| (at(cell), value.clone()))
            .collect();
        patch_sheet_xml(&sheet_xml(sheet_data), &edits).unwrap()
    }

    #[test]
    fn test_no_edits_is_identity() {
        let data = r#"<sheetData><row r="1" spans="1:2"><c r="A1" t="s"><v>0</v></c></row></sheetData>"#;

        assert_eq!(patch(data, &[]), sheet_xml(data));
    }

    #[test]
    fn test_replaces_value_and_keeps_style() {
        let patched = patch(
            r#"<sheetData><row r="1" spans="1:2"><c r="A1" t="s"><v>0</v></c><c r="B1" s="3"><v>5</v></c></row></sheetData>"#,
            &[("B1", CellValue::Number(1000.0))],
        );

        assert_eq!(
            patched,
            sheet_xml(
                r#"<sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" s="3"><v>1000</v></c></row></sheetData>"#
            )
        );
    }

    #[test]
    fn test_replaces_empty_styled_cell() {
        let patched = patch(
            r#"<sheetData><row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" s="7"/></row></sheetData>"#,
            &[("B2", CellValue::Number(62.5))],
        );

        assert!(
            patched.contains(r#"<c r="A2" t="s"><v>1</v></c><c r="B2" s="7"><v>62.5</v></c></row>"#),
            "{}",
            patched
        );
    }

    #[test]
    fn test_inserts_cells_in_column_order() {
        let patched = patch(
            r#"<sheetData><row r="1"><c r="A1"><v>1</v></c><c r="C1"><v>3</v></c></row></sheetData>"#,
            &[
                ("B1", CellValue::Number(2.0)),
                ("D1", CellValue::Number(4.0)),
            ],
        );

        assert!(
            patched.contains(
                r#"<row r="1"><c r="A1"><v>1</v></c><c r="B1"><v>2</v></c><c r="C1"><v>3</v></c><c r="D1"><v>4</v></c></row>"#
            ),
            "{}",
            patched
        );
    }

    #[test]
    fn test_inserts_missing_rows() {
        let patched = patch(
            r#"<sheetData><row r="1"><c r="A1"><v>1</v></c></row><row r="3"><c r="A3"><v>3</v></c></row></sheetData>"#,
            &[
                ("B2", CellValue::Number(2.0)),
                ("A5", CellValue::Number(5.0)),
            ],
        );

        assert!(
            patched.contains(
                r#"</row><row r="2"><c r="B2"><v>2</v></c></row><row r="3"><c r="A3"><v>3</v></c></row><row r="5"><c r="A5"><v>5</v></c></row></sheetData>"#
            ),
            "{}",
            patched
        );
    }

    #[test]
    fn test_fills_empty_sheet_data() {
        let patched = patch("<sheetData/>", &[("A1", CellValue::from("03/31/25"))]);

        assert!(
            patched.contains(
                r#"<sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>03/31/25</t></is></c></row></sheetData>"#
            ),
            "{}",
            patched
        );
    }

    #[test]
    fn test_expands_empty_row() {
        let patched = patch(
            r#"<sheetData><row r="4" spans="1:3" ht="20"/></sheetData>"#,
            &[("C4", CellValue::Bool(true))],
        );

        assert!(
            patched.contains(r#"<row r="4" ht="20"><c r="C4" t="b"><v>1</v></c></row>"#),
            "{}",
            patched
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let patched = patch("<sheetData/>", &[("A1", CellValue::from(" a & b "))]);

        assert!(
            patched.contains(r#"<t xml:space="preserve"> a &amp; b </t>"#),
            "{}",
            patched
        );
    }

    #[test]
    fn test_clearing_drops_value_and_formula() {
        let patched = patch(
            r#"<sheetData><row r="1"><c r="A1" s="2"><f>SUM(B1:B9)</f><v>10</v></c></row></sheetData>"#,
            &[("A1", CellValue::Empty)],
        );

        assert!(
            patched.contains(r#"<row r="1"><c r="A1" s="2"/></row>"#),
            "{}",
            patched
        );
    }

    #[test]
    fn test_rows_and_cells_without_references() {
        let patched = patch(
            r#"<sheetData><row><c><v>1</v></c><c><v>2</v></c></row><row><c><v>3</v></c></row></sheetData>"#,
            &[("B2", CellValue::Number(9.0))],
        );

        assert!(
            patched.contains(r#"<row><c><v>3</v></c><c r="B2"><v>9</v></c></row>"#),
            "{}",
            patched
        );
    }
}
