use super::locator::{ReportField, ReportLayout};
use super::worksheet::{CellValue, Worksheet};
use crate::models::NormalizedMetrics;
use chrono::{Days, NaiveDate};
use tracing::{debug, info, instrument, warn};

/// Column holding line item names in a pacing report (B).
const LINE_ITEM_COLUMN: u32 = 1;

const PACING_THROUGH_FORMAT: &str = "%m/%d/%y";

/// What a single update managed to write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub written: Vec<ReportField>,
    pub missing: Vec<ReportField>,
    pub line_item_found: bool,
}

/// Write one line item's metrics into a loaded pacing sheet.
///
/// Each field is resolved and written independently: a label missing from
/// the sheet only skips its own field. Spend is written only when the line
/// item's name appears in column B.
#[instrument(name = "Updating report", skip_all, fields(line_item = %line_item_name))]
pub fn apply_metrics(
    worksheet: &mut Worksheet,
    line_item_name: &str,
    metrics: &NormalizedMetrics,
    today: NaiveDate,
) -> UpdateOutcome {
    let layout = ReportLayout::resolve(worksheet);
    let mut outcome = UpdateOutcome::default();

    let pacing_through = today
        .checked_sub_days(Days::new(1))
        .map(|day| day.format(PACING_THROUGH_FORMAT).to_string());

    let general: [(ReportField, CellValue); 5] = [
        (ReportField::PacingThrough, pacing_through.into()),
        (ReportField::PacingPercent, metrics.pacing_pct.into()),
        (ReportField::Impressions, metrics.impressions.into()),
        (ReportField::Clicks, metrics.clicks.into()),
        (ReportField::Viewability, metrics.viewability_pct.into()),
    ];

    for (field, value) in general {
        write_field(worksheet, &layout, field, value, &mut outcome);
    }

    match worksheet.find_in_column(LINE_ITEM_COLUMN, line_item_name) {
        Some(cell) => {
            debug!(cell = %cell, "Found line item row");
            outcome.line_item_found = true;
            if layout.is_ambiguous(ReportField::SpendToDate) {
                warn!(
                    "'{}' appears more than once; spend goes to the first occurrence, which may belong to another line item",
                    ReportField::SpendToDate
                );
            }
            write_field(
                worksheet,
                &layout,
                ReportField::SpendToDate,
                metrics.spend.into(),
                &mut outcome,
            );
        }
        None => warn!("Line item not found in column B of the report"),
    }

    info!(
        written = outcome.written.len(),
        missing = outcome.missing.len(),
        "Report updated"
    );

    outcome
}

fn write_field(
    worksheet: &mut Worksheet,
    layout: &ReportLayout,
    field: ReportField,
    value: CellValue,
    outcome: &mut UpdateOutcome,
) {
    match layout.cell(field) {
        Ok(cell) => {
            debug!(field = %field, cell = %cell, value = ?value, "Writing field");
            worksheet.set(cell, value);
            outcome.written.push(field);
        }
        Err(e) => {
            warn!(field = %field, error = %e, "Skipping field");
            outcome.missing.push(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metrics::test_helpers::mock_metrics;
    use crate::report::worksheet::test_helpers::{at, sheet};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    fn full_report() -> Worksheet {
        sheet(&[
            ("A1", "Pacing Through"),
            ("D1", "Basis Pacing % (7 day avg)"),
            ("A3", "Impressions:"),
            ("A4", "Clicks:"),
            ("A5", "Viewability:"),
            ("B7", "Line Item"),
            ("C7", "Spend to Date"),
            ("B8", "Q2 - LI-A - Display"),
        ])
    }

    #[test]
    fn test_writes_all_fields() {
        let mut ws = full_report();

        let outcome = apply_metrics(&mut ws, "LI-A", &mock_metrics(), today());

        assert_eq!(
            outcome,
            UpdateOutcome {
                written: vec![
                    ReportField::PacingThrough,
                    ReportField::PacingPercent,
                    ReportField::Impressions,
                    ReportField::Clicks,
                    ReportField::Viewability,
                    ReportField::SpendToDate,
                ],
                missing: vec![],
                line_item_found: true,
            }
        );
        assert_eq!(ws.get(at("B1")), Some(&CellValue::from("03/31/25")));
        assert_eq!(ws.get(at("D2")), Some(&CellValue::Number(98.4)));
        assert_eq!(ws.get(at("B3")), Some(&CellValue::Number(1000.0)));
        assert_eq!(ws.get(at("B4")), Some(&CellValue::Number(12.0)));
        assert_eq!(ws.get(at("B5")), Some(&CellValue::Number(62.5)));
        assert_eq!(ws.get(at("C8")), Some(&CellValue::Number(250.75)));
    }

    #[test]
    fn test_missing_label_skips_only_that_field() {
        let mut ws = sheet(&[
            ("A1", "Pacing Through"),
            ("D1", "Basis Pacing % (7 day avg)"),
            ("A3", "Impressions:"),
            ("A4", "Clicks:"),
        ]);

        let outcome = apply_metrics(&mut ws, "LI-A", &mock_metrics(), today());

        assert_eq!(outcome.missing, vec![ReportField::Viewability]);
        assert_eq!(outcome.written.len(), 4);
        assert_eq!(ws.get(at("B3")), Some(&CellValue::Number(1000.0)));
        assert_eq!(ws.edits().len(), 4);
    }

    #[test]
    fn test_unknown_line_item_keeps_general_updates() {
        let mut ws = full_report();

        let outcome = apply_metrics(&mut ws, "LI-Z", &mock_metrics(), today());

        assert!(!outcome.line_item_found);
        assert!(!outcome.written.contains(&ReportField::SpendToDate));
        assert_eq!(outcome.written.len(), 5);
        assert_eq!(ws.get(at("C8")), None);
    }

    #[test]
    fn test_line_item_outside_column_b_not_matched() {
        let mut ws = sheet(&[("C7", "Spend to Date"), ("A8", "LI-A")]);

        let outcome = apply_metrics(&mut ws, "LI-A", &mock_metrics(), today());

        assert!(!outcome.line_item_found);
        assert_eq!(ws.get(at("C8")), None);
    }

    #[test]
    fn test_spend_goes_to_first_label() {
        let mut ws = sheet(&[
            ("C2", "Spend to Date"),
            ("B3", "LI-A"),
            ("C5", "Spend to Date"),
            ("B6", "LI-B"),
        ]);

        apply_metrics(&mut ws, "LI-B", &mock_metrics(), today());

        assert_eq!(ws.get(at("C3")), Some(&CellValue::Number(250.75)));
        assert_eq!(ws.get(at("C6")), None);
    }

    #[test]
    fn test_absent_metric_clears_cell() {
        let mut ws = sheet(&[("A4", "Clicks:"), ("B4", "17")]);
        let metrics = NormalizedMetrics {
            clicks: None,
            ..mock_metrics()
        };

        apply_metrics(&mut ws, "LI-A", &metrics, today());

        assert_eq!(ws.get(at("B4")), None);
        assert_eq!(ws.edits().get(&at("B4")), Some(&CellValue::Empty));
    }

    #[test]
    fn test_pacing_through_crosses_year() {
        let mut ws = sheet(&[("A1", "Pacing Through")]);
        let new_year = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        apply_metrics(&mut ws, "LI-A", &mock_metrics(), new_year);

        assert_eq!(ws.get(at("B1")), Some(&CellValue::from("12/31/25")));
    }
}
