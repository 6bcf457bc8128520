//! Label-anchored cell resolution.
//!
//! Pacing reports carry no structure beyond their visible text: a value
//! lives next to (or under) the cell holding its label. Resolution scans
//! the sheet in row-major order, takes the first cell whose trimmed text
//! equals the label, and offsets from it.

use super::worksheet::{CellRef, MAX_COL, MAX_ROW, Worksheet};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Value sits one column right of the label.
    Right,
    /// Value sits one row below the label.
    Below,
}

impl Placement {
    fn apply(self, anchor: CellRef) -> Option<CellRef> {
        match self {
            Placement::Right => anchor
                .col
                .checked_add(1)
                .filter(|col| *col <= MAX_COL)
                .map(|col| CellRef::new(anchor.row, col)),
            Placement::Below => anchor
                .row
                .checked_add(1)
                .filter(|row| *row <= MAX_ROW)
                .map(|row| CellRef::new(row, anchor.col)),
        }
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "right" => Ok(Placement::Right),
            "below" => Ok(Placement::Below),
            other => Err(format!("unknown placement '{}'", other)),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Right => f.write_str("right"),
            Placement::Below => f.write_str("below"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("no cell labelled '{label}'")]
    NotFound { label: String },

    #[error("cell {placement} of '{label}' at {anchor} is outside the sheet")]
    OutOfBounds {
        label: String,
        anchor: CellRef,
        placement: Placement,
    },
}

/// Cells whose trimmed text is exactly `label`, in scan order.
pub fn anchors<'a>(worksheet: &'a Worksheet, label: &'a str) -> impl Iterator<Item = CellRef> + 'a {
    worksheet
        .cells()
        .filter(move |(_, value)| {
            value
                .display_text()
                .is_some_and(|text| text.trim() == label)
        })
        .map(|(cell, _)| cell)
}

/// Resolve the value cell for `label`.
///
/// When the label occurs more than once only the first occurrence is
/// considered.
pub fn locate(
    worksheet: &Worksheet,
    label: &str,
    placement: Placement,
) -> Result<CellRef, LocateError> {
    let anchor = anchors(worksheet, label)
        .next()
        .ok_or_else(|| LocateError::NotFound {
            label: label.to_string(),
        })?;

    placement
        .apply(anchor)
        .ok_or_else(|| LocateError::OutOfBounds {
            label: label.to_string(),
            anchor,
            placement,
        })
}

/// Named fields of a pacing report and where their values sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportField {
    PacingThrough,
    PacingPercent,
    Impressions,
    Clicks,
    Viewability,
    SpendToDate,
}

impl ReportField {
    pub const ALL: [ReportField; 6] = [
        ReportField::PacingThrough,
        ReportField::PacingPercent,
        ReportField::Impressions,
        ReportField::Clicks,
        ReportField::Viewability,
        ReportField::SpendToDate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportField::PacingThrough => "Pacing Through",
            ReportField::PacingPercent => "Basis Pacing % (7 day avg)",
            ReportField::Impressions => "Impressions:",
            ReportField::Clicks => "Clicks:",
            ReportField::Viewability => "Viewability:",
            ReportField::SpendToDate => "Spend to Date",
        }
    }

    pub fn placement(self) -> Placement {
        match self {
            ReportField::PacingPercent | ReportField::SpendToDate => Placement::Below,
            _ => Placement::Right,
        }
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field-to-cell mapping of one loaded sheet.
///
/// Built once per load; sheets are edited by hand between runs, so a
/// layout is never reused across loads.
#[derive(Debug, Clone, Default)]
pub struct ReportLayout {
    cells: HashMap<ReportField, Result<CellRef, LocateError>>,
    ambiguous: Vec<ReportField>,
}

impl ReportLayout {
    pub fn resolve(worksheet: &Worksheet) -> Self {
        let mut layout = ReportLayout::default();

        for field in ReportField::ALL {
            let resolved = locate(worksheet, field.label(), field.placement());
            match &resolved {
                Ok(cell) => debug!(field = %field, cell = %cell, "Resolved report field"),
                Err(e) => warn!(field = %field, error = %e, "Report field unresolved"),
            }
            layout.cells.insert(field, resolved);

            let occurrences = anchors(worksheet, field.label()).count();
            if occurrences > 1 {
                debug!(field = %field, occurrences, "Label appears more than once");
                layout.ambiguous.push(field);
            }
        }

        layout
    }

    pub fn cell(&self, field: ReportField) -> Result<CellRef, LocateError> {
        self.cells
            .get(&field)
            .cloned()
            .unwrap_or_else(|| {
                Err(LocateError::NotFound {
                    label: field.label().to_string(),
                })
            })
    }

    /// Whether the field's label occurs more than once in the sheet.
    pub fn is_ambiguous(&self, field: ReportField) -> bool {
        self.ambiguous.contains(&field)
    }

    pub fn missing(&self) -> Vec<ReportField> {
        ReportField::ALL
            .into_iter()
            .filter(|field| self.cell(*field).is_err())
            .collect()
    }
}
