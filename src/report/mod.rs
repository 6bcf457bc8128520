mod locator;
mod package;
mod patch;
mod updater;
mod worksheet;
mod xlsx;

pub use locator::{LocateError, Placement, ReportField, ReportLayout, anchors, locate};
pub use updater::{UpdateOutcome, apply_metrics};
pub use worksheet::{CellRef, CellValue, ParseCellRefError, Worksheet};
pub use xlsx::XlsxReports;

#[cfg(test)]
pub(crate) use worksheet::test_helpers as worksheet_test_helpers;

use crate::error::Result;
use std::path::Path;

/// Storage for pacing reports.
pub trait ReportOperations {
    /// Load the report's active sheet.
    fn load(&self, path: &Path) -> Result<Worksheet>;

    /// Persist the edits made to a loaded sheet.
    fn save(&self, path: &Path, worksheet: &Worksheet) -> Result<()>;
}
