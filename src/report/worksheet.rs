use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Largest row index an xlsx sheet can hold (0-based).
pub const MAX_ROW: u32 = 1_048_575;
/// Largest column index an xlsx sheet can hold (0-based, `XFD`).
pub const MAX_COL: u32 = 16_383;

/// Zero-based cell coordinate.
///
/// Ordering is row-major, so iterating a map keyed by `CellRef` visits
/// cells the way a reader scans the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Convert a 0-indexed column number to letters (0 = A, 25 = Z, 26 = AA).
pub fn col_to_letter(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.col), self.row + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell reference '{0}'")]
pub struct ParseCellRefError(String);

impl FromStr for CellRef {
    type Err = ParseCellRefError;

    /// Parse A1 notation, ignoring `$` anchors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellRefError(s.to_string());
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(err)?;
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(err());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            let digit = u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(err)?;
        }

        let row: u32 = digits.parse().map_err(|_| err())?;
        if row == 0 {
            return Err(err());
        }

        Ok(CellRef::new(row - 1, col - 1))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Text as a reader would see it, `None` for empty cells.
    pub fn display_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bool(true) => Some("TRUE".to_string()),
            CellValue::Bool(false) => Some("FALSE".to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<rust_decimal::Decimal> for CellValue {
    fn from(d: rust_decimal::Decimal) -> Self {
        use rust_decimal::prelude::ToPrimitive;
        d.to_f64().map_or(CellValue::Empty, CellValue::Number)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Sparse in-memory copy of one sheet of a report workbook.
///
/// Writes are tracked separately so that saving only touches the cells
/// that changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellRef, CellValue>,
    edits: BTreeMap<CellRef, CellValue>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build a sheet from its stored cells; nothing is marked as edited.
    pub fn from_cells(
        name: impl Into<String>,
        cells: impl IntoIterator<Item = (CellRef, CellValue)>,
    ) -> Self {
        Self {
            name: name.into(),
            cells: cells
                .into_iter()
                .filter(|(_, value)| !value.is_empty())
                .collect(),
            edits: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, cell: CellRef) -> Option<&CellValue> {
        self.cells.get(&cell)
    }

    pub fn set(&mut self, cell: CellRef, value: impl Into<CellValue>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value.clone());
        }
        self.edits.insert(cell, value);
    }

    /// Non-empty cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.cells.iter().map(|(cell, value)| (*cell, value))
    }

    pub fn edits(&self) -> &BTreeMap<CellRef, CellValue> {
        &self.edits
    }

    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    /// First cell in `col` whose text contains `needle`.
    pub fn find_in_column(&self, col: u32, needle: &str) -> Option<CellRef> {
        if needle.is_empty() {
            return None;
        }
        self.cells()
            .filter(|(cell, _)| cell.col == col)
            .find(|(_, value)| {
                value
                    .display_text()
                    .is_some_and(|text| text.contains(needle))
            })
            .map(|(cell, _)| cell)
    }
}
