//! The tabular store abstraction the engine writes through

mod memory;

use std::collections::BTreeSet;
use std::fmt;

use ng_core::RowId;
use serde::{Deserialize, Serialize};

use crate::DataError;

pub use memory::{MemoryStore, TableSnapshot, WorkbookSnapshot};

/// A single cell as the store holds it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Whether the cell is empty or holds only whitespace
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// The cell as a number, parsing text if needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// The cell as a Row ID. Fractional numbers are not IDs.
    pub fn as_row_id(&self) -> Option<RowId> {
        match self {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as RowId),
            CellValue::Text(text) => text.trim().parse::<RowId>().ok(),
            _ => None,
        }
    }

    /// Display text of the cell, trimmed. Empty cells give an empty string.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(text) => text.trim().to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Identifies a table inside the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableHandle {
    pub sheet: String,
    pub table: String,
}

impl TableHandle {
    pub fn new(sheet: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sheet, self.table)
    }
}

/// Identifies a column inside a table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnHandle {
    pub table: TableHandle,
    pub name: String,
}

/// A contiguous run of rows, 1-based and inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpan {
    pub first: usize,
    pub last: usize,
}

impl RowSpan {
    pub fn new(first: usize, last: usize) -> Self {
        Self {
            first: first.min(last),
            last: first.max(last),
        }
    }

    pub fn single(position: usize) -> Self {
        Self::new(position, position)
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.first..=self.last).contains(&position)
    }
}

/// A possibly multi-area row selection within one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedRows {
    pub spans: Vec<RowSpan>,
}

impl SelectedRows {
    pub fn new(spans: Vec<RowSpan>) -> Self {
        Self { spans }
    }

    /// Collapse arbitrary positions into the fewest contiguous spans
    pub fn from_positions(positions: impl IntoIterator<Item = usize>) -> Self {
        let sorted: BTreeSet<usize> = positions.into_iter().filter(|p| *p > 0).collect();
        let mut spans: Vec<RowSpan> = Vec::new();

        for position in sorted {
            match spans.last_mut() {
                Some(span) if span.last + 1 == position => span.last = position,
                _ => spans.push(RowSpan::single(position)),
            }
        }

        Self { spans }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.spans.iter().any(|span| span.contains(position))
    }

    /// Selected positions in ascending order, overlapping areas counted once
    pub fn positions(&self) -> Vec<usize> {
        let unique: BTreeSet<usize> = self
            .spans
            .iter()
            .flat_map(|span| span.first..=span.last)
            .collect();
        unique.into_iter().collect()
    }
}

/// Access to the host document's tables.
///
/// Every call may be a round-trip to the host, so callers read and write
/// whole columns at a time. Positions are 1-based.
pub trait TabularStore: Send + Sync {
    /// Whether the host can accept programmatic edits right now
    fn is_ready(&self) -> bool;

    /// Look up a table by sheet and table name
    fn try_get_table(&self, sheet: &str, table: &str) -> Option<TableHandle>;

    /// Number of data rows in the table
    fn row_count(&self, table: &TableHandle) -> Result<usize, DataError>;

    /// Look up a column by name. Absence is not an error.
    fn try_get_column(&self, table: &TableHandle, name: &str) -> Option<ColumnHandle>;

    /// Append an empty column to the table
    fn add_column(&self, table: &TableHandle, name: &str) -> Result<ColumnHandle, DataError>;

    /// Read every data cell of a column, first row first
    fn read_column_values(&self, column: &ColumnHandle) -> Result<Vec<CellValue>, DataError>;

    /// Replace every data cell of a column in one call
    fn write_column_values(
        &self,
        column: &ColumnHandle,
        values: &[CellValue],
    ) -> Result<(), DataError>;

    /// Rows of the table the user has selected
    fn selected_rows(&self, table: &TableHandle) -> Result<SelectedRows, DataError>;

    /// Replace the table's selection
    fn select_rows(&self, table: &TableHandle, rows: &SelectedRows) -> Result<(), DataError>;

    /// Positions of rows not hidden by a filter, ascending
    fn visible_rows(&self, table: &TableHandle) -> Result<Vec<usize>, DataError>;

    /// Name of the sheet the user is looking at
    fn active_sheet(&self) -> String;

    /// Make a sheet the active one
    fn activate_sheet(&self, sheet: &str) -> Result<(), DataError>;

    /// Look up a column, adding it if it doesn't exist
    fn try_get_or_add_column(
        &self,
        table: &TableHandle,
        name: &str,
    ) -> Result<ColumnHandle, DataError> {
        match self.try_get_column(table, name) {
            Some(column) => Ok(column),
            None => {
                tracing::debug!("Adding column '{}' to {}", name, table);
                self.add_column(table, name)
            }
        }
    }
}
