//! In-memory tabular store
//!
//! Backs the replay shell and the tests. Every `write_column_values` call is
//! logged per column so callers can assert how many round-trips a batch cost.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashSet;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::{CellValue, ColumnHandle, RowSpan, SelectedRows, TableHandle, TabularStore};
use crate::DataError;

/// Serializable contents of one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSnapshot {
    pub sheet: String,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// 1-based positions hidden by a filter
    pub hidden_rows: Vec<usize>,
    pub selected_rows: Vec<RowSpan>,
}

/// Serializable contents of a whole workbook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookSnapshot {
    pub active_sheet: Option<String>,
    pub tables: Vec<TableSnapshot>,
}

impl WorkbookSnapshot {
    /// Load a snapshot from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct MemoryTable {
    handle: TableHandle,
    columns: IndexMap<String, Vec<CellValue>>,
    rows: usize,
    hidden: Vec<bool>,
    selection: SelectedRows,
}

impl MemoryTable {
    fn new(handle: TableHandle) -> Self {
        Self {
            handle,
            columns: IndexMap::new(),
            rows: 0,
            hidden: Vec::new(),
            selection: SelectedRows::default(),
        }
    }

    fn check_position(&self, position: usize) -> Result<usize, DataError> {
        if position == 0 || position > self.rows {
            return Err(DataError::RowOutOfRange {
                row: position,
                rows: self.rows,
            });
        }
        Ok(position - 1)
    }

    fn row_cells(&self, cells: Vec<(&str, CellValue)>) -> Result<Vec<(usize, CellValue)>, DataError> {
        cells
            .into_iter()
            .map(|(name, value)| {
                self.columns
                    .get_index_of(name)
                    .map(|idx| (idx, value))
                    .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
            })
            .collect()
    }

    fn insert_row_at(&mut self, index: usize, cells: Vec<(usize, CellValue)>) {
        for values in self.columns.values_mut() {
            values.insert(index, CellValue::Empty);
        }
        for (column, value) in cells {
            if let Some((_, values)) = self.columns.get_index_mut(column) {
                values[index] = value;
            }
        }
        self.hidden.insert(index, false);
        self.rows += 1;
        self.selection = SelectedRows::default();
    }
}

struct StoreState {
    tables: Vec<MemoryTable>,
    active_sheet: String,
}

impl StoreState {
    fn table(&self, handle: &TableHandle) -> Result<&MemoryTable, DataError> {
        self.tables
            .iter()
            .find(|t| t.handle == *handle)
            .ok_or_else(|| DataError::TableNotFound {
                sheet: handle.sheet.clone(),
                table: handle.table.clone(),
            })
    }

    fn table_mut(&mut self, handle: &TableHandle) -> Result<&mut MemoryTable, DataError> {
        self.tables
            .iter_mut()
            .find(|t| t.handle == *handle)
            .ok_or_else(|| DataError::TableNotFound {
                sheet: handle.sheet.clone(),
                table: handle.table.clone(),
            })
    }
}

/// A workbook held entirely in memory
pub struct MemoryStore {
    state: RwLock<StoreState>,
    ready: AtomicBool,
    writes: Mutex<Vec<ColumnHandle>>,
    failing_columns: Mutex<AHashSet<ColumnHandle>>,
}

impl MemoryStore {
    /// Create an empty, ready store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                tables: Vec::new(),
                active_sheet: String::new(),
            }),
            ready: AtomicBool::new(true),
            writes: Mutex::new(Vec::new()),
            failing_columns: Mutex::new(AHashSet::new()),
        }
    }

    /// Build a store from a snapshot. Short rows are padded with empty cells.
    pub fn from_snapshot(snapshot: WorkbookSnapshot) -> Result<Self, DataError> {
        let store = Self::new();

        for table in snapshot.tables {
            let columns: Vec<&str> = table.columns.iter().map(String::as_str).collect();
            let handle = store.add_table(&table.sheet, &table.table, &columns);

            let mut state = store.state.write();
            let memory = state.table_mut(&handle)?;
            for (row_index, row) in table.rows.into_iter().enumerate() {
                if row.len() > table.columns.len() {
                    return Err(DataError::LengthMismatch {
                        column: format!("{} row {}", handle, row_index + 1),
                        expected: table.columns.len(),
                        actual: row.len(),
                    });
                }
                let cells = row.into_iter().enumerate().collect();
                let index = memory.rows;
                memory.insert_row_at(index, cells);
            }
            for position in table.hidden_rows {
                let index = memory.check_position(position)?;
                memory.hidden[index] = true;
            }
            memory.selection = SelectedRows::new(table.selected_rows);
        }

        if let Some(sheet) = snapshot.active_sheet {
            store.state.write().active_sheet = sheet;
        }

        Ok(store)
    }

    /// Load a store from a JSON snapshot file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        Self::from_snapshot(WorkbookSnapshot::from_json_file(path)?)
    }

    /// Capture the current contents
    pub fn snapshot(&self) -> WorkbookSnapshot {
        let state = self.state.read();

        let tables = state
            .tables
            .iter()
            .map(|table| TableSnapshot {
                sheet: table.handle.sheet.clone(),
                table: table.handle.table.clone(),
                columns: table.columns.keys().cloned().collect(),
                rows: (0..table.rows)
                    .map(|row| table.columns.values().map(|v| v[row].clone()).collect())
                    .collect(),
                hidden_rows: (0..table.rows)
                    .filter(|row| table.hidden[*row])
                    .map(|row| row + 1)
                    .collect(),
                selected_rows: table.selection.spans.clone(),
            })
            .collect();

        WorkbookSnapshot {
            active_sheet: Some(state.active_sheet.clone()),
            tables,
        }
    }

    /// Add an empty table, replacing any table with the same name.
    ///
    /// The first table added becomes the active sheet.
    pub fn add_table(&self, sheet: &str, table: &str, columns: &[&str]) -> TableHandle {
        let handle = TableHandle::new(sheet, table);
        let mut memory = MemoryTable::new(handle.clone());
        for name in columns {
            memory.columns.insert(name.to_string(), Vec::new());
        }

        let mut state = self.state.write();
        state.tables.retain(|t| t.handle != handle);
        state.tables.push(memory);
        if state.active_sheet.is_empty() {
            state.active_sheet = sheet.to_string();
        }

        handle
    }

    /// Append a row. Columns not named stay empty. Returns the new position.
    pub fn append_row(
        &self,
        table: &TableHandle,
        cells: Vec<(&str, CellValue)>,
    ) -> Result<usize, DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        let cells = memory.row_cells(cells)?;
        let index = memory.rows;
        memory.insert_row_at(index, cells);
        Ok(memory.rows)
    }

    /// Insert a row before `position`; `row_count + 1` appends
    pub fn insert_row(
        &self,
        table: &TableHandle,
        position: usize,
        cells: Vec<(&str, CellValue)>,
    ) -> Result<(), DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        if position == 0 || position > memory.rows + 1 {
            return Err(DataError::RowOutOfRange {
                row: position,
                rows: memory.rows,
            });
        }
        let cells = memory.row_cells(cells)?;
        memory.insert_row_at(position - 1, cells);
        Ok(())
    }

    /// Delete the row at `position`
    pub fn delete_row(&self, table: &TableHandle, position: usize) -> Result<(), DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        let index = memory.check_position(position)?;
        for values in memory.columns.values_mut() {
            values.remove(index);
        }
        memory.hidden.remove(index);
        memory.rows -= 1;
        memory.selection = SelectedRows::default();
        Ok(())
    }

    /// Hide or show a row, as a filter would
    pub fn set_row_hidden(
        &self,
        table: &TableHandle,
        position: usize,
        hidden: bool,
    ) -> Result<(), DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        let index = memory.check_position(position)?;
        memory.hidden[index] = hidden;
        Ok(())
    }

    /// Read one cell
    pub fn cell(&self, table: &TableHandle, column: &str, position: usize) -> Option<CellValue> {
        let state = self.state.read();
        let memory = state.table(table).ok()?;
        let index = memory.check_position(position).ok()?;
        memory.columns.get(column).map(|values| values[index].clone())
    }

    /// Overwrite one cell, as a user typing would. Not counted as a write.
    pub fn set_cell(
        &self,
        table: &TableHandle,
        column: &str,
        position: usize,
        value: CellValue,
    ) -> Result<(), DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        let index = memory.check_position(position)?;
        let values = memory
            .columns
            .get_mut(column)
            .ok_or_else(|| DataError::ColumnNotFound(column.to_string()))?;
        values[index] = value;
        Ok(())
    }

    /// Simulate the host being busy (false) or idle (true)
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of whole-column writes made to one column
    pub fn write_count(&self, table: &TableHandle, column: &str) -> usize {
        self.writes
            .lock()
            .iter()
            .filter(|c| c.table == *table && c.name == column)
            .count()
    }

    /// Number of whole-column writes made to any column
    pub fn total_writes(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn clear_write_log(&self) {
        self.writes.lock().clear();
    }

    /// Make every later write to the column fail with a store error
    pub fn fail_writes_to(&self, table: &TableHandle, column: &str) {
        self.failing_columns.lock().insert(ColumnHandle {
            table: table.clone(),
            name: column.to_string(),
        });
    }

    /// Load a table from CSV with a header row.
    ///
    /// Numeric-looking cells become numbers; blank cells become empty.
    pub fn load_csv<R: Read>(
        &self,
        sheet: &str,
        table: &str,
        reader: R,
    ) -> Result<TableHandle, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let names: Vec<&str> = headers.iter().map(String::as_str).collect();
        let handle = self.add_table(sheet, table, &names);

        let mut state = self.state.write();
        let memory = state.table_mut(&handle)?;
        for result in csv_reader.records() {
            let record = result?;
            let cells = record
                .iter()
                .take(headers.len())
                .map(parse_csv_cell)
                .enumerate()
                .collect();
            let index = memory.rows;
            memory.insert_row_at(index, cells);
        }

        tracing::debug!("Loaded {} rows into {}", memory.rows, handle);
        Ok(handle)
    }

    /// Write a table as CSV with a header row
    pub fn write_csv<W: Write>(&self, table: &TableHandle, writer: W) -> Result<(), DataError> {
        let state = self.state.read();
        let memory = state.table(table)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(memory.columns.keys())?;
        for row in 0..memory.rows {
            csv_writer.write_record(memory.columns.values().map(|v| v[row].to_text()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_csv_cell(text: &str) -> CellValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        CellValue::Empty
    } else if let Ok(n) = trimmed.parse::<f64>() {
        CellValue::Number(n)
    } else {
        CellValue::Text(text.to_string())
    }
}

impl TabularStore for MemoryStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn try_get_table(&self, sheet: &str, table: &str) -> Option<TableHandle> {
        let handle = TableHandle::new(sheet, table);
        self.state.read().table(&handle).ok().map(|_| handle)
    }

    fn row_count(&self, table: &TableHandle) -> Result<usize, DataError> {
        Ok(self.state.read().table(table)?.rows)
    }

    fn try_get_column(&self, table: &TableHandle, name: &str) -> Option<ColumnHandle> {
        let state = self.state.read();
        let memory = state.table(table).ok()?;
        memory.columns.contains_key(name).then(|| ColumnHandle {
            table: table.clone(),
            name: name.to_string(),
        })
    }

    fn add_column(&self, table: &TableHandle, name: &str) -> Result<ColumnHandle, DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        let rows = memory.rows;
        memory
            .columns
            .entry(name.to_string())
            .or_insert_with(|| vec![CellValue::Empty; rows]);

        Ok(ColumnHandle {
            table: table.clone(),
            name: name.to_string(),
        })
    }

    fn read_column_values(&self, column: &ColumnHandle) -> Result<Vec<CellValue>, DataError> {
        let state = self.state.read();
        state
            .table(&column.table)?
            .columns
            .get(&column.name)
            .cloned()
            .ok_or_else(|| DataError::ColumnNotFound(column.name.clone()))
    }

    fn write_column_values(
        &self,
        column: &ColumnHandle,
        values: &[CellValue],
    ) -> Result<(), DataError> {
        if self.failing_columns.lock().contains(column) {
            return Err(DataError::Store(format!(
                "write to column '{}' of {} rejected by host",
                column.name, column.table
            )));
        }

        let mut state = self.state.write();
        let memory = state.table_mut(&column.table)?;
        let rows = memory.rows;
        let target = memory
            .columns
            .get_mut(&column.name)
            .ok_or_else(|| DataError::ColumnNotFound(column.name.clone()))?;

        if values.len() != rows {
            return Err(DataError::LengthMismatch {
                column: column.name.clone(),
                expected: rows,
                actual: values.len(),
            });
        }

        target.clone_from_slice(values);
        self.writes.lock().push(column.clone());
        Ok(())
    }

    fn selected_rows(&self, table: &TableHandle) -> Result<SelectedRows, DataError> {
        Ok(self.state.read().table(table)?.selection.clone())
    }

    fn select_rows(&self, table: &TableHandle, rows: &SelectedRows) -> Result<(), DataError> {
        let mut state = self.state.write();
        let memory = state.table_mut(table)?;
        memory.selection = rows.clone();
        Ok(())
    }

    fn visible_rows(&self, table: &TableHandle) -> Result<Vec<usize>, DataError> {
        let state = self.state.read();
        let memory = state.table(table)?;
        Ok((0..memory.rows)
            .filter(|row| !memory.hidden[*row])
            .map(|row| row + 1)
            .collect())
    }

    fn active_sheet(&self) -> String {
        self.state.read().active_sheet.clone()
    }

    fn activate_sheet(&self, sheet: &str) -> Result<(), DataError> {
        let mut state = self.state.write();
        if !state.tables.iter().any(|t| t.handle.sheet == sheet) {
            return Err(DataError::Store(format!("no sheet named '{}'", sheet)));
        }
        state.active_sheet = sheet.to_string();
        Ok(())
    }
}
