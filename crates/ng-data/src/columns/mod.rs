//! Batched column access
//!
//! A batch reads each column it touches once, mutates the in-memory copy,
//! and writes each modified column back once, however many rows changed.

use indexmap::IndexMap;

use crate::store::{CellValue, ColumnHandle, TableHandle, TabularStore};
use crate::DataError;

/// One column read into memory
#[derive(Debug, Clone)]
pub struct ColumnBatch {
    handle: ColumnHandle,
    values: Vec<CellValue>,
    touched: usize,
}

impl ColumnBatch {
    /// Read a column, or None if the table has no such column
    pub fn try_read(
        store: &dyn TabularStore,
        table: &TableHandle,
        name: &str,
    ) -> Result<Option<Self>, DataError> {
        let Some(handle) = store.try_get_column(table, name) else {
            return Ok(None);
        };
        Ok(Some(Self::read(store, handle)?))
    }

    /// Read a column, adding it to the table first if needed
    pub fn read_or_add(
        store: &dyn TabularStore,
        table: &TableHandle,
        name: &str,
    ) -> Result<Self, DataError> {
        let handle = store.try_get_or_add_column(table, name)?;
        Self::read(store, handle)
    }

    fn read(store: &dyn TabularStore, handle: ColumnHandle) -> Result<Self, DataError> {
        let values = store.read_column_values(&handle)?;
        Ok(Self {
            handle,
            values,
            touched: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell at a 1-based position
    pub fn get(&self, position: usize) -> Option<&CellValue> {
        position.checked_sub(1).and_then(|i| self.values.get(i))
    }

    /// Overwrite the cell at a 1-based position
    pub fn set(&mut self, position: usize, value: CellValue) -> Result<(), DataError> {
        let rows = self.values.len();
        let cell = position
            .checked_sub(1)
            .and_then(|i| self.values.get_mut(i))
            .ok_or(DataError::RowOutOfRange {
                row: position,
                rows,
            })?;
        *cell = value;
        self.touched += 1;
        Ok(())
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Number of cell writes made since the column was read
    pub fn touched(&self) -> usize {
        self.touched
    }

    pub fn is_dirty(&self) -> bool {
        self.touched > 0
    }

    /// Write the column back if anything changed. Returns whether it wrote.
    pub fn commit(&mut self, store: &dyn TabularStore) -> Result<bool, DataError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        store.write_column_values(&self.handle, &self.values)?;
        self.touched = 0;
        Ok(true)
    }
}

/// The set of columns one batch works on.
///
/// Columns are read lazily on first use and committed in the order they were
/// first used. An absent column is remembered as absent and every update
/// aimed at it is dropped.
pub struct BatchedColumns<'a> {
    store: &'a dyn TabularStore,
    table: TableHandle,
    columns: IndexMap<String, Option<ColumnBatch>>,
}

impl<'a> BatchedColumns<'a> {
    pub fn new(store: &'a dyn TabularStore, table: TableHandle) -> Self {
        Self {
            store,
            table,
            columns: IndexMap::new(),
        }
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    /// Read a column into the batch. Returns false if the column is absent.
    pub fn load(&mut self, name: &str) -> Result<bool, DataError> {
        if let Some(loaded) = self.columns.get(name) {
            return Ok(loaded.is_some());
        }

        let batch = ColumnBatch::try_read(self.store, &self.table, name)?;
        if batch.is_none() {
            tracing::debug!("Column '{}' not in {}; skipping its updates", name, self.table);
        }
        let present = batch.is_some();
        self.columns.insert(name.to_string(), batch);
        Ok(present)
    }

    /// Read a column into the batch, adding it to the table if absent
    pub fn load_or_add(&mut self, name: &str) -> Result<(), DataError> {
        if let Some(Some(_)) = self.columns.get(name) {
            return Ok(());
        }
        let batch = ColumnBatch::read_or_add(self.store, &self.table, name)?;
        self.columns.insert(name.to_string(), Some(batch));
        Ok(())
    }

    /// Whether a loaded column exists in the table
    pub fn has_column(&self, name: &str) -> bool {
        matches!(self.columns.get(name), Some(Some(_)))
    }

    /// Cell of a loaded column
    pub fn get(&self, name: &str, position: usize) -> Option<&CellValue> {
        self.columns.get(name)?.as_ref()?.get(position)
    }

    /// Write a cell, loading the column first if needed.
    ///
    /// Returns false without error when the column is absent.
    pub fn set(
        &mut self,
        name: &str,
        position: usize,
        value: CellValue,
    ) -> Result<bool, DataError> {
        if !self.load(name)? {
            return Ok(false);
        }
        match self.columns.get_mut(name) {
            Some(Some(column)) => {
                column.set(position, value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Commit every modified column once, in first-use order.
    ///
    /// Returns the number of columns written.
    pub fn commit_all(mut self) -> Result<usize, DataError> {
        let mut committed = 0;
        for column in self.columns.values_mut().flatten() {
            if column.commit(self.store)? {
                committed += 1;
            }
        }

        if committed > 0 {
            tracing::debug!("Committed {} column(s) to {}", committed, self.table);
        }
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn edge_store(rows: usize) -> (MemoryStore, TableHandle) {
        let store = MemoryStore::new();
        let table = store.add_table("Edges", "Edges", &["ID", "Color", "Width", "Style"]);
        for id in 1..=rows {
            store
                .append_row(&table, vec![("ID", CellValue::from(id as i64))])
                .unwrap();
        }
        (store, table)
    }

    #[test]
    fn test_one_write_per_column() {
        let (store, table) = edge_store(100);
        let mut batch = BatchedColumns::new(&store, table.clone());

        for position in 1..=100 {
            batch.set("Color", position, "Red".into()).unwrap();
            batch.set("Width", position, CellValue::Number(2.0)).unwrap();
        }
        batch.set("Color", 5, "Blue".into()).unwrap();

        assert_eq!(batch.commit_all().unwrap(), 2);
        assert_eq!(store.write_count(&table, "Color"), 1);
        assert_eq!(store.write_count(&table, "Width"), 1);
        assert_eq!(store.write_count(&table, "Style"), 0);
        assert_eq!(store.cell(&table, "Color", 5), Some("Blue".into()));
    }

    #[test]
    fn test_absent_column_is_skipped() {
        let (store, table) = edge_store(3);
        let mut batch = BatchedColumns::new(&store, table.clone());

        assert!(!batch.set("Label Font Size", 1, CellValue::Number(12.0)).unwrap());
        assert!(batch.set("Style", 1, "Dash".into()).unwrap());
        assert_eq!(batch.commit_all().unwrap(), 1);
        assert_eq!(store.total_writes(), 1);
    }

    #[test]
    fn test_loaded_but_untouched_column_is_not_written() {
        let (store, table) = edge_store(3);
        let mut batch = BatchedColumns::new(&store, table);
        assert!(batch.load("Color").unwrap());
        assert_eq!(batch.commit_all().unwrap(), 0);
        assert_eq!(store.total_writes(), 0);
    }

    #[test]
    fn test_out_of_range_position() {
        let (store, table) = edge_store(2);
        let mut column = ColumnBatch::try_read(&store, &table, "Color")
            .unwrap()
            .unwrap();
        assert!(matches!(
            column.set(3, "Red".into()),
            Err(DataError::RowOutOfRange { row: 3, rows: 2 })
        ));
        assert!(column.set(0, "Red".into()).is_err());
        assert!(!column.is_dirty());
    }
}
