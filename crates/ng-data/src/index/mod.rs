//! Row ID to row position index
//!
//! Positions move whenever rows are inserted, deleted, sorted or filtered, so
//! an index is only valid for the batch it was built for. Build it once per
//! batch and resolve every row of that batch against it.

use ahash::AHashMap;
use ng_core::RowId;

use crate::store::{CellValue, TableHandle, TabularStore};
use crate::DataError;

/// Maps each Row ID in a table to its current 1-based position
#[derive(Debug, Clone, Default)]
pub struct RowIdIndex {
    positions: AHashMap<RowId, usize>,
}

impl RowIdIndex {
    /// Read the ID column once and index every row that has an ID
    pub fn build(
        store: &dyn TabularStore,
        table: &TableHandle,
        id_column: &str,
    ) -> Result<Self, DataError> {
        let column = store
            .try_get_column(table, id_column)
            .ok_or_else(|| DataError::ColumnNotFound(id_column.to_string()))?;
        let values = store.read_column_values(&column)?;
        let index = Self::from_values(&values);

        tracing::debug!(
            "Built row ID index for {}: {} IDs over {} rows",
            table,
            index.len(),
            values.len()
        );
        Ok(index)
    }

    /// Index ID cells already in memory; the first cell is position 1.
    ///
    /// Cells that hold no ID are skipped. If an ID repeats, the last
    /// occurrence wins.
    pub fn from_values(values: &[CellValue]) -> Self {
        let mut positions = AHashMap::with_capacity(values.len());

        for (offset, cell) in values.iter().enumerate() {
            let Some(id) = cell.as_row_id() else {
                continue;
            };
            if let Some(previous) = positions.insert(id, offset + 1) {
                tracing::warn!(
                    "Row ID {} appears at rows {} and {}; using row {}",
                    id,
                    previous,
                    offset + 1,
                    offset + 1
                );
            }
        }

        Self { positions }
    }

    /// Current position of a row, or None if no row has that ID
    pub fn resolve(&self, id: RowId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All (ID, position) pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (RowId, usize)> + '_ {
        self.positions.iter().map(|(id, position)| (*id, *position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_build_skips_rows_without_ids() {
        let values = vec![
            CellValue::Number(10.0),
            CellValue::Empty,
            CellValue::Text("12".into()),
            CellValue::Text("n/a".into()),
        ];
        let index = RowIdIndex::from_values(&values);

        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve(10), Some(1));
        assert_eq!(index.resolve(12), Some(3));
        assert_eq!(index.resolve(11), None);
    }

    #[test]
    fn test_duplicate_id_resolves_to_last_row() {
        let values = vec![
            CellValue::Number(5.0),
            CellValue::Number(6.0),
            CellValue::Number(5.0),
        ];
        let index = RowIdIndex::from_values(&values);
        assert_eq!(index.resolve(5), Some(3));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_missing_id_column() {
        let store = MemoryStore::new();
        let table = store.add_table("Edges", "Edges", &["Color"]);
        assert!(matches!(
            RowIdIndex::build(&store, &table, "ID"),
            Err(DataError::ColumnNotFound(_))
        ));
    }
}
