//! Per-table synchronization controllers
//!
//! [`TableController`] holds what every table shares: finding the table,
//! building the Row ID index, reading the user's selection, and running a
//! batch with the table's sheet active. The edge, vertex and group
//! controllers add the columns and attributes specific to their table.

mod edges;
mod groups;
mod vertices;

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;
use ng_core::settings::LocationSettings;
use ng_core::{GraphRect, PointF, RowId, TableLocation};
use ng_data::convert::{AttributeConverter, BooleanConverter, VertexLocationConverter};
use ng_data::{
    BatchedColumns, CellValue, ColumnBatch, DataError, RowIdIndex, SelectedRows, TableHandle,
    TabularStore,
};

use crate::guard::ActiveSheetGuard;
use crate::SyncError;

pub use edges::EdgeController;
pub use groups::GroupController;
pub use vertices::VertexController;

/// The three synchronized tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Edges,
    Vertices,
    Groups,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::Edges => "edges",
            TableKind::Vertices => "vertices",
            TableKind::Groups => "groups",
        };
        f.write_str(name)
    }
}

/// Result of one batch against one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows that received at least one value
    pub rows_written: usize,
    /// Rows left alone: stale IDs, locked vertices, unusable entries
    pub rows_skipped: usize,
    /// Whole-column writes made to the store
    pub columns_committed: usize,
}

impl BatchOutcome {
    pub fn merge(&mut self, other: BatchOutcome) {
        self.rows_written += other.rows_written;
        self.rows_skipped += other.rows_skipped;
        self.columns_committed += other.columns_committed;
    }

    pub fn is_empty(&self) -> bool {
        *self == BatchOutcome::default()
    }
}

/// Store access shared by the three table controllers
pub struct TableController {
    kind: TableKind,
    store: Arc<dyn TabularStore>,
    location: TableLocation,
    id_column: String,
    locations: LocationSettings,
}

impl TableController {
    pub fn new(
        kind: TableKind,
        store: Arc<dyn TabularStore>,
        location: TableLocation,
        id_column: impl Into<String>,
        locations: LocationSettings,
    ) -> Self {
        Self {
            kind,
            store,
            location,
            id_column: id_column.into(),
            locations,
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn store(&self) -> &dyn TabularStore {
        self.store.as_ref()
    }

    pub fn location(&self) -> &TableLocation {
        &self.location
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// The table, if the workbook has it
    pub fn try_table(&self) -> Option<TableHandle> {
        self.store
            .try_get_table(&self.location.sheet, &self.location.table)
    }

    /// The table, or an error if the workbook lacks it
    pub fn table(&self) -> Result<TableHandle, SyncError> {
        self.try_table().ok_or_else(|| {
            SyncError::from(DataError::TableNotFound {
                sheet: self.location.sheet.clone(),
                table: self.location.table.clone(),
            })
        })
    }

    /// Build a fresh Row ID index for the table
    pub fn build_index(&self, table: &TableHandle) -> Result<RowIdIndex, SyncError> {
        Ok(RowIdIndex::build(self.store(), table, &self.id_column)?)
    }

    /// Whether the table's sheet is the one the user is looking at
    pub fn is_sheet_active(&self) -> bool {
        self.store.active_sheet() == self.location.sheet
    }

    /// Selected rows that are not filtered out.
    ///
    /// Only the active sheet has a selection the user can act on, so this is
    /// empty whenever the table's sheet isn't active.
    pub fn selected_visible_positions(&self) -> Result<Vec<usize>, SyncError> {
        let Some(table) = self.try_table() else {
            return Ok(Vec::new());
        };
        if !self.is_sheet_active() {
            return Ok(Vec::new());
        }

        let selected = self.store.selected_rows(&table)?;
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .visible_rows(&table)?
            .into_iter()
            .filter(|position| selected.contains(*position))
            .collect())
    }

    /// Write one value into a column for every visible selected row.
    ///
    /// Returns None when nothing is selected or the table lacks the column;
    /// an absent column is optional and is never added here.
    pub fn set_selected_column_value(
        &self,
        column: &str,
        value: CellValue,
    ) -> Result<Option<BatchOutcome>, SyncError> {
        let positions = self.selected_visible_positions()?;
        if positions.is_empty() {
            return Ok(None);
        }
        let table = self.table()?;
        if self.store.try_get_column(&table, column).is_none() {
            tracing::debug!("Column '{}' not in {}; attribute not set", column, table);
            return Ok(None);
        }

        let outcome = self.write_batch(|batch, _index, outcome| {
            batch.load(column)?;
            for position in &positions {
                batch.set(column, *position, value.clone())?;
            }
            outcome.rows_written = positions.len();
            Ok(())
        })?;
        Ok(Some(outcome))
    }

    /// Distinct non-empty values of a column over the visible selected rows
    pub fn get_selected_string_column_values(
        &self,
        column: &str,
    ) -> Result<AHashSet<String>, SyncError> {
        let positions = self.selected_visible_positions()?;
        if positions.is_empty() {
            return Ok(AHashSet::new());
        }

        let table = self.table()?;
        let Some(values) = ColumnBatch::try_read(self.store(), &table, column)? else {
            return Ok(AHashSet::new());
        };

        Ok(positions
            .into_iter()
            .filter_map(|position| values.get(position))
            .filter(|cell| !cell.is_empty())
            .map(CellValue::to_text)
            .collect())
    }

    /// Row IDs of the visible selected rows
    pub fn selected_row_ids(&self) -> Result<Vec<RowId>, SyncError> {
        let positions = self.selected_visible_positions()?;
        if positions.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.table()?;
        let ids = ColumnBatch::try_read(self.store(), &table, &self.id_column)?
            .ok_or_else(|| SyncError::from(DataError::ColumnNotFound(self.id_column.clone())))?;

        Ok(positions
            .into_iter()
            .filter_map(|position| ids.get(position).and_then(CellValue::as_row_id))
            .collect())
    }

    /// Select the visible rows whose column value is in `values`.
    ///
    /// An empty set clears the selection. Returns the number of rows selected.
    pub fn select_rows_by_column_values(
        &self,
        column: &str,
        values: &AHashSet<String>,
    ) -> Result<usize, SyncError> {
        let table = self.table()?;
        if values.is_empty() {
            self.store.select_rows(&table, &SelectedRows::default())?;
            return Ok(0);
        }

        let Some(cells) = ColumnBatch::try_read(self.store(), &table, column)? else {
            tracing::debug!("Column '{}' not in {}; nothing to select", column, table);
            return Ok(0);
        };

        let positions: Vec<usize> = self
            .store
            .visible_rows(&table)?
            .into_iter()
            .filter(|position| {
                cells
                    .get(*position)
                    .map(|cell| values.contains(&cell.to_text()))
                    .unwrap_or(false)
            })
            .collect();

        let count = positions.len();
        self.store
            .select_rows(&table, &SelectedRows::from_positions(positions))?;
        Ok(count)
    }

    /// Select the rows with the given IDs. Stale IDs are ignored.
    pub fn select_rows_by_ids(&self, ids: &[RowId]) -> Result<usize, SyncError> {
        let table = self.table()?;
        if ids.is_empty() {
            self.store.select_rows(&table, &SelectedRows::default())?;
            return Ok(0);
        }

        let index = self.build_index(&table)?;
        let positions: Vec<usize> = ids.iter().filter_map(|id| index.resolve(*id)).collect();
        let count = positions.len();
        self.store
            .select_rows(&table, &SelectedRows::from_positions(positions))?;
        Ok(count)
    }

    /// Run one batch against the table.
    ///
    /// The table's sheet is active while `fill` runs and while the touched
    /// columns are committed, and the previous sheet is restored afterwards
    /// whether or not the batch succeeded.
    pub fn write_batch<F>(&self, fill: F) -> Result<BatchOutcome, SyncError>
    where
        F: FnOnce(&mut BatchedColumns<'_>, &RowIdIndex, &mut BatchOutcome) -> Result<(), SyncError>,
    {
        let table = self.table()?;
        let _active = ActiveSheetGuard::activate(self.store(), &table.sheet)?;

        let index = self.build_index(&table)?;
        let mut batch = BatchedColumns::new(self.store(), table.clone());
        let mut outcome = BatchOutcome::default();

        fill(&mut batch, &index, &mut outcome)?;
        outcome.columns_committed = batch.commit_all()?;

        tracing::debug!(
            "Batch on {} table: {} rows written, {} skipped, {} columns committed",
            self.kind,
            outcome.rows_written,
            outcome.rows_skipped,
            outcome.columns_committed
        );
        Ok(outcome)
    }

    /// Write the same cells into every row named by `ids`.
    ///
    /// Columns in `added` are created if the table lacks them; other absent
    /// columns are skipped. Stale IDs are skipped.
    pub fn write_rows(
        &self,
        ids: &[RowId],
        cells: &[(&str, CellValue)],
        added: &[&str],
    ) -> Result<BatchOutcome, SyncError> {
        if ids.is_empty() || cells.is_empty() {
            return Ok(BatchOutcome::default());
        }

        self.write_batch(|batch, index, outcome| {
            for column in added {
                batch.load_or_add(column)?;
            }

            for row_id in ids {
                let Some(position) = index.resolve(*row_id) else {
                    tracing::trace!("Row ID {} no longer in {} table; skipped", row_id, self.kind);
                    outcome.rows_skipped += 1;
                    continue;
                };

                let mut wrote = false;
                for (column, value) in cells {
                    wrote |= batch.set(column, position, value.clone())?;
                }
                if wrote {
                    outcome.rows_written += 1;
                } else {
                    outcome.rows_skipped += 1;
                }
            }
            Ok(())
        })
    }

    /// Write graph locations into a pair of coordinate columns.
    ///
    /// `extractor` gives the Row ID and graph location of an entry, or None
    /// for entries that have no row. When `locked_column` is given, rows
    /// flagged there keep their coordinates; without it every resolvable row
    /// is written.
    pub fn set_locations<T, F>(
        &self,
        entries: &[T],
        graph_rect: GraphRect,
        x_column: &str,
        y_column: &str,
        locked_column: Option<&str>,
        extractor: F,
    ) -> Result<BatchOutcome, SyncError>
    where
        F: Fn(&T) -> Option<(RowId, PointF)>,
    {
        if entries.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let converter = VertexLocationConverter::new(
            graph_rect,
            self.locations.minimum_xy,
            self.locations.maximum_xy,
        );

        self.write_batch(|batch, index, outcome| {
            // No locked column means no row is locked, so every row is written
            let check_locks = match locked_column {
                Some(column) => batch.load(column)?,
                None => false,
            };

            for entry in entries {
                let Some((row_id, location)) = extractor(entry) else {
                    outcome.rows_skipped += 1;
                    continue;
                };
                let Some(position) = index.resolve(row_id) else {
                    tracing::trace!("Row ID {} no longer in {} table; skipped", row_id, self.kind);
                    outcome.rows_skipped += 1;
                    continue;
                };

                if check_locks && is_locked(batch, locked_column, position) {
                    outcome.rows_skipped += 1;
                    continue;
                }

                let (x, y) = converter.graph_to_store(location);
                let wrote_x = batch.set(x_column, position, CellValue::from(x))?;
                let wrote_y = batch.set(y_column, position, CellValue::from(y))?;
                if wrote_x || wrote_y {
                    outcome.rows_written += 1;
                } else {
                    outcome.rows_skipped += 1;
                }
            }
            Ok(())
        })
    }
}

fn is_locked(batch: &BatchedColumns<'_>, locked_column: Option<&str>, position: usize) -> bool {
    locked_column
        .and_then(|column| batch.get(column, position))
        .map(|cell| matches!(BooleanConverter.try_from_store(cell), Ok(Some(true))))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_data::{MemoryStore, RowSpan};

    fn vertex_controller() -> (Arc<MemoryStore>, TableController, TableHandle) {
        let store = Arc::new(MemoryStore::new());
        let table = store.add_table("Vertices", "Vertices", &["ID", "Vertex", "X", "Y", "Locked?"]);
        for (id, name) in [(1_i64, "a"), (2, "b"), (3, "c")] {
            store
                .append_row(&table, vec![("ID", id.into()), ("Vertex", name.into())])
                .unwrap();
        }
        let controller = TableController::new(
            TableKind::Vertices,
            store.clone(),
            TableLocation::new("Vertices", "Vertices"),
            "ID",
            LocationSettings {
                minimum_xy: 0.0,
                maximum_xy: 100.0,
            },
        );
        (store, controller, table)
    }

    #[test]
    fn test_selection_requires_active_sheet() {
        let (store, controller, table) = vertex_controller();
        store.add_table("Edges", "Edges", &["ID"]);
        store
            .select_rows(&table, &SelectedRows::new(vec![RowSpan::new(1, 2)]))
            .unwrap();

        assert_eq!(controller.selected_visible_positions().unwrap(), vec![1, 2]);
        store.activate_sheet("Edges").unwrap();
        assert!(controller.selected_visible_positions().unwrap().is_empty());
    }

    #[test]
    fn test_selected_values_skip_hidden_rows() {
        let (store, controller, table) = vertex_controller();
        store
            .select_rows(&table, &SelectedRows::new(vec![RowSpan::new(1, 3)]))
            .unwrap();
        store.set_row_hidden(&table, 2, true).unwrap();

        let names = controller.get_selected_string_column_values("Vertex").unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("a") && names.contains("c"));
        assert_eq!(controller.selected_row_ids().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_select_rows_by_column_values() {
        let (store, controller, table) = vertex_controller();
        let wanted: AHashSet<String> = ["c", "a", "zz"].iter().map(|s| s.to_string()).collect();

        assert_eq!(controller.select_rows_by_column_values("Vertex", &wanted).unwrap(), 2);
        assert_eq!(store.selected_rows(&table).unwrap().positions(), vec![1, 3]);

        assert_eq!(
            controller
                .select_rows_by_column_values("Vertex", &AHashSet::new())
                .unwrap(),
            0
        );
        assert!(store.selected_rows(&table).unwrap().is_empty());
    }

    #[test]
    fn test_set_locations_honors_locks_only_when_asked() {
        let (store, controller, table) = vertex_controller();
        store.set_cell(&table, "Locked?", 2, "Yes".into()).unwrap();
        let rect = GraphRect::new(0.0, 0.0, 10.0, 10.0);
        let moves = [(1_i64, PointF::new(5.0, 5.0)), (2, PointF::new(10.0, 0.0))];

        let outcome = controller
            .set_locations(&moves, rect, "X", "Y", Some("Locked?"), |m| Some(*m))
            .unwrap();
        assert_eq!(outcome.rows_written, 1);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(store.cell(&table, "X", 1), Some(CellValue::Number(50.0)));
        assert_eq!(store.cell(&table, "X", 2), Some(CellValue::Empty));

        controller
            .set_locations(&moves, rect, "X", "Y", None, |m| Some(*m))
            .unwrap();
        assert_eq!(store.cell(&table, "X", 2), Some(CellValue::Number(100.0)));
        assert_eq!(store.cell(&table, "Y", 2), Some(CellValue::Number(100.0)));
    }

    #[test]
    fn test_write_rows_skips_stale_ids_and_absent_columns() {
        let (store, controller, table) = vertex_controller();
        let cells = [("Vertex", CellValue::from("z")), ("Tooltip", CellValue::from("tip"))];

        let outcome = controller.write_rows(&[3, 42, 1], &cells, &[]).unwrap();
        assert_eq!(outcome.rows_written, 2);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.columns_committed, 1);
        assert_eq!(store.cell(&table, "Vertex", 1), Some("z".into()));
        assert_eq!(store.cell(&table, "Vertex", 2), Some("b".into()));
        assert!(store.try_get_column(&table, "Tooltip").is_none());

        controller.write_rows(&[2], &cells, &["Tooltip"]).unwrap();
        assert_eq!(store.cell(&table, "Tooltip", 2), Some("tip".into()));
    }

    #[test]
    fn test_selected_value_skips_absent_column() {
        let (store, controller, table) = vertex_controller();
        store
            .select_rows(&table, &SelectedRows::new(vec![RowSpan::single(2)]))
            .unwrap();

        let outcome = controller
            .set_selected_column_value("Opacity", CellValue::Number(50.0))
            .unwrap();
        assert!(outcome.is_none());
        assert!(store.try_get_column(&table, "Opacity").is_none());
        assert_eq!(store.total_writes(), 0);

        let outcome = controller
            .set_selected_column_value("Vertex", "z".into())
            .unwrap()
            .unwrap();
        assert_eq!(outcome.rows_written, 1);
        assert_eq!(store.cell(&table, "Vertex", 2), Some("z".into()));
    }

    #[test]
    fn test_write_batch_restores_sheet_on_failure() {
        let (store, controller, table) = vertex_controller();
        store.add_table("Edges", "Edges", &["ID"]);
        store.activate_sheet("Edges").unwrap();
        store.fail_writes_to(&table, "X");

        let result = controller.set_locations(
            &[(1_i64, PointF::new(1.0, 1.0))],
            GraphRect::new(0.0, 0.0, 10.0, 10.0),
            "X",
            "Y",
            None,
            |m| Some(*m),
        );

        assert!(matches!(result, Err(SyncError::Data(DataError::Store(_)))));
        assert_eq!(store.active_sheet(), "Edges");
    }
}
