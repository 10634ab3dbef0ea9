use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use ng_core::settings::GroupColumns;
use ng_core::{
    AttributeValue, CollapsedGroupId, CollapsedGroupVertex, Command, CommandHandler, GraphRect,
    RowId, SetVisualAttribute, SyncSettings,
};
use ng_data::convert::{AttributeConverter, BooleanConverter, ColorConverter, VertexShapeConverter};
use ng_data::{CellValue, ColumnBatch, TabularStore};

use super::{BatchOutcome, TableController, TableKind};
use crate::SyncError;

/// Keeps the group table in step with the graph's groups
pub struct GroupController {
    table: TableController,
    columns: GroupColumns,
}

impl GroupController {
    pub fn new(store: Arc<dyn TabularStore>, settings: &SyncSettings) -> Self {
        Self {
            table: TableController::new(
                TableKind::Groups,
                store,
                settings.group_table.clone(),
                settings.id_column.clone(),
                settings.locations,
            ),
            columns: settings.group_columns.clone(),
        }
    }

    pub fn table(&self) -> &TableController {
        &self.table
    }

    pub fn columns(&self) -> &GroupColumns {
        &self.columns
    }

    /// Apply a visual attribute to the selected group rows.
    ///
    /// Groups carry the color and shape their member vertices get.
    pub fn apply_visual_attribute(
        &self,
        command: &mut SetVisualAttribute,
    ) -> Result<Option<BatchOutcome>, SyncError> {
        let (column, value) = match command.value {
            AttributeValue::Color(color) => (
                self.columns.vertex_color.as_str(),
                ColorConverter.to_store(&color),
            ),
            AttributeValue::VertexShape(shape) => (
                self.columns.vertex_shape.as_str(),
                VertexShapeConverter.to_store(&shape),
            ),
            _ => return Ok(None),
        };

        let outcome = self.table.set_selected_column_value(column, value)?;
        if outcome.is_some() {
            command.handled = true;
        }
        Ok(outcome)
    }

    /// Group name to Row ID for every row that has both.
    ///
    /// A missing group table gives an empty map. A name used twice maps to
    /// its last row.
    pub fn read_group_row_ids(&self) -> Result<AHashMap<CollapsedGroupId, RowId>, SyncError> {
        let Some(table) = self.table.try_table() else {
            return Ok(AHashMap::new());
        };
        let store = self.table.store();
        let Some(names) = ColumnBatch::try_read(store, &table, &self.columns.name)? else {
            tracing::debug!("Column '{}' not in {}; no groups", self.columns.name, table);
            return Ok(AHashMap::new());
        };
        let Some(ids) = ColumnBatch::try_read(store, &table, self.table.id_column())? else {
            return Ok(AHashMap::new());
        };

        Ok(names
            .values()
            .iter()
            .zip(ids.values())
            .filter(|(name, _)| !name.is_empty())
            .filter_map(|(name, id)| id.as_row_id().map(|id| (name.to_text(), id)))
            .collect())
    }

    /// Names of the visible selected groups
    pub fn selected_group_names(&self) -> Result<AHashSet<String>, SyncError> {
        self.table
            .get_selected_string_column_values(&self.columns.name)
    }

    /// Names of every visible group, in table order
    pub fn all_group_names(&self) -> Result<Vec<String>, SyncError> {
        let Some(table) = self.table.try_table() else {
            return Ok(Vec::new());
        };
        let store = self.table.store();
        let Some(names) = ColumnBatch::try_read(store, &table, &self.columns.name)? else {
            return Ok(Vec::new());
        };

        let mut seen = AHashSet::new();
        Ok(store
            .visible_rows(&table)?
            .into_iter()
            .filter_map(|position| names.get(position))
            .filter(|cell| !cell.is_empty())
            .map(CellValue::to_text)
            .filter(|name| seen.insert(name.clone()))
            .collect())
    }

    /// Write collapsed-group locations into the collapsed X and Y columns.
    ///
    /// Groups are found through `row_ids`; a group reported more than once
    /// is written once, with its last location. Collapsed groups have no
    /// lock.
    pub fn set_collapsed_locations(
        &self,
        groups: &[CollapsedGroupVertex],
        row_ids: &AHashMap<CollapsedGroupId, RowId>,
        graph_rect: GraphRect,
    ) -> Result<BatchOutcome, SyncError> {
        let mut seen = AHashSet::new();
        let mut unique: Vec<&CollapsedGroupVertex> = groups
            .iter()
            .rev()
            .filter(|group| seen.insert(group.group.as_str()))
            .collect();
        unique.reverse();

        self.table.set_locations(
            &unique,
            graph_rect,
            &self.columns.collapsed_x,
            &self.columns.collapsed_y,
            None,
            |group| match row_ids.get(&group.group) {
                Some(row_id) => Some((*row_id, group.location)),
                None => {
                    tracing::trace!("Collapsed group '{}' has no row; skipped", group.group);
                    None
                }
            },
        )
    }

    /// Set the collapsed flag on the rows of the named groups.
    ///
    /// The flag column is added if the table lacks it.
    pub fn set_collapsed_flags(
        &self,
        groups: &[CollapsedGroupId],
        collapsed: bool,
    ) -> Result<BatchOutcome, SyncError> {
        if groups.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let wanted: AHashSet<&str> = groups.iter().map(String::as_str).collect();
        let flag = BooleanConverter.to_store(&collapsed);
        let name_column = self.columns.name.as_str();
        let flag_column = self.columns.collapsed.as_str();

        self.table.write_batch(|batch, _index, outcome| {
            if !batch.load(name_column)? {
                return Ok(());
            }
            batch.load_or_add(flag_column)?;

            let rows = self.table.store().row_count(batch.table())?;
            for position in 1..=rows {
                let matches = batch
                    .get(name_column, position)
                    .map(|cell| wanted.contains(cell.to_text().as_str()))
                    .unwrap_or(false);
                if matches && batch.set(flag_column, position, flag.clone())? {
                    outcome.rows_written += 1;
                }
            }
            Ok(())
        })
    }
}

impl CommandHandler for GroupController {
    fn on_command_sent(&self, command: &mut Command) {
        let Command::SetVisualAttribute(set) = command else {
            return;
        };
        if set.handled || !self.table.store().is_ready() {
            return;
        }
        if let Err(e) = self.apply_visual_attribute(set) {
            tracing::error!("Failed to set {:?} on group table: {}", set.attribute(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::{PointF, VertexShape};
    use ng_data::{MemoryStore, RowSpan, SelectedRows, TableHandle};

    fn groups() -> (Arc<MemoryStore>, GroupController, TableHandle) {
        let store = Arc::new(MemoryStore::new());
        let table = store.add_table(
            "Groups",
            "Groups",
            &["ID", "Group", "Vertex Shape", "Collapsed X", "Collapsed Y"],
        );
        for (id, name) in [(7_i64, "g1"), (8, "g2"), (9, "g3")] {
            store
                .append_row(&table, vec![("ID", id.into()), ("Group", name.into())])
                .unwrap();
        }
        let controller = GroupController::new(store.clone(), &SyncSettings::default());
        (store, controller, table)
    }

    #[test]
    fn test_group_row_ids() {
        let (_store, controller, _table) = groups();
        let ids = controller.read_group_row_ids().unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.get("g2"), Some(&8));
    }

    #[test]
    fn test_shape_goes_to_vertex_shape_column() {
        let (store, controller, table) = groups();
        store
            .select_rows(&table, &SelectedRows::new(vec![RowSpan::single(1)]))
            .unwrap();

        let mut command = SetVisualAttribute::new(AttributeValue::VertexShape(VertexShape::Diamond));
        controller.apply_visual_attribute(&mut command).unwrap();
        assert!(command.handled);
        assert_eq!(store.cell(&table, "Vertex Shape", 1), Some("Diamond".into()));

        let mut alpha = SetVisualAttribute::new(AttributeValue::Alpha(50.0));
        assert!(controller.apply_visual_attribute(&mut alpha).unwrap().is_none());
        assert!(!alpha.handled);
    }

    #[test]
    fn test_collapsed_locations_written_once_per_group() {
        let (store, controller, table) = groups();
        let ids = controller.read_group_row_ids().unwrap();
        let reported = [
            CollapsedGroupVertex {
                group: "g1".into(),
                location: PointF::new(0.0, 0.0),
            },
            CollapsedGroupVertex {
                group: "unknown".into(),
                location: PointF::new(1.0, 1.0),
            },
            CollapsedGroupVertex {
                group: "g1".into(),
                location: PointF::new(100.0, 100.0),
            },
        ];

        let outcome = controller
            .set_collapsed_locations(&reported, &ids, GraphRect::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();

        assert_eq!(outcome.rows_written, 1);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.columns_committed, 2);
        assert_eq!(store.cell(&table, "Collapsed X", 1), Some(CellValue::Number(9999.0)));
        assert_eq!(store.cell(&table, "Collapsed Y", 1), Some(CellValue::Number(0.0)));
    }

    #[test]
    fn test_collapsed_flags() {
        let (store, controller, table) = groups();
        let outcome = controller
            .set_collapsed_flags(&["g1".to_string(), "g3".to_string()], true)
            .unwrap();

        assert_eq!(outcome.rows_written, 2);
        assert_eq!(store.cell(&table, "Collapsed?", 1), Some("Yes".into()));
        assert_eq!(store.cell(&table, "Collapsed?", 2), Some(CellValue::Empty));
        assert_eq!(store.cell(&table, "Collapsed?", 3), Some("Yes".into()));
    }
}
