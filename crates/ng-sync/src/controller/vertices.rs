use std::sync::Arc;

use ng_core::settings::VertexColumns;
use ng_core::{
    AttributeValue, Command, CommandHandler, EditedVertexAttributes, GraphRect, RowId,
    SetVisualAttribute, SyncSettings, VertexLocation,
};
use ng_data::convert::{
    AttributeConverter, BooleanConverter, ColorConverter, LabelPositionConverter,
    NumericRangeConverter, VertexRadiusConverter, VertexShapeConverter, VertexVisibilityConverter,
};
use ng_data::{CellValue, TabularStore};

use super::{BatchOutcome, TableController, TableKind};
use crate::SyncError;

/// Keeps the vertex table in step with the graph's vertices
pub struct VertexController {
    table: TableController,
    columns: VertexColumns,
}

impl VertexController {
    pub fn new(store: Arc<dyn TabularStore>, settings: &SyncSettings) -> Self {
        Self {
            table: TableController::new(
                TableKind::Vertices,
                store,
                settings.vertex_table.clone(),
                settings.id_column.clone(),
                settings.locations,
            ),
            columns: settings.vertex_columns.clone(),
        }
    }

    pub fn table(&self) -> &TableController {
        &self.table
    }

    pub fn columns(&self) -> &VertexColumns {
        &self.columns
    }

    /// Apply a visual attribute to the selected vertex rows
    pub fn apply_visual_attribute(
        &self,
        command: &mut SetVisualAttribute,
    ) -> Result<Option<BatchOutcome>, SyncError> {
        let (column, value) = match command.value {
            AttributeValue::Color(color) => {
                (self.columns.color.as_str(), ColorConverter.to_store(&color))
            }
            AttributeValue::Alpha(alpha) => (self.columns.alpha.as_str(), CellValue::from(alpha)),
            AttributeValue::VertexShape(shape) => (
                self.columns.shape.as_str(),
                VertexShapeConverter.to_store(&shape),
            ),
            AttributeValue::VertexRadius(radius) => {
                (self.columns.radius.as_str(), CellValue::from(radius))
            }
            AttributeValue::VertexVisibility(visibility) => (
                self.columns.visibility.as_str(),
                VertexVisibilityConverter.to_store(&visibility),
            ),
            _ => return Ok(None),
        };

        let outcome = self.table.set_selected_column_value(column, value)?;
        if outcome.is_some() {
            command.handled = true;
        }
        Ok(outcome)
    }

    /// Write attributes edited in the graph back to the vertex rows.
    ///
    /// The marked column is added to the table if it is missing; every other
    /// column must already exist.
    pub fn apply_edited_attributes(
        &self,
        vertex_ids: &[RowId],
        edits: &EditedVertexAttributes,
    ) -> Result<BatchOutcome, SyncError> {
        let columns = &self.columns;
        let mut cells: Vec<(&str, CellValue)> = Vec::new();

        if let Some(color) = &edits.color {
            cells.push((columns.color.as_str(), ColorConverter.to_store(color)));
        }
        if let Some(shape) = &edits.shape {
            cells.push((columns.shape.as_str(), VertexShapeConverter.to_store(shape)));
        }
        if let Some(radius) = &edits.radius {
            cells.push((columns.radius.as_str(), VertexRadiusConverter.to_store(radius)));
        }
        if let Some(alpha) = &edits.alpha {
            cells.push((
                columns.alpha.as_str(),
                NumericRangeConverter::alpha().to_store(alpha),
            ));
        }
        if let Some(visibility) = &edits.visibility {
            cells.push((
                columns.visibility.as_str(),
                VertexVisibilityConverter.to_store(visibility),
            ));
        }
        if let Some(label) = edits.label.as_deref().filter(|l| !l.is_empty()) {
            cells.push((columns.label.as_str(), CellValue::from(label)));
        }
        if let Some(color) = &edits.label_fill_color {
            cells.push((columns.label_fill_color.as_str(), ColorConverter.to_store(color)));
        }
        if let Some(position) = &edits.label_position {
            cells.push((
                columns.label_position.as_str(),
                LabelPositionConverter.to_store(position),
            ));
        }
        if let Some(tooltip) = edits.tooltip.as_deref().filter(|t| !t.is_empty()) {
            cells.push((columns.tooltip.as_str(), CellValue::from(tooltip)));
        }
        if let Some(locked) = &edits.locked {
            cells.push((columns.locked.as_str(), BooleanConverter.to_store(locked)));
        }

        let mut added: Vec<&str> = Vec::new();
        if let Some(marked) = &edits.marked {
            cells.push((columns.marked.as_str(), BooleanConverter.to_store(marked)));
            added.push(columns.marked.as_str());
        }

        self.table.write_rows(vertex_ids, &cells, &added)
    }

    /// Write vertex locations into the X and Y columns.
    ///
    /// With `respect_locks`, vertices flagged in the locked column keep
    /// their stored location.
    pub fn set_vertex_locations(
        &self,
        vertices: &[VertexLocation],
        graph_rect: GraphRect,
        respect_locks: bool,
    ) -> Result<BatchOutcome, SyncError> {
        let locked = respect_locks.then_some(self.columns.locked.as_str());
        self.table.set_locations(
            vertices,
            graph_rect,
            &self.columns.x,
            &self.columns.y,
            locked,
            |vertex| Some((vertex.row_id, vertex.location)),
        )
    }
}

impl CommandHandler for VertexController {
    fn on_command_sent(&self, command: &mut Command) {
        let Command::SetVisualAttribute(set) = command else {
            return;
        };
        if set.handled || !self.table.store().is_ready() {
            return;
        }
        if let Err(e) = self.apply_visual_attribute(set) {
            tracing::error!("Failed to set {:?} on vertex table: {}", set.attribute(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::{Color, VertexShape};
    use ng_data::{MemoryStore, RowSpan, SelectedRows, TableHandle};

    fn vertices() -> (Arc<MemoryStore>, VertexController, TableHandle) {
        let store = Arc::new(MemoryStore::new());
        let table = store.add_table(
            "Vertices",
            "Vertices",
            &["ID", "Vertex", "Color", "Shape", "Size", "Locked?", "X", "Y"],
        );
        for (id, name) in [(10_i64, "a"), (20, "b"), (30, "c")] {
            store
                .append_row(&table, vec![("ID", id.into()), ("Vertex", name.into())])
                .unwrap();
        }
        let controller = VertexController::new(store.clone(), &SyncSettings::default());
        (store, controller, table)
    }

    #[test]
    fn test_shape_goes_to_selected_rows() {
        let (store, controller, table) = vertices();
        store
            .select_rows(&table, &SelectedRows::new(vec![RowSpan::new(2, 3)]))
            .unwrap();

        let mut command = SetVisualAttribute::new(AttributeValue::VertexShape(VertexShape::Square));
        let outcome = controller.apply_visual_attribute(&mut command).unwrap().unwrap();

        assert!(command.handled);
        assert_eq!(outcome.rows_written, 2);
        assert_eq!(store.cell(&table, "Shape", 1), Some(CellValue::Empty));
        assert_eq!(store.cell(&table, "Shape", 2), Some("Square".into()));
        assert_eq!(store.write_count(&table, "Shape"), 1);
    }

    #[test]
    fn test_edge_only_attribute_is_ignored() {
        let (store, controller, table) = vertices();
        store
            .select_rows(&table, &SelectedRows::new(vec![RowSpan::single(1)]))
            .unwrap();

        let mut command = SetVisualAttribute::new(AttributeValue::EdgeWidth(3.0));
        assert!(controller.apply_visual_attribute(&mut command).unwrap().is_none());
        assert!(!command.handled);
        assert_eq!(store.total_writes(), 0);
    }

    #[test]
    fn test_edited_attributes_add_marked_column() {
        let (store, controller, table) = vertices();
        let edits = EditedVertexAttributes {
            color: Some(Color::rgb(255, 0, 0)),
            radius: Some(5.0),
            marked: Some(true),
            label: Some(String::new()),
            ..Default::default()
        };

        let outcome = controller.apply_edited_attributes(&[30, 99], &edits).unwrap();

        assert_eq!(outcome.rows_written, 1);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.columns_committed, 3);
        assert_eq!(store.cell(&table, "Color", 3), Some("Red".into()));
        assert_eq!(store.cell(&table, "Size", 3), Some(CellValue::Number(4.0)));
        assert_eq!(store.cell(&table, "Marked?", 3), Some("Yes".into()));
        assert!(store.try_get_column(&table, "Label").is_none());
    }

    #[test]
    fn test_layout_respects_locks_but_drag_does_not() {
        let (store, controller, table) = vertices();
        store.set_cell(&table, "Locked?", 1, "Yes".into()).unwrap();
        let rect = GraphRect::new(0.0, 0.0, 100.0, 100.0);
        let moved = [VertexLocation::new(10, 0.0, 100.0)];

        let outcome = controller.set_vertex_locations(&moved, rect, true).unwrap();
        assert_eq!(outcome.rows_written, 0);
        assert_eq!(store.total_writes(), 0);

        controller.set_vertex_locations(&moved, rect, false).unwrap();
        assert_eq!(store.cell(&table, "X", 1), Some(CellValue::Number(0.0)));
        assert_eq!(store.cell(&table, "Y", 1), Some(CellValue::Number(0.0)));
    }
}
