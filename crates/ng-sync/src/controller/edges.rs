use std::sync::Arc;

use ng_core::settings::EdgeColumns;
use ng_core::{
    AttributeValue, Command, CommandHandler, EditedEdgeAttributes, RowId, SetVisualAttribute,
    SyncSettings,
};
use ng_data::convert::{
    AttributeConverter, ColorConverter, EdgeStyleConverter, EdgeVisibilityConverter,
    FontSizeConverter, NumericRangeConverter,
};
use ng_data::{CellValue, TabularStore};

use super::{BatchOutcome, TableController, TableKind};
use crate::SyncError;

/// Keeps the edge table in step with the graph's edges
pub struct EdgeController {
    table: TableController,
    columns: EdgeColumns,
}

impl EdgeController {
    pub fn new(store: Arc<dyn TabularStore>, settings: &SyncSettings) -> Self {
        Self {
            table: TableController::new(
                TableKind::Edges,
                store,
                settings.edge_table.clone(),
                settings.id_column.clone(),
                settings.locations,
            ),
            columns: settings.edge_columns.clone(),
        }
    }

    pub fn table(&self) -> &TableController {
        &self.table
    }

    pub fn columns(&self) -> &EdgeColumns {
        &self.columns
    }

    /// Apply a visual attribute to the selected edge rows.
    ///
    /// Returns None, leaving the command unhandled, when the attribute
    /// doesn't apply to edges or no edge row is selected.
    pub fn apply_visual_attribute(
        &self,
        command: &mut SetVisualAttribute,
    ) -> Result<Option<BatchOutcome>, SyncError> {
        let (column, value) = match command.value {
            AttributeValue::Color(color) => (&self.columns.color, ColorConverter.to_store(&color)),
            AttributeValue::Alpha(alpha) => (&self.columns.alpha, CellValue::from(alpha)),
            AttributeValue::EdgeWidth(width) => (&self.columns.width, CellValue::from(width)),
            AttributeValue::EdgeVisibility(visibility) => (
                &self.columns.visibility,
                EdgeVisibilityConverter.to_store(&visibility),
            ),
            _ => return Ok(None),
        };

        let outcome = self.table.set_selected_column_value(column, value)?;
        if outcome.is_some() {
            command.handled = true;
        }
        Ok(outcome)
    }

    /// Write attributes edited in the graph back to the edge rows.
    ///
    /// Only the fields present in `edits` are written.
    pub fn apply_edited_attributes(
        &self,
        edge_ids: &[RowId],
        edits: &EditedEdgeAttributes,
    ) -> Result<BatchOutcome, SyncError> {
        if edge_ids.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let mut cells: Vec<(&str, CellValue)> = Vec::new();
        if let Some(color) = &edits.color {
            cells.push((self.columns.color.as_str(), ColorConverter.to_store(color)));
        }
        if let Some(width) = &edits.width {
            cells.push((self.columns.width.as_str(), NumericRangeConverter::edge_width().to_store(width)));
        }
        if let Some(style) = &edits.style {
            cells.push((self.columns.style.as_str(), EdgeStyleConverter.to_store(style)));
        }
        if let Some(alpha) = &edits.alpha {
            cells.push((self.columns.alpha.as_str(), NumericRangeConverter::alpha().to_store(alpha)));
        }
        if let Some(visibility) = &edits.visibility {
            cells.push((self.columns.visibility.as_str(), EdgeVisibilityConverter.to_store(visibility)));
        }
        if let Some(label) = edits.label.as_deref().filter(|l| !l.is_empty()) {
            cells.push((self.columns.label.as_str(), CellValue::from(label)));
        }
        if let Some(color) = &edits.label_text_color {
            cells.push((self.columns.label_text_color.as_str(), ColorConverter.to_store(color)));
        }
        if let Some(size) = &edits.label_font_size {
            cells.push((self.columns.label_font_size.as_str(), FontSizeConverter.to_store(size)));
        }

        if cells.is_empty() {
            return Ok(BatchOutcome::default());
        }
        self.table.write_rows(edge_ids, &cells, &[])
    }
}

impl CommandHandler for EdgeController {
    fn on_command_sent(&self, command: &mut Command) {
        let Command::SetVisualAttribute(set) = command else {
            return;
        };
        if set.handled || !self.table.store().is_ready() {
            return;
        }
        if let Err(e) = self.apply_visual_attribute(set) {
            tracing::error!("Failed to set {:?} on edge table: {}", set.attribute(), e);
        }
    }
}
