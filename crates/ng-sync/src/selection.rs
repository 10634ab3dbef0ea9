//! Keeps table selection and graph selection consistent
//!
//! Mirroring a selection in one direction fires a selection-changed
//! notification in the other. A single reentrancy flag stops that round trip:
//! while it is set, incoming selection notifications are ignored.

use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashSet;
use ng_core::{CollapsedGroupId, VisualizationSurface};

use crate::controller::{EdgeController, GroupController, TableKind, VertexController};
use crate::SyncError;

/// Selection mirroring between the tables and the visualization surface
pub struct SelectionCoordinator {
    enabled: AtomicBool,
    ignore_selection_events: AtomicBool,
}

/// Ignores selection notifications until dropped.
///
/// Restores the flag's previous value, so suppressions nest.
pub struct SelectionSuppression<'a> {
    coordinator: &'a SelectionCoordinator,
    previous: bool,
}

impl Drop for SelectionSuppression<'_> {
    fn drop(&mut self) {
        self.coordinator
            .ignore_selection_events
            .store(self.previous, Ordering::SeqCst);
    }
}

impl SelectionCoordinator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            ignore_selection_events: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether selection notifications are currently being ignored
    pub fn is_ignoring(&self) -> bool {
        self.ignore_selection_events.load(Ordering::SeqCst)
    }

    /// Ignore selection notifications for the guard's lifetime
    pub fn suppress(&self) -> SelectionSuppression<'_> {
        let previous = self.ignore_selection_events.swap(true, Ordering::SeqCst);
        SelectionSuppression {
            coordinator: self,
            previous,
        }
    }

    fn should_handle(&self, source: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if self.is_ignoring() {
            tracing::trace!("Ignoring {} selection change", source);
            return false;
        }
        true
    }

    /// Mirror a table's selection into the graph.
    ///
    /// Returns false when the notification was ignored.
    pub fn on_table_selection_changed(
        &self,
        kind: TableKind,
        edges: &EdgeController,
        vertices: &VertexController,
        groups: &GroupController,
        surface: &dyn VisualizationSurface,
    ) -> Result<bool, SyncError> {
        if !self.should_handle("table") {
            return Ok(false);
        }
        let _suppressed = self.suppress();

        match kind {
            TableKind::Edges => {
                let ids = edges.table().selected_row_ids()?;
                surface.select(&[], &ids);
            }
            TableKind::Vertices => {
                let ids = vertices.table().selected_row_ids()?;
                surface.select(&ids, &[]);
            }
            TableKind::Groups => {
                let mut names: Vec<CollapsedGroupId> =
                    groups.selected_group_names()?.into_iter().collect();
                names.sort();
                surface.select_collapsed_groups(&names);
            }
        }
        tracing::trace!("Mirrored {} table selection into the graph", kind);
        Ok(true)
    }

    /// Mirror the graph's selection into all three tables.
    ///
    /// Returns false when the notification was ignored.
    pub fn on_graph_selection_changed(
        &self,
        edges: &EdgeController,
        vertices: &VertexController,
        groups: &GroupController,
        surface: &dyn VisualizationSurface,
    ) -> Result<bool, SyncError> {
        if !self.should_handle("graph") {
            return Ok(false);
        }
        let _suppressed = self.suppress();

        let vertex_rows = vertices
            .table()
            .select_rows_by_ids(&surface.selected_vertex_ids())?;
        let edge_rows = edges
            .table()
            .select_rows_by_ids(&surface.selected_edge_ids())?;

        let names: AHashSet<String> = surface.selected_collapsed_groups().into_iter().collect();
        let group_rows = if groups.table().try_table().is_some() {
            groups
                .table()
                .select_rows_by_column_values(&groups.columns().name, &names)?
        } else {
            0
        };

        tracing::trace!(
            "Mirrored graph selection: {} vertex, {} edge, {} group rows",
            vertex_rows,
            edge_rows,
            group_rows
        );
        Ok(true)
    }
}

impl Default for SelectionCoordinator {
    fn default() -> Self {
        Self::new(true)
    }
}
