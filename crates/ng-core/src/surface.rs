//! The visualization surface as seen by the synchronization engine

use crate::graph::{CollapsedGroupId, CollapsedGroupVertex, RowId};

/// Trait for the graph surface embedded next to the tables.
///
/// Implementations own their native selection and layout; the engine only
/// queries and nudges them.
pub trait VisualizationSurface: Send + Sync {
    /// Collapsed groups currently drawn as a single vertex
    fn collapsed_groups(&self) -> Vec<CollapsedGroupVertex>;

    /// Whether the named group is currently collapsed
    fn is_collapsed_group(&self, group: &str) -> bool;

    /// Row IDs of the selected vertices
    fn selected_vertex_ids(&self) -> Vec<RowId>;

    /// Row IDs of the selected edges
    fn selected_edge_ids(&self) -> Vec<RowId>;

    /// Names of the selected collapsed groups
    fn selected_collapsed_groups(&self) -> Vec<CollapsedGroupId>;

    /// Replace the selection with the given vertices and edges
    fn select(&self, vertex_ids: &[RowId], edge_ids: &[RowId]);

    /// Select the named collapsed groups
    fn select_collapsed_groups(&self, groups: &[CollapsedGroupId]);

    /// Re-read the tables and redraw. May clear the selection.
    fn refresh(&self);
}
