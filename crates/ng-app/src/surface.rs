//! A headless visualization surface for replays

use parking_lot::Mutex;
use tracing::info;

use ng_core::{
    CollapsedGroupId, CollapsedGroupVertex, Command, CommandHandler, PointF, RowId,
    VisualizationSurface,
};

#[derive(Debug, Default)]
struct SurfaceState {
    collapsed: Vec<CollapsedGroupVertex>,
    selected_vertices: Vec<RowId>,
    selected_edges: Vec<RowId>,
    selected_groups: Vec<CollapsedGroupId>,
    refreshes: usize,
}

/// Records what the engine asks of the graph instead of drawing it
#[derive(Debug, Default)]
pub struct ReplaySurface {
    state: Mutex<SurfaceState>,
}

impl ReplaySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of collapsed groups
    pub fn set_collapsed(&self, groups: Vec<CollapsedGroupVertex>) {
        self.state.lock().collapsed = groups;
    }

    /// Replace the graph selection, as if the user had clicked
    pub fn set_selection(&self, vertices: Vec<RowId>, edges: Vec<RowId>, groups: Vec<String>) {
        let mut state = self.state.lock();
        state.selected_vertices = vertices;
        state.selected_edges = edges;
        state.selected_groups = groups;
    }

    pub fn refresh_count(&self) -> usize {
        self.state.lock().refreshes
    }
}

impl VisualizationSurface for ReplaySurface {
    fn collapsed_groups(&self) -> Vec<CollapsedGroupVertex> {
        self.state.lock().collapsed.clone()
    }

    fn is_collapsed_group(&self, group: &str) -> bool {
        self.state.lock().collapsed.iter().any(|g| g.group == group)
    }

    fn selected_vertex_ids(&self) -> Vec<RowId> {
        self.state.lock().selected_vertices.clone()
    }

    fn selected_edge_ids(&self) -> Vec<RowId> {
        self.state.lock().selected_edges.clone()
    }

    fn selected_collapsed_groups(&self) -> Vec<CollapsedGroupId> {
        self.state.lock().selected_groups.clone()
    }

    fn select(&self, vertex_ids: &[RowId], edge_ids: &[RowId]) {
        info!(
            "Graph selection: vertices {:?}, edges {:?}",
            vertex_ids, edge_ids
        );
        let mut state = self.state.lock();
        state.selected_vertices = vertex_ids.to_vec();
        state.selected_edges = edge_ids.to_vec();
        state.selected_groups.clear();
    }

    fn select_collapsed_groups(&self, groups: &[CollapsedGroupId]) {
        info!("Graph selection: groups {:?}", groups);
        let mut state = self.state.lock();
        state.selected_vertices.clear();
        state.selected_edges.clear();
        state.selected_groups = groups.to_vec();
    }

    fn refresh(&self) {
        let mut state = self.state.lock();
        state.refreshes += 1;
        state.selected_vertices.clear();
        state.selected_edges.clear();
        state.selected_groups.clear();
        info!("Graph refreshed ({})", state.refreshes);
    }
}

/// The graph carries out collapse and expand requests from the group table
impl CommandHandler for ReplaySurface {
    fn on_command_sent(&self, command: &mut Command) {
        let Command::CollapseOrExpandGroups { collapse, groups } = command else {
            return;
        };

        let mut state = self.state.lock();
        if *collapse {
            for group in groups.iter() {
                if !state.collapsed.iter().any(|g| &g.group == group) {
                    state.collapsed.push(CollapsedGroupVertex {
                        group: group.clone(),
                        location: PointF::default(),
                    });
                }
            }
        } else {
            state.collapsed.retain(|g| !groups.contains(&g.group));
        }
        info!(
            "{} {} group(s)",
            if *collapse { "Collapsed" } else { "Expanded" },
            groups.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_and_expand_commands() {
        let surface = ReplaySurface::new();
        let mut collapse = Command::CollapseOrExpandGroups {
            collapse: true,
            groups: vec!["g1".to_string(), "g2".to_string()],
        };
        surface.on_command_sent(&mut collapse);
        surface.on_command_sent(&mut collapse);
        assert_eq!(surface.collapsed_groups().len(), 2);
        assert!(surface.is_collapsed_group("g2"));

        let mut expand = Command::CollapseOrExpandGroups {
            collapse: false,
            groups: vec!["g1".to_string()],
        };
        surface.on_command_sent(&mut expand);
        assert!(!surface.is_collapsed_group("g1"));
        assert!(surface.is_collapsed_group("g2"));
    }

    #[test]
    fn test_refresh_clears_selection() {
        let surface = ReplaySurface::new();
        surface.set_selection(vec![1, 2], vec![3], Vec::new());
        surface.refresh();
        assert!(surface.selected_vertex_ids().is_empty());
        assert_eq!(surface.refresh_count(), 1);
    }
}
