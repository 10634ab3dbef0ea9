//! Events raised by the visualization surface and their payloads

use serde::{Deserialize, Serialize};

use crate::visual::{
    Color, EdgeStyle, EdgeVisibility, GraphRect, LabelPosition, PointF, VertexShape,
    VertexVisibility,
};

/// Stable per-row identifier stored in a table's reserved ID column
pub type RowId = i64;

/// Identifies a collapsed group inside the visualization (the group name)
pub type CollapsedGroupId = String;

/// A vertex identified by the row it came from, with its new location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexLocation {
    pub row_id: RowId,
    pub location: PointF,
}

impl VertexLocation {
    pub fn new(row_id: RowId, x: f32, y: f32) -> Self {
        Self {
            row_id,
            location: PointF::new(x, y),
        }
    }
}

/// The synthetic vertex that stands in for a collapsed group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapsedGroupVertex {
    pub group: CollapsedGroupId,
    pub location: PointF,
}

/// The layout engine finished positioning the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutCompleted {
    pub graph_rect: GraphRect,
    pub vertices: Vec<VertexLocation>,
}

/// The user dragged one or more vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticesMoved {
    pub graph_rect: GraphRect,
    pub vertices: Vec<VertexLocation>,
}

/// One or more groups were collapsed or expanded in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupsCollapsedOrExpanded {
    pub graph_rect: GraphRect,
    /// true when a direct user action redrew the groups right away; false
    /// when a pane refresh did it and a layout event will follow
    pub redrawn_immediately: bool,
}

/// Edge attributes edited in the graph. Absent fields were not edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditedEdgeAttributes {
    pub color: Option<Color>,
    pub width: Option<f32>,
    pub style: Option<EdgeStyle>,
    /// Graph alpha, 0..=255
    pub alpha: Option<f32>,
    pub visibility: Option<EdgeVisibility>,
    pub label: Option<String>,
    pub label_text_color: Option<Color>,
    pub label_font_size: Option<f32>,
}

/// Vertex attributes edited in the graph. Absent fields were not edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditedVertexAttributes {
    pub color: Option<Color>,
    pub shape: Option<VertexShape>,
    /// Graph radius
    pub radius: Option<f32>,
    /// Graph alpha, 0..=255
    pub alpha: Option<f32>,
    pub visibility: Option<VertexVisibility>,
    pub label: Option<String>,
    pub label_fill_color: Option<Color>,
    pub label_position: Option<LabelPosition>,
    pub tooltip: Option<String>,
    pub locked: Option<bool>,
    pub marked: Option<bool>,
}

/// Attributes edited in the graph for a set of edges and/or vertices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesEditedInGraph {
    pub edge_ids: Vec<RowId>,
    pub edge_edits: Option<EditedEdgeAttributes>,
    pub vertex_ids: Vec<RowId>,
    pub vertex_edits: Option<EditedVertexAttributes>,
}

/// Everything the visualization surface reports back to the tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphEvent {
    LayoutCompleted(LayoutCompleted),
    VerticesMoved(VerticesMoved),
    GroupsCollapsedOrExpanded(GroupsCollapsedOrExpanded),
    AttributesEditedInGraph(AttributesEditedInGraph),
}

impl GraphEvent {
    /// Short name used in logs and failure notifications
    pub fn name(&self) -> &'static str {
        match self {
            GraphEvent::LayoutCompleted(_) => "LayoutCompleted",
            GraphEvent::VerticesMoved(_) => "VerticesMoved",
            GraphEvent::GroupsCollapsedOrExpanded(_) => "GroupsCollapsedOrExpanded",
            GraphEvent::AttributesEditedInGraph(_) => "AttributesEditedInGraph",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edited_attributes_deserialize_sparse() {
        let json = r#"{ "color": { "r": 255, "g": 0, "b": 0 }, "locked": true }"#;
        let edits: EditedVertexAttributes = serde_json::from_str(json).unwrap();

        assert_eq!(edits.color, Some(Color::rgb(255, 0, 0)));
        assert_eq!(edits.locked, Some(true));
        assert!(edits.shape.is_none());
        assert!(edits.label.is_none());
    }
}
