//! Replay script format

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use ng_core::{
    AttributeValue, CollapsedGroupVertex, Color, GraphEvent, GroupCommand, NoParamCommand, RowId,
};
use ng_data::NumericMapping;
use ng_sync::TableKind;

/// Table names as written in scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayTable {
    Edges,
    Vertices,
    Groups,
}

impl From<ReplayTable> for TableKind {
    fn from(table: ReplayTable) -> Self {
        match table {
            ReplayTable::Edges => TableKind::Edges,
            ReplayTable::Vertices => TableKind::Vertices,
            ReplayTable::Groups => TableKind::Groups,
        }
    }
}

/// One thing that happens to the workbook or the graph
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// An event reported by the graph
    GraphEvent(GraphEvent),
    /// The user sets an attribute on the selected rows
    SetVisualAttribute(AttributeValue),
    Command(NoParamCommand),
    GroupCommand(GroupCommand),
    ActivateSheet(String),
    /// The user selects a block of rows in a table
    SelectRows {
        table: ReplayTable,
        first: usize,
        last: usize,
    },
    /// The user selects items in the graph
    SelectInGraph {
        #[serde(default)]
        vertices: Vec<RowId>,
        #[serde(default)]
        edges: Vec<RowId>,
        #[serde(default)]
        groups: Vec<String>,
    },
    /// Collapsed groups the graph draws from now on
    CollapsedGroups(Vec<CollapsedGroupVertex>),
    /// Simulate the host entering or leaving cell-edit mode
    SetReady(bool),
    AutofillNumeric {
        table: ReplayTable,
        source: String,
        dest: String,
        mapping: NumericMapping,
    },
    AutofillColor {
        table: ReplayTable,
        source: String,
        dest: String,
        mapping: NumericMapping,
        from: Color,
        to: Color,
    },
    AutofillCategories {
        table: ReplayTable,
        source: String,
        dest: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let json = r#"{
            "steps": [
                { "select_rows": { "table": "vertices", "first": 1, "last": 2 } },
                { "set_visual_attribute": { "Alpha": 40.0 } },
                { "graph_event": { "VerticesMoved": {
                    "graph_rect": { "x": 0, "y": 0, "width": 100, "height": 100 },
                    "vertices": [ { "row_id": 3, "location": { "x": 10, "y": 20 } } ]
                } } },
                { "group_command": "CollapseAllGroups" },
                { "set_ready": false },
                { "autofill_numeric": {
                    "table": "vertices", "source": "Degree", "dest": "Size",
                    "mapping": { "mode": "Logarithmic", "dest_min": 1, "dest_max": 10 }
                } }
            ]
        }"#;

        let script = Script::from_json_str(json).unwrap();
        assert_eq!(script.steps.len(), 6);
        assert!(matches!(
            script.steps[0],
            Step::SelectRows {
                table: ReplayTable::Vertices,
                first: 1,
                last: 2
            }
        ));
        match &script.steps[2] {
            Step::GraphEvent(GraphEvent::VerticesMoved(moved)) => {
                assert_eq!(moved.vertices[0].row_id, 3);
            }
            other => panic!("unexpected step {:?}", other),
        }
        match &script.steps[5] {
            Step::AutofillNumeric { mapping, .. } => {
                assert_eq!(mapping.source_min, None);
                assert!(!mapping.ignore_outliers);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }
}
