//! Names of the synchronized tables and columns, plus engine settings

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a table lives in the host document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLocation {
    pub sheet: String,
    pub table: String,
}

impl TableLocation {
    pub fn new(sheet: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            table: table.into(),
        }
    }
}

/// Column names in the edge table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeColumns {
    pub color: String,
    pub width: String,
    pub style: String,
    pub alpha: String,
    pub visibility: String,
    pub label: String,
    pub label_text_color: String,
    pub label_font_size: String,
}

impl Default for EdgeColumns {
    fn default() -> Self {
        Self {
            color: "Color".to_string(),
            width: "Width".to_string(),
            style: "Style".to_string(),
            alpha: "Opacity".to_string(),
            visibility: "Visibility".to_string(),
            label: "Label".to_string(),
            label_text_color: "Label Text Color".to_string(),
            label_font_size: "Label Font Size".to_string(),
        }
    }
}

/// Column names in the vertex table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexColumns {
    pub name: String,
    pub color: String,
    pub shape: String,
    pub radius: String,
    pub alpha: String,
    pub visibility: String,
    pub label: String,
    pub label_fill_color: String,
    pub label_position: String,
    pub tooltip: String,
    pub locked: String,
    pub marked: String,
    pub x: String,
    pub y: String,
}

impl Default for VertexColumns {
    fn default() -> Self {
        Self {
            name: "Vertex".to_string(),
            color: "Color".to_string(),
            shape: "Shape".to_string(),
            radius: "Size".to_string(),
            alpha: "Opacity".to_string(),
            visibility: "Visibility".to_string(),
            label: "Label".to_string(),
            label_fill_color: "Label Fill Color".to_string(),
            label_position: "Label Position".to_string(),
            tooltip: "Tooltip".to_string(),
            locked: "Locked?".to_string(),
            marked: "Marked?".to_string(),
            x: "X".to_string(),
            y: "Y".to_string(),
        }
    }
}

/// Column names in the group table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupColumns {
    pub name: String,
    pub vertex_color: String,
    pub vertex_shape: String,
    pub collapsed: String,
    pub collapsed_x: String,
    pub collapsed_y: String,
}

impl Default for GroupColumns {
    fn default() -> Self {
        Self {
            name: "Group".to_string(),
            vertex_color: "Vertex Color".to_string(),
            vertex_shape: "Vertex Shape".to_string(),
            collapsed: "Collapsed?".to_string(),
            collapsed_x: "Collapsed X".to_string(),
            collapsed_y: "Collapsed Y".to_string(),
        }
    }
}

/// Bounds of the table coordinate system for vertex locations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub minimum_xy: f32,
    pub maximum_xy: f32,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            minimum_xy: 0.0,
            maximum_xy: 9999.0,
        }
    }
}

/// General engine behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Mirror selection between the tables and the graph
    pub sync_selection: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            sync_selection: true,
        }
    }
}

/// Everything the engine needs to know about the host document layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Reserved column holding each row's stable ID
    pub id_column: String,
    pub edge_table: TableLocation,
    pub vertex_table: TableLocation,
    pub group_table: TableLocation,
    pub edge_columns: EdgeColumns,
    pub vertex_columns: VertexColumns,
    pub group_columns: GroupColumns,
    pub locations: LocationSettings,
    pub general: GeneralSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            id_column: "ID".to_string(),
            edge_table: TableLocation::new("Edges", "Edges"),
            vertex_table: TableLocation::new("Vertices", "Vertices"),
            group_table: TableLocation::new("Groups", "Groups"),
            edge_columns: EdgeColumns::default(),
            vertex_columns: VertexColumns::default(),
            group_columns: GroupColumns::default(),
            locations: LocationSettings::default(),
            general: GeneralSettings::default(),
        }
    }
}

impl SyncSettings {
    /// Load settings from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse settings from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
