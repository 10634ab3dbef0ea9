//! Core types for the network grid synchronization engine
//!
//! This crate holds the visualization-side vocabulary (colors, shapes,
//! positions), the graph event payloads, the command bus shared by every
//! surface, and the settings that name the tables and columns.

pub mod commands;
pub mod events;
pub mod graph;
pub mod settings;
pub mod surface;
pub mod visual;

// Re-export commonly used types
pub use commands::{
    AttributeValue, Command, CommandBus, CommandHandler, GroupCommand, NoParamCommand,
    SetVisualAttribute, SubscriptionId, VisualAttribute,
};
pub use events::EventBus;
pub use graph::{
    AttributesEditedInGraph, CollapsedGroupId, CollapsedGroupVertex, EditedEdgeAttributes,
    EditedVertexAttributes, GraphEvent, GroupsCollapsedOrExpanded, LayoutCompleted, RowId,
    VertexLocation, VerticesMoved,
};
pub use settings::{SettingsError, SyncSettings, TableLocation};
pub use surface::VisualizationSurface;
pub use visual::{
    Color, EdgeStyle, EdgeVisibility, GraphRect, LabelPosition, PointF, VertexShape,
    VertexVisibility,
};
