//! Bidirectional synchronization between the workbook tables and the graph
//!
//! The [`SyncOrchestrator`] receives graph events, resolves the affected rows
//! through a per-batch Row ID index, and writes each touched column back to
//! the store once. Table-side commands travel over the shared command bus to
//! the per-table controllers.

pub mod controller;
pub mod guard;
pub mod orchestrator;
pub mod selection;

use ng_data::{DataError, MappingError};
use thiserror::Error;

// Re-exports
pub use controller::{
    BatchOutcome, EdgeController, GroupController, TableController, TableKind, VertexController,
};
pub use guard::ActiveSheetGuard;
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use selection::{SelectionCoordinator, SelectionSuppression};

/// Errors that abort a synchronization attempt
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("The workbook is busy; try again once editing has finished")]
    HostNotReady,

    #[error("Invalid mapping: {0}")]
    InvalidMapping(MappingError),

    #[error(transparent)]
    Data(DataError),

    #[error("Visualization error: {0}")]
    Surface(String),
}

impl From<DataError> for SyncError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::InvalidMapping(mapping) => SyncError::InvalidMapping(mapping),
            other => SyncError::Data(other),
        }
    }
}

impl From<MappingError> for SyncError {
    fn from(error: MappingError) -> Self {
        SyncError::InvalidMapping(error)
    }
}
