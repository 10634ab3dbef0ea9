//! Tabular store access for the synchronization engine

pub mod columns;
pub mod convert;
pub mod index;
pub mod mapping;
pub mod store;

use thiserror::Error;

// Re-exports
pub use columns::{BatchedColumns, ColumnBatch};
pub use convert::{AttributeConverter, ConvertError};
pub use index::RowIdIndex;
pub use mapping::{MappingError, MappingMode, NumericMapping, PreparedMapping};
pub use store::{
    CellValue, ColumnHandle, MemoryStore, RowSpan, SelectedRows, TableHandle, TabularStore,
    WorkbookSnapshot,
};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Table not found: {sheet}/{table}")]
    TableNotFound { sheet: String, table: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Row {row} out of range (table has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Column '{column}' expects {expected} values, got {actual}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConvertError),

    #[error("Invalid mapping: {0}")]
    InvalidMapping(#[from] MappingError),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => {
                DataError::Io(std::io::Error::new(io_err.kind(), error.to_string()))
            }
            _ => DataError::Csv(error.to_string()),
        }
    }
}
