//! Converters between visualization attribute values and store cells
//!
//! Every converter is stateless apart from its fixed range constants, and
//! `from_store(&to_store(v))` gives back `v` for every valid `v`.

mod boolean;
mod color;
mod enums;
mod location;
mod numeric;

use thiserror::Error;

use crate::store::CellValue;

pub use boolean::BooleanConverter;
pub use color::ColorConverter;
pub use enums::{
    EdgeStyleConverter, EdgeVisibilityConverter, LabelPositionConverter, VertexShapeConverter,
    VertexVisibilityConverter,
};
pub use location::VertexLocationConverter;
pub use numeric::{FontSizeConverter, NumericRangeConverter, VertexRadiusConverter};

/// A cell that could not be read as the expected attribute
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("cell is empty")]
    Empty,

    #[error("'{text}' is not a valid {kind}")]
    Unrecognized { kind: &'static str, text: String },

    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// Bidirectional mapping between a typed attribute and a store cell
pub trait AttributeConverter {
    type Value;

    /// Cell representation of a value
    fn to_store(&self, value: &Self::Value) -> CellValue;

    /// Parse a cell
    fn from_store(&self, cell: &CellValue) -> Result<Self::Value, ConvertError>;

    /// Parse a cell, treating empty cells as "no value"
    fn try_from_store(&self, cell: &CellValue) -> Result<Option<Self::Value>, ConvertError> {
        if cell.is_empty() {
            return Ok(None);
        }
        self.from_store(cell).map(Some)
    }
}

fn read_number(cell: &CellValue) -> Result<f64, ConvertError> {
    if cell.is_empty() {
        return Err(ConvertError::Empty);
    }
    cell.as_f64()
        .ok_or_else(|| ConvertError::NotANumber(cell.to_text()))
}
