use super::{AttributeConverter, ConvertError};
use crate::store::CellValue;

/// Flags such as "Locked?" are stored as Yes/No
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl AttributeConverter for BooleanConverter {
    type Value = bool;

    fn to_store(&self, value: &bool) -> CellValue {
        CellValue::Text(if *value { "Yes" } else { "No" }.to_string())
    }

    fn from_store(&self, cell: &CellValue) -> Result<bool, ConvertError> {
        match cell {
            CellValue::Empty => Err(ConvertError::Empty),
            CellValue::Bool(b) => Ok(*b),
            CellValue::Number(n) if *n == 1.0 => Ok(true),
            CellValue::Number(n) if *n == 0.0 => Ok(false),
            _ => {
                let text = cell.to_text();
                match text.to_ascii_lowercase().as_str() {
                    "" => Err(ConvertError::Empty),
                    "yes" | "true" | "1" => Ok(true),
                    "no" | "false" | "0" => Ok(false),
                    _ => Err(ConvertError::Unrecognized {
                        kind: "Yes/No value",
                        text,
                    }),
                }
            }
        }
    }
}
