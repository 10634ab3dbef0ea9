use ng_core::{EdgeStyle, EdgeVisibility, LabelPosition, VertexShape, VertexVisibility};

use super::{AttributeConverter, ConvertError};
use crate::store::CellValue;

/// Defines a converter for an enum stored as text.
///
/// The first spelling is what gets written; the rest are accepted when
/// reading, case-insensitively. A whole number N also reads as the Nth
/// variant, counting from 1.
macro_rules! enum_converter {
    (
        $(#[$meta:meta])*
        $name:ident, $value:ty, $kind:literal,
        [$($variant:expr => $text:literal $(| $alias:literal)*),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $name {
            const TABLE: &'static [($value, &'static str, &'static [&'static str])] =
                &[$(($variant, $text, &[$($alias),*])),+];
        }

        impl AttributeConverter for $name {
            type Value = $value;

            fn to_store(&self, value: &$value) -> CellValue {
                Self::TABLE
                    .iter()
                    .find(|(variant, _, _)| variant == value)
                    .map(|(_, text, _)| CellValue::Text(text.to_string()))
                    .unwrap_or_default()
            }

            fn from_store(&self, cell: &CellValue) -> Result<$value, ConvertError> {
                if cell.is_empty() {
                    return Err(ConvertError::Empty);
                }
                let text = cell.to_text();

                let by_name = Self::TABLE.iter().find(|(_, name, aliases)| {
                    name.eq_ignore_ascii_case(&text)
                        || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(&text))
                });
                if let Some((variant, _, _)) = by_name {
                    return Ok(*variant);
                }

                text.parse::<usize>()
                    .ok()
                    .and_then(|ordinal| ordinal.checked_sub(1))
                    .and_then(|index| Self::TABLE.get(index))
                    .map(|(variant, _, _)| *variant)
                    .ok_or(ConvertError::Unrecognized { kind: $kind, text })
            }
        }
    };
}

enum_converter!(
    /// Vertex shape names
    VertexShapeConverter, VertexShape, "vertex shape",
    [
        VertexShape::Circle => "Circle",
        VertexShape::Disk => "Disk",
        VertexShape::Sphere => "Sphere",
        VertexShape::Square => "Square",
        VertexShape::SolidSquare => "Solid Square" | "SolidSquare",
        VertexShape::Diamond => "Diamond",
        VertexShape::SolidDiamond => "Solid Diamond" | "SolidDiamond",
        VertexShape::Triangle => "Triangle",
        VertexShape::SolidTriangle => "Solid Triangle" | "SolidTriangle",
        VertexShape::Label => "Label",
        VertexShape::Image => "Image",
    ]
);

enum_converter!(
    /// Edge dash styles
    EdgeStyleConverter, EdgeStyle, "edge style",
    [
        EdgeStyle::Solid => "Solid",
        EdgeStyle::Dash => "Dash",
        EdgeStyle::Dot => "Dot",
        EdgeStyle::DashDot => "Dash Dot" | "DashDot",
        EdgeStyle::DashDotDot => "Dash Dot Dot" | "DashDotDot",
    ]
);

enum_converter!(
    /// Vertex visibility values
    VertexVisibilityConverter, VertexVisibility, "vertex visibility",
    [
        VertexVisibility::ShowIfInAnEdge => "Show if in an Edge" | "ShowIfInAnEdge",
        VertexVisibility::Skip => "Skip",
        VertexVisibility::Hide => "Hide",
        VertexVisibility::Show => "Show",
    ]
);

enum_converter!(
    /// Edge visibility values
    EdgeVisibilityConverter, EdgeVisibility, "edge visibility",
    [
        EdgeVisibility::Show => "Show",
        EdgeVisibility::Skip => "Skip",
        EdgeVisibility::Hide => "Hide",
    ]
);

enum_converter!(
    /// Vertex label positions
    LabelPositionConverter, LabelPosition, "label position",
    [
        LabelPosition::TopLeft => "Top Left" | "TopLeft",
        LabelPosition::TopCenter => "Top Center" | "TopCenter",
        LabelPosition::TopRight => "Top Right" | "TopRight",
        LabelPosition::MiddleLeft => "Middle Left" | "MiddleLeft",
        LabelPosition::MiddleCenter => "Middle Center" | "MiddleCenter",
        LabelPosition::MiddleRight => "Middle Right" | "MiddleRight",
        LabelPosition::BottomLeft => "Bottom Left" | "BottomLeft",
        LabelPosition::BottomCenter => "Bottom Center" | "BottomCenter",
        LabelPosition::BottomRight => "Bottom Right" | "BottomRight",
        LabelPosition::Nowhere => "Nowhere",
    ]
);
