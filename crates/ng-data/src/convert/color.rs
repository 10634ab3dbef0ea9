use ng_core::Color;

use super::{AttributeConverter, ConvertError};
use crate::store::CellValue;

const NAMED_COLORS: &[(&str, Color)] = &[
    ("Black", Color::rgb(0, 0, 0)),
    ("White", Color::rgb(255, 255, 255)),
    ("Red", Color::rgb(255, 0, 0)),
    ("Lime", Color::rgb(0, 255, 0)),
    ("Blue", Color::rgb(0, 0, 255)),
    ("Yellow", Color::rgb(255, 255, 0)),
    ("Cyan", Color::rgb(0, 255, 255)),
    ("Magenta", Color::rgb(255, 0, 255)),
    ("Green", Color::rgb(0, 128, 0)),
    ("Navy", Color::rgb(0, 0, 128)),
    ("Maroon", Color::rgb(128, 0, 0)),
    ("Olive", Color::rgb(128, 128, 0)),
    ("Purple", Color::rgb(128, 0, 128)),
    ("Teal", Color::rgb(0, 128, 128)),
    ("Gray", Color::rgb(128, 128, 128)),
    ("Silver", Color::rgb(192, 192, 192)),
    ("Orange", Color::rgb(255, 165, 0)),
    ("Brown", Color::rgb(165, 42, 42)),
    ("Pink", Color::rgb(255, 192, 203)),
];

/// Colors are stored as a name when one exists, otherwise as "R, G, B".
///
/// Reading also accepts "#RRGGBB", "Grey", and names in any case.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConverter;

impl ColorConverter {
    fn parse(text: &str) -> Option<Color> {
        let text = text.trim();

        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            let value = u32::from_str_radix(hex, 16).ok()?;
            return Some(Color::rgb(
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            ));
        }

        if text.contains(',') {
            let parts: Vec<u8> = text
                .split(',')
                .map(|part| part.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .ok()?;
            return match parts.as_slice() {
                [r, g, b] => Some(Color::rgb(*r, *g, *b)),
                _ => None,
            };
        }

        let name = if text.eq_ignore_ascii_case("grey") {
            "Gray"
        } else {
            text
        };
        NAMED_COLORS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, color)| *color)
    }
}

impl AttributeConverter for ColorConverter {
    type Value = Color;

    fn to_store(&self, value: &Color) -> CellValue {
        match NAMED_COLORS.iter().find(|(_, color)| color == value) {
            Some((name, _)) => CellValue::Text(name.to_string()),
            None => CellValue::Text(format!("{}, {}, {}", value.r, value.g, value.b)),
        }
    }

    fn from_store(&self, cell: &CellValue) -> Result<Color, ConvertError> {
        if cell.is_empty() {
            return Err(ConvertError::Empty);
        }
        let text = cell.to_text();
        Self::parse(&text).ok_or(ConvertError::Unrecognized { kind: "color", text })
    }
}
