use ng_core::Color;
use serde::{Deserialize, Serialize};

/// Two-color gradient used when mapping numbers to colors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorGradient {
    pub from: Color,
    pub to: Color,
}

impl ColorGradient {
    pub fn new(from: Color, to: Color) -> Self {
        Self { from, to }
    }

    /// Color at a 0..=1 position along the gradient
    pub fn color_at(&self, fraction: f64) -> Color {
        self.from.lerp(self.to, fraction)
    }
}

impl Default for ColorGradient {
    fn default() -> Self {
        Self::new(Color::rgb(255, 0, 0), Color::rgb(0, 0, 255))
    }
}

const CATEGORY_PALETTE: &[Color] = &[
    Color::rgb(0, 0, 255),
    Color::rgb(0, 128, 0),
    Color::rgb(255, 0, 0),
    Color::rgb(128, 0, 128),
    Color::rgb(255, 165, 0),
    Color::rgb(0, 128, 128),
    Color::rgb(165, 42, 42),
    Color::rgb(255, 0, 255),
    Color::rgb(128, 128, 0),
    Color::rgb(0, 0, 128),
    Color::rgb(128, 128, 128),
    Color::rgb(255, 192, 203),
];

/// A distinct color for the Nth category.
///
/// The first categories get hand-picked colors; after that hues are spread
/// with the golden angle so neighbours stay distinguishable.
pub fn category_color(index: usize) -> Color {
    if let Some(color) = CATEGORY_PALETTE.get(index) {
        return *color;
    }
    let step = (index - CATEGORY_PALETTE.len()) as f64;
    let band = (step as usize / 12) % 3;
    Color::from_hsv(step * 137.508, 0.85 - 0.2 * band as f64, 0.9)
}
