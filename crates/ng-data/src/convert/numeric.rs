use super::{read_number, AttributeConverter, ConvertError};
use crate::store::CellValue;

/// Linear mapping between a store range and a graph range.
///
/// Values outside either range are clamped to it before mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRangeConverter {
    pub store_min: f32,
    pub store_max: f32,
    pub graph_min: f32,
    pub graph_max: f32,
}

impl NumericRangeConverter {
    pub const fn new(store_min: f32, store_max: f32, graph_min: f32, graph_max: f32) -> Self {
        Self {
            store_min,
            store_max,
            graph_min,
            graph_max,
        }
    }

    /// Opacity percentage in the store, 0..=255 alpha in the graph
    pub const fn alpha() -> Self {
        Self::new(0.0, 100.0, 0.0, 255.0)
    }

    /// Edge width, same scale on both sides
    pub const fn edge_width() -> Self {
        Self::new(1.0, 10.0, 1.0, 10.0)
    }

    pub fn store_to_graph(&self, value: f32) -> f32 {
        transform(
            value,
            self.store_min,
            self.store_max,
            self.graph_min,
            self.graph_max,
        )
    }

    pub fn graph_to_store(&self, value: f32) -> f32 {
        transform(
            value,
            self.graph_min,
            self.graph_max,
            self.store_min,
            self.store_max,
        )
    }
}

fn transform(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let value = value.clamp(from_min, from_max);
    if from_max == from_min {
        return to_min;
    }
    to_min + (value - from_min) * (to_max - to_min) / (from_max - from_min)
}

/// Cells hold the store value; the converter's values are graph values
impl AttributeConverter for NumericRangeConverter {
    type Value = f32;

    fn to_store(&self, value: &f32) -> CellValue {
        CellValue::from(self.graph_to_store(*value))
    }

    fn from_store(&self, cell: &CellValue) -> Result<f32, ConvertError> {
        Ok(self.store_to_graph(read_number(cell)? as f32))
    }
}

const MINIMUM_RADIUS_GRAPH: f32 = 2.5;

/// Vertex size in the store scales the vertex area, not its radius.
///
/// A store value of 1 gives the minimum graph radius, and a store value of
/// N gives N times that area.
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexRadiusConverter;

impl VertexRadiusConverter {
    pub const MINIMUM_STORE: f32 = 1.0;
    pub const MAXIMUM_STORE: f32 = 1000.0;

    pub fn store_to_graph(&self, value: f32) -> f32 {
        let value = value.clamp(Self::MINIMUM_STORE, Self::MAXIMUM_STORE);
        MINIMUM_RADIUS_GRAPH * value.sqrt()
    }

    pub fn graph_to_store(&self, radius: f32) -> f32 {
        let value = (radius / MINIMUM_RADIUS_GRAPH).powi(2);
        value.clamp(Self::MINIMUM_STORE, Self::MAXIMUM_STORE)
    }
}

impl AttributeConverter for VertexRadiusConverter {
    type Value = f32;

    fn to_store(&self, value: &f32) -> CellValue {
        CellValue::from(self.graph_to_store(*value))
    }

    fn from_store(&self, cell: &CellValue) -> Result<f32, ConvertError> {
        Ok(self.store_to_graph(read_number(cell)? as f32))
    }
}

/// Label font size: points in the store, device-independent pixels in the graph
#[derive(Debug, Clone, Copy, Default)]
pub struct FontSizeConverter;

impl FontSizeConverter {
    pub const MINIMUM_STORE: f32 = 8.0;
    pub const MAXIMUM_STORE: f32 = 72.0;
    const PIXELS_PER_POINT: f32 = 96.0 / 72.0;

    pub fn store_to_graph(&self, points: f32) -> f32 {
        points.clamp(Self::MINIMUM_STORE, Self::MAXIMUM_STORE) * Self::PIXELS_PER_POINT
    }

    pub fn graph_to_store(&self, pixels: f32) -> f32 {
        pixels / Self::PIXELS_PER_POINT
    }
}

impl AttributeConverter for FontSizeConverter {
    type Value = f32;

    fn to_store(&self, value: &f32) -> CellValue {
        CellValue::from(self.graph_to_store(*value))
    }

    fn from_store(&self, cell: &CellValue) -> Result<f32, ConvertError> {
        Ok(self.store_to_graph(read_number(cell)? as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_alpha_range() {
        let alpha = NumericRangeConverter::alpha();
        assert_eq!(alpha.store_to_graph(0.0), 0.0);
        assert_eq!(alpha.store_to_graph(100.0), 255.0);
        assert_eq!(alpha.store_to_graph(50.0), 127.5);
        assert_eq!(alpha.store_to_graph(-1.0), 0.0);
        assert_eq!(alpha.store_to_graph(101.0), 255.0);
        assert_eq!(alpha.to_store(&255.0), CellValue::Number(100.0));
    }

    #[test]
    fn test_numeric_round_trips() {
        let alpha = NumericRangeConverter::alpha();
        for graph in [0.0_f32, 51.0, 127.5, 255.0] {
            let back = alpha.from_store(&alpha.to_store(&graph)).unwrap();
            assert!(approx_eq(back, graph), "{} != {}", back, graph);
        }

        let width = NumericRangeConverter::edge_width();
        assert_eq!(width.from_store(&width.to_store(&4.0)), Ok(4.0));

        let radius = VertexRadiusConverter;
        for graph in [2.5_f32, 5.0, 10.0, 25.0] {
            let back = radius.from_store(&radius.to_store(&graph)).unwrap();
            assert!(approx_eq(back, graph), "{} != {}", back, graph);
        }

        let font = FontSizeConverter;
        for graph in [12.0_f32, 16.0, 48.0] {
            let back = font.from_store(&font.to_store(&graph)).unwrap();
            assert!(approx_eq(back, graph), "{} != {}", back, graph);
        }
    }

    #[test]
    fn test_radius_scales_area() {
        let radius = VertexRadiusConverter;
        assert_eq!(radius.store_to_graph(1.0), 2.5);
        assert_eq!(radius.store_to_graph(4.0), 5.0);
        assert_eq!(radius.store_to_graph(0.0), 2.5);
        assert_eq!(radius.graph_to_store(1000.0), 1000.0);
    }

    #[test]
    fn test_non_numeric_cell() {
        let width = NumericRangeConverter::edge_width();
        assert_eq!(
            width.from_store(&"wide".into()),
            Err(ConvertError::NotANumber("wide".into()))
        );
        assert_eq!(width.from_store(&CellValue::Empty), Err(ConvertError::Empty));
    }
}
