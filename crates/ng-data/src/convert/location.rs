use ng_core::{GraphRect, PointF};

/// Maps vertex locations between the graph rectangle and the store's
/// coordinate square.
///
/// The store's origin is bottom-left while the graph's is top-left, so the
/// Y axis is inverted. Store values outside the square are clamped to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexLocationConverter {
    rect: GraphRect,
    store_min: f32,
    store_max: f32,
}

impl VertexLocationConverter {
    pub fn new(rect: GraphRect, store_min: f32, store_max: f32) -> Self {
        Self {
            rect,
            store_min,
            store_max,
        }
    }

    fn span(&self) -> f32 {
        self.store_max - self.store_min
    }

    /// Store coordinates of a point in the graph
    pub fn graph_to_store(&self, point: PointF) -> (f32, f32) {
        let fraction = |offset: f32, extent: f32| {
            if extent > 0.0 {
                (offset / extent).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        let fx = fraction(point.x - self.rect.left(), self.rect.width);
        let fy = fraction(point.y - self.rect.top(), self.rect.height);

        (
            self.store_min + fx * self.span(),
            self.store_max - fy * self.span(),
        )
    }

    /// Graph point for store coordinates
    pub fn store_to_graph(&self, x: f32, y: f32) -> PointF {
        let fraction = |value: f32| {
            if self.span() > 0.0 {
                ((value.clamp(self.store_min, self.store_max) - self.store_min) / self.span())
                    .clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        PointF::new(
            self.rect.left() + fraction(x) * self.rect.width,
            self.rect.top() + (1.0 - fraction(y)) * self.rect.height,
        )
    }
}
