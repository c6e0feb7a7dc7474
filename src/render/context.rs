//! Headless draw context
//!
//! Tracks transform and opacity exactly like a canvas would, without drawing.
//! Useful for hit testing, layout queries and tests of the draw traversal.

use glam::DVec2;

use crate::math::Affine;

use super::{DrawContext, Viewport};

/// A [`DrawContext`] that only keeps the running matrix and opacity.
#[derive(Debug, Clone)]
pub struct MatrixContext {
    matrix: Affine,
    alpha: f64,
    stack: Vec<(Affine, f64)>,
}

impl MatrixContext {
    /// Create a context at identity with full opacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matrix: Affine::IDENTITY,
            alpha: 1.0,
            stack: Vec::new(),
        }
    }

    /// Current transform.
    #[must_use]
    pub fn matrix(&self) -> &Affine {
        &self.matrix
    }

    /// Number of saved states not yet restored.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Map a point from the current local space to the surface.
    #[must_use]
    pub fn to_surface(&self, point: DVec2) -> DVec2 {
        self.matrix.transform_point(point)
    }
}

impl Default for MatrixContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawContext for MatrixContext {
    fn transform(&mut self, m: &Affine) {
        self.matrix.append_matrix(m);
    }

    fn set_transform(&mut self, m: &Affine) {
        self.matrix = *m;
    }

    fn global_alpha(&self) -> f64 {
        self.alpha
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    fn save(&mut self) {
        self.stack.push((self.matrix, self.alpha));
    }

    fn restore(&mut self) {
        // Unbalanced restore is ignored, as on a canvas
        if let Some((matrix, alpha)) = self.stack.pop() {
            self.matrix = matrix;
            self.alpha = alpha;
        }
    }
}

/// A viewport that is a plain affine transform (camera offset, zoom).
impl Viewport for Affine {
    fn transform_context(&self, context: &mut dyn DrawContext) {
        context.transform(self);
    }
}
