//! Drawing collaborators
//!
//! The scene never draws anything itself. Nodes compose their transform and
//! opacity into a [`DrawContext`] and hand it to their [`Renderer`]; the debug
//! pass additionally receives the [`Viewport`] being drawn and a
//! [`DrawPrimitives`] library.

mod context;

pub use context::MatrixContext;

use crate::core::DebugFlags;
use crate::math::Affine;

/// A 2D drawing surface with a running transform and opacity.
///
/// Follows canvas semantics: `transform` multiplies into the current matrix,
/// `set_transform` replaces it, and `save`/`restore` push and pop both the
/// matrix and the opacity.
pub trait DrawContext {
    /// Multiply `m` into the current transform (`current = current * m`).
    fn transform(&mut self, m: &Affine);

    /// Replace the current transform.
    fn set_transform(&mut self, m: &Affine);

    /// Accumulated opacity.
    fn global_alpha(&self) -> f64;

    /// Replace the accumulated opacity.
    fn set_global_alpha(&mut self, alpha: f64);

    /// Push the current state.
    fn save(&mut self);

    /// Pop the last pushed state.
    fn restore(&mut self);
}

/// Draws a node using the context state the node already composed.
pub trait Renderer {
    /// Draw call.
    fn render(&mut self, context: &mut dyn DrawContext);

    /// Debug visualisation, drawn in viewport space.
    fn debug_draw(
        &mut self,
        _context: &mut dyn DrawContext,
        _viewport: &dyn Viewport,
        _draw: &mut dyn DrawPrimitives,
        _flags: &DebugFlags,
    ) {
    }
}

/// A view onto the scene.
pub trait Viewport {
    /// Apply this viewport's transform to a context whose transform was reset.
    fn transform_context(&self, context: &mut dyn DrawContext);
}

/// Shape helpers used by debug drawing.
pub trait DrawPrimitives {
    /// Stroke a line segment.
    fn line(
        &mut self,
        context: &mut dyn DrawContext,
        from: glam::DVec2,
        to: glam::DVec2,
        width: f64,
        color: &str,
    );

    /// Fill and/or stroke a circle.
    fn circle(
        &mut self,
        context: &mut dyn DrawContext,
        center: glam::DVec2,
        radius: f64,
        fill: Option<&str>,
        stroke: Option<&str>,
        width: f64,
    );

    /// Fill and/or stroke a rectangle.
    fn rectangle(
        &mut self,
        context: &mut dyn DrawContext,
        origin: glam::DVec2,
        size: glam::DVec2,
        fill: Option<&str>,
        stroke: Option<&str>,
        width: f64,
    );
}
