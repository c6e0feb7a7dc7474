//! A 2D scene graph core
//!
//! This crate provides:
//! - Affine 2D transforms with compose and decompose
//! - Pooled scene nodes with a parent hierarchy and world transforms
//! - Pooled behavior units with an attach/start/update/detach lifecycle
//! - Drawing through caller-supplied context and renderer traits

pub mod core;
pub mod math;
pub mod render;
pub mod scene;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{ClearPolicy, DebugFlags, Delegate, SceneConfig};
    pub use crate::math::{Affine, Decomposed};
    pub use crate::render::{DrawContext, DrawPrimitives, MatrixContext, Renderer, Viewport};
    pub use crate::scene::{
        Basic, Behavior, ComponentId, Configure, HookContext, LocalTransform, NodeArgs,
        NodeBehavior, NodeEvent, NodeId, Scene, SceneError, TransformArgs, UnitEvent,
    };
    pub use glam::DVec2;
}
