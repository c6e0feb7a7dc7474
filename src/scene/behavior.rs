//! Extension points for nodes and behavior units
//!
//! Concrete node kinds implement [`NodeBehavior`], concrete units implement
//! [`Behavior`]. Every hook has a no-op default, so a kind only overrides what
//! it needs. Typed configuration goes through [`Configure`].

use std::any::Any;

use smallvec::SmallVec;

use crate::core::DebugFlags;
use crate::render::{DrawContext, DrawPrimitives, Viewport};

use super::{ComponentId, LocalTransform, NodeId};

// ============================================================================
// Downcasting
// ============================================================================

/// Access to the concrete type behind a behavior trait object.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed configuration of a concrete node kind or unit.
///
/// The scene keeps the last applied `Args` so it can be inspected later.
///
/// # Example
///
/// ```ignore
/// struct Spinner { speed: f64 }
///
/// impl Configure for Spinner {
///     type Args = f64;
///     fn configure(&mut self, speed: &f64) { self.speed = *speed; }
/// }
/// ```
pub trait Configure {
    type Args: 'static;

    /// Overwrite fields from `args`.
    fn configure(&mut self, args: &Self::Args);
}

// ============================================================================
// Hook Context
// ============================================================================

/// Detach requests collected while a hook runs.
pub(crate) type Removals = SmallVec<[ComponentId; 2]>;

/// What a hook may touch while it runs: the placement of the node it belongs
/// to, and detach requests for that node's units.
///
/// Detach requests are applied as soon as the hook returns, before the next
/// unit is visited.
pub struct HookContext<'a> {
    node: NodeId,
    unit: Option<ComponentId>,
    transform: &'a mut LocalTransform,
    alpha: &'a mut f64,
    removals: &'a mut Removals,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        node: NodeId,
        unit: Option<ComponentId>,
        transform: &'a mut LocalTransform,
        alpha: &'a mut f64,
        removals: &'a mut Removals,
    ) -> Self {
        Self {
            node,
            unit,
            transform,
            alpha,
            removals,
        }
    }

    /// The node being updated, or owning the unit being updated.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The unit whose hook is running, `None` inside node hooks.
    #[must_use]
    pub fn unit(&self) -> Option<ComponentId> {
        self.unit
    }

    /// The node's local transform.
    #[must_use]
    pub fn transform(&self) -> &LocalTransform {
        &*self.transform
    }

    /// The node's local transform, mutably.
    pub fn transform_mut(&mut self) -> &mut LocalTransform {
        &mut *self.transform
    }

    /// The node's own opacity.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        *self.alpha
    }

    /// Set the node's own opacity.
    pub fn set_alpha(&mut self, alpha: f64) {
        *self.alpha = alpha;
    }

    /// Ask for `unit` to be removed from this node once the hook returns.
    pub fn remove(&mut self, unit: ComponentId) {
        if !self.removals.contains(&unit) {
            self.removals.push(unit);
        }
    }

    /// Ask for the unit whose hook is running to be removed.
    pub fn detach_self(&mut self) {
        if let Some(unit) = self.unit {
            self.remove(unit);
        }
    }
}

// ============================================================================
// Behavior Units
// ============================================================================

/// Logic attached to a node.
///
/// The lifecycle bookkeeping (owner, events, state) is done by the scene
/// before these hooks run; implementations only add behavior.
pub trait Behavior: AsAny {
    /// Attached to `owner`.
    fn added(&mut self, _owner: NodeId) {}

    /// Detached from `owner`.
    fn removed(&mut self, _owner: NodeId) {}

    /// The owner was started.
    fn start(&mut self, _ctx: &mut HookContext<'_>) {}

    /// Per-frame logic, after the owner's own update. `delta` is the time
    /// elapsed since the previous frame.
    fn update(&mut self, _ctx: &mut HookContext<'_>, _delta: f64) {}

    /// Debug visualisation, only called while debug drawing is enabled.
    fn debug_draw(
        &mut self,
        _context: &mut dyn DrawContext,
        _viewport: &dyn Viewport,
        _draw: &mut dyn DrawPrimitives,
        _flags: &DebugFlags,
    ) {
    }

    /// Permanently retired.
    fn destroy(&mut self) {}

    /// Handed out again by the pool.
    fn reset(&mut self) {}
}

// ============================================================================
// Node Kinds
// ============================================================================

/// Kind-specific logic of a node.
pub trait NodeBehavior: AsAny {
    /// Started, after the node's units were started.
    fn start(&mut self, _ctx: &mut HookContext<'_>) {}

    /// Per-frame logic, before the node's units update.
    fn update(&mut self, _ctx: &mut HookContext<'_>, _delta: f64) {}

    /// Debug visualisation, drawn after the renderer and units.
    fn debug_draw(
        &mut self,
        _context: &mut dyn DrawContext,
        _viewport: &dyn Viewport,
        _draw: &mut dyn DrawPrimitives,
        _flags: &DebugFlags,
    ) {
    }

    /// The node is being cleared.
    fn destroy(&mut self) {}

    /// Handed out again by the pool.
    fn reset(&mut self) {}
}

/// A node kind with no logic of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Basic;

impl NodeBehavior for Basic {}
