//! Behavior units
//!
//! A [`Component`] is the pooled shell around a [`Behavior`]: it tracks which
//! node owns it, where it is in its lifecycle and who listens to its events.
//!
//! ```text
//! Idle --on_added--> Attached --start--> Active
//!   ^                    |                  |
//!   +----on_removed------+------------------+
//!   |
//!   +--destroy--> Destroyed --pool reset--> Idle
//! ```

use std::any::Any;
use std::fmt;

use crate::core::{DebugFlags, Delegate, PoolIndex, Poolable};
use crate::render::{DrawContext, DrawPrimitives, Viewport};

use super::{Behavior, Configure, HookContext, NodeId};

/// Handle to a pooled behavior unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub(crate) PoolIndex);

/// Events a behavior unit emits. Listeners receive the unit's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitEvent {
    /// Attached to a node
    Added,
    /// Detached from its node
    Removed,
    /// Permanently retired
    Recycled,
}

impl UnitEvent {
    /// Event name, as used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Recycled => "recycle",
        }
    }
}

/// Lifecycle state of a behavior unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    /// No owner
    Idle,
    /// Owned, not started yet
    Attached,
    /// Owned and started
    Active,
    /// Retired until the pool hands it out again
    Destroyed,
}

/// A pooled behavior unit.
pub struct Component {
    owner: Option<NodeId>,
    state: UnitState,
    skip_debug: bool,
    args: Option<Box<dyn Any>>,
    events: Delegate<UnitEvent, ComponentId>,
    behavior: Box<dyn Behavior>,
}

impl Component {
    pub(crate) fn new(behavior: Box<dyn Behavior>) -> Self {
        Self {
            owner: None,
            state: UnitState::Idle,
            skip_debug: false,
            args: None,
            events: Delegate::new(),
            behavior,
        }
    }

    /// Node this unit is attached to.
    #[must_use]
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    #[must_use]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Whether the debug pass skips this unit.
    #[must_use]
    pub fn skip_debug(&self) -> bool {
        self.skip_debug
    }

    pub fn set_skip_debug(&mut self, skip: bool) {
        self.skip_debug = skip;
    }

    #[must_use]
    pub fn events(&self) -> &Delegate<UnitEvent, ComponentId> {
        &self.events
    }

    /// Event channel, to register or remove listeners.
    pub fn events_mut(&mut self) -> &mut Delegate<UnitEvent, ComponentId> {
        &mut self.events
    }

    /// Check the concrete behavior type.
    #[must_use]
    pub fn is<B: Behavior>(&self) -> bool {
        self.behavior::<B>().is_some()
    }

    /// The concrete behavior, if it is a `B`.
    #[must_use]
    pub fn behavior<B: Behavior>(&self) -> Option<&B> {
        // Upcast through the trait object, not the Box
        let behavior: &dyn Behavior = self.behavior.as_ref();
        behavior.as_any().downcast_ref::<B>()
    }

    /// The concrete behavior, mutably, if it is a `B`.
    pub fn behavior_mut<B: Behavior>(&mut self) -> Option<&mut B> {
        let behavior: &mut dyn Behavior = self.behavior.as_mut();
        behavior.as_any_mut().downcast_mut::<B>()
    }

    /// Apply typed configuration and keep it for [`Self::args`].
    ///
    /// Returns `false`, changing nothing, when the behavior is not a `B`.
    pub fn configure<B: Behavior + Configure>(&mut self, args: B::Args) -> bool {
        let Some(behavior) = self.behavior_mut::<B>() else {
            return false;
        };

        behavior.configure(&args);
        self.args = Some(Box::new(args));
        true
    }

    /// Last configuration applied through [`Self::configure`].
    #[must_use]
    pub fn args<B: Configure>(&self) -> Option<&B::Args> {
        self.args.as_deref()?.downcast_ref::<B::Args>()
    }

    // ------------------------------------------------------------------------
    // Lifecycle (driven by the scene)
    // ------------------------------------------------------------------------

    pub(crate) fn on_added(&mut self, id: ComponentId, owner: NodeId) {
        self.owner = Some(owner);
        self.state = UnitState::Attached;

        self.events.execute(UnitEvent::Added, &id);
        self.behavior.added(owner);
    }

    /// Returns `false` when the unit had no owner.
    pub(crate) fn on_removed(&mut self, id: ComponentId) -> bool {
        let Some(owner) = self.owner.take() else {
            return false;
        };
        self.state = UnitState::Idle;

        self.behavior.removed(owner);
        self.events.execute(UnitEvent::Removed, &id);
        true
    }

    pub(crate) fn start(&mut self, ctx: &mut HookContext<'_>) {
        if self.state == UnitState::Attached {
            self.state = UnitState::Active;
        }

        self.behavior.start(ctx);
    }

    pub(crate) fn update(&mut self, ctx: &mut HookContext<'_>, delta: f64) {
        self.behavior.update(ctx, delta);
    }

    pub(crate) fn debug_draw(
        &mut self,
        context: &mut dyn DrawContext,
        viewport: &dyn Viewport,
        draw: &mut dyn DrawPrimitives,
        flags: &DebugFlags,
    ) {
        if !self.skip_debug {
            self.behavior.debug_draw(context, viewport, draw, flags);
        }
    }

    /// Returns `false` when the unit was already destroyed.
    pub(crate) fn destroy(&mut self, id: ComponentId) -> bool {
        if self.state == UnitState::Destroyed {
            return false;
        }
        self.owner = None;
        self.state = UnitState::Destroyed;

        self.events.execute(UnitEvent::Recycled, &id);
        self.behavior.destroy();
        true
    }
}

impl Poolable for Component {
    fn reset(&mut self) {
        self.owner = None;
        self.state = UnitState::Idle;
        self.skip_debug = false;
        self.args = None;
        self.events.clear();
        self.behavior.reset();
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("owner", &self.owner)
            .field("state", &self.state)
            .field("skip_debug", &self.skip_debug)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
