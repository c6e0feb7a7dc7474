//! The scene arena
//!
//! [`Scene`] owns the node and unit pools and runs every operation that
//! touches both: attaching and detaching units, the start/update/draw
//! lifecycle, and clearing and recycling nodes.
//!
//! # Iteration
//!
//! `start` and `update` visit a snapshot of a node's unit list. A unit
//! detached before its turn is skipped, a unit attached during the pass waits
//! for the next one. Detach requests made by a hook through
//! [`HookContext::remove`] are applied as soon as that hook returns.

use smallvec::SmallVec;

use crate::core::{ClearPolicy, DebugFlags, KindId, Pool, SceneConfig};
use crate::math::Affine;
use crate::render::{DrawContext, DrawPrimitives, Viewport};

use super::{
    Behavior, Component, ComponentId, GameObject, HookContext, NodeBehavior, NodeEvent, NodeId,
    Removals, SceneError, UnitState,
};

type Snapshot = SmallVec<[ComponentId; 8]>;

/// Arena of pooled nodes and behavior units.
pub struct Scene {
    pub(super) nodes: Pool<GameObject>,
    pub(super) components: Pool<Component>,
    config: SceneConfig,
}

impl Scene {
    /// Create a scene with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            nodes: Pool::with_capacity(config.node_capacity),
            components: Pool::with_capacity(config.component_capacity),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Kinds
    // ------------------------------------------------------------------------

    /// Register a node kind, pre-building `prealloc` nodes of it.
    pub fn register_node_kind<K: NodeBehavior>(
        &mut self,
        name: impl Into<String>,
        prealloc: usize,
        create: impl Fn() -> K + 'static,
    ) -> KindId {
        self.nodes
            .register(name, prealloc, move || GameObject::new(Box::new(create())))
    }

    /// Register a behavior unit kind, pre-building `prealloc` units of it.
    pub fn register_component_kind<B: Behavior>(
        &mut self,
        name: impl Into<String>,
        prealloc: usize,
        create: impl Fn() -> B + 'static,
    ) -> KindId {
        self.components
            .register(name, prealloc, move || Component::new(Box::new(create())))
    }

    /// Acquire a node of the named kind. It arrives reset and not started.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownKind`] if no such kind was registered.
    pub fn spawn(&mut self, kind: &str) -> Result<NodeId, SceneError> {
        let index = self
            .nodes
            .kind_id(kind)
            .and_then(|id| self.nodes.acquire(id))
            .ok_or_else(|| SceneError::UnknownKind(kind.to_string()))?;

        log::debug!("Spawned {kind} node {index:?}");
        Ok(NodeId(index))
    }

    /// Acquire a behavior unit of the named kind. It arrives reset and idle.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownKind`] if no such kind was registered.
    pub fn create_component(&mut self, kind: &str) -> Result<ComponentId, SceneError> {
        let index = self
            .components
            .kind_id(kind)
            .and_then(|id| self.components.acquire(id))
            .ok_or_else(|| SceneError::UnknownKind(kind.to_string()))?;

        Ok(ComponentId(index))
    }

    // ------------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&GameObject> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GameObject> {
        self.nodes.get_mut(id.0)
    }

    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0)
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(id.0)
    }

    /// Name of the kind a node was spawned as.
    #[must_use]
    pub fn node_kind(&self, id: NodeId) -> Option<&str> {
        self.nodes
            .kind_of(id.0)
            .and_then(|kind| self.nodes.kind_name(kind))
    }

    /// Name of the kind a unit was created as.
    #[must_use]
    pub fn component_kind(&self, id: ComponentId) -> Option<&str> {
        self.components
            .kind_of(id.0)
            .and_then(|kind| self.components.kind_name(kind))
    }

    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.is_active(id.0)
    }

    /// Node a unit is attached to.
    #[must_use]
    pub fn owner_of(&self, unit: ComponentId) -> Option<NodeId> {
        self.component(unit).and_then(Component::owner)
    }

    /// Live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GameObject)> {
        self.nodes
            .iter_with_index()
            .map(|(index, node)| (NodeId(index), node))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.active_count()
    }

    /// Behavior units currently checked out, attached or not.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.active_count()
    }

    // ------------------------------------------------------------------------
    // Attach / Detach
    // ------------------------------------------------------------------------

    /// Attach `unit` to the end of `node`'s list.
    ///
    /// A unit that already has an owner is detached from it first, without
    /// being destroyed.
    ///
    /// # Errors
    ///
    /// Fails on a stale node or unit handle, or a destroyed unit.
    pub fn add_component(&mut self, node: NodeId, unit: ComponentId) -> Result<(), SceneError> {
        if !self.nodes.is_active(node.0) {
            return Err(SceneError::StaleNode(node));
        }
        let state = self
            .components
            .get(unit.0)
            .map(Component::state)
            .ok_or(SceneError::StaleComponent(unit))?;
        if state == UnitState::Destroyed {
            return Err(SceneError::DestroyedComponent(unit));
        }

        if let Some(previous) = self.owner_of(unit) {
            self.detach_from(previous, unit);
        }

        if let Some(go) = self.nodes.get_mut(node.0) {
            go.components.push(unit);
        }
        if let Some(component) = self.components.get_mut(unit.0) {
            component.on_added(unit, node);
        }

        log::trace!("Attached {unit:?} to {node:?}");
        Ok(())
    }

    /// Remove `unit` from `node`, destroy it and return it to its pool.
    ///
    /// Returns `false`, doing nothing, when `node` does not hold `unit`.
    pub fn remove_component(&mut self, node: NodeId, unit: ComponentId) -> bool {
        if !self.detach(node, unit) {
            return false;
        }

        if let Some(component) = self.components.get_mut(unit.0) {
            component.destroy(unit);
        }
        self.components.release(unit.0);
        true
    }

    /// Remove `unit` from `node` without destroying it.
    ///
    /// The unit stays checked out and can be attached elsewhere.
    pub fn detach(&mut self, node: NodeId, unit: ComponentId) -> bool {
        let Some(go) = self.nodes.get_mut(node.0) else {
            log::warn!("detach on stale node {node:?}");
            return false;
        };
        let Some(position) = go.components.iter().position(|&c| c == unit) else {
            return false;
        };
        go.components.remove(position);

        if let Some(component) = self.components.get_mut(unit.0) {
            component.on_removed(unit);
        }

        log::trace!("Detached {unit:?} from {node:?}");
        true
    }

    /// Retire a unit and return it to its pool, detaching it first if needed.
    ///
    /// This is how units left destroyed by [`ClearPolicy::Retain`] are
    /// reclaimed. Returns `false` for a stale handle.
    pub fn release_component(&mut self, unit: ComponentId) -> bool {
        if let Some(owner) = self.owner_of(unit) {
            self.detach_from(owner, unit);
        }
        if let Some(component) = self.components.get_mut(unit.0) {
            component.destroy(unit);
        }
        self.components.release(unit.0)
    }

    /// Detach from `owner`, tolerating an owner that is already gone.
    fn detach_from(&mut self, owner: NodeId, unit: ComponentId) {
        if self.nodes.is_active(owner.0) {
            self.detach(owner, unit);
        } else if let Some(component) = self.components.get_mut(unit.0) {
            log::warn!("{unit:?} was owned by stale node {owner:?}");
            component.on_removed(unit);
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Enable the node, then start its units and its own kind.
    pub fn start(&mut self, node: NodeId) {
        let Some(go) = self.nodes.get_mut(node.0) else {
            log::warn!("start on stale node {node:?}");
            return;
        };
        go.can_update = true;
        go.can_draw = true;
        go.events.execute(NodeEvent::Start, &node);

        let snapshot: Snapshot = go.components.iter().copied().collect();
        for unit in snapshot {
            if self.holds(node, unit) {
                self.dispatch_unit(node, unit, |component, ctx| component.start(ctx));
            }
        }

        self.dispatch_node(node, |behavior, ctx| behavior.start(ctx));
    }

    /// Advance the node by `delta`: its own kind first, then each unit.
    ///
    /// Does nothing until the node is started.
    pub fn update(&mut self, node: NodeId, delta: f64) {
        let Some(go) = self.nodes.get(node.0) else {
            log::warn!("update on stale node {node:?}");
            return;
        };
        if !go.can_update {
            return;
        }

        self.dispatch_node(node, |behavior, ctx| behavior.update(ctx, delta));

        let Some(go) = self.nodes.get(node.0) else {
            return;
        };
        let snapshot: Snapshot = go.components.iter().copied().collect();
        for unit in snapshot {
            if self.holds(node, unit) {
                self.dispatch_unit(node, unit, |component, ctx| component.update(ctx, delta));
            }
        }
    }

    /// See [`GameObject::transform_and_draw`].
    pub fn transform_and_draw(&mut self, node: NodeId, context: &mut dyn DrawContext) -> bool {
        let Some(go) = self.nodes.get_mut(node.0) else {
            log::warn!("transform_and_draw on stale node {node:?}");
            return false;
        };
        go.transform_and_draw(context)
    }

    /// Debug pass for one node, drawn in viewport space.
    ///
    /// Runs only when `flags.enabled` and the node has not opted out. The
    /// process-wide switch is not consulted here; pass [`DebugFlags::global`]
    /// or call [`Scene::debug_draw_global`] to follow it. The context state is
    /// saved and restored around the pass.
    pub fn debug_draw(
        &mut self,
        node: NodeId,
        context: &mut dyn DrawContext,
        viewport: &dyn Viewport,
        draw: &mut dyn DrawPrimitives,
        flags: &DebugFlags,
    ) -> bool {
        if !flags.enabled {
            return false;
        }
        let Some(go) = self.nodes.get_mut(node.0) else {
            return false;
        };
        if go.skip_debug {
            return false;
        }

        context.save();
        context.set_transform(&Affine::IDENTITY);
        viewport.transform_context(context);

        if let Some(renderer) = go.renderer.as_deref_mut() {
            renderer.debug_draw(context, viewport, draw, flags);
        }
        for &unit in &go.components {
            if let Some(component) = self.components.get_mut(unit.0) {
                component.debug_draw(context, viewport, draw, flags);
            }
        }
        go.behavior.debug_draw(context, viewport, draw, flags);

        context.restore();
        true
    }

    /// Debug pass gated by the process-wide switch set through
    /// [`set_debug_enabled`](crate::core::set_debug_enabled).
    pub fn debug_draw_global(
        &mut self,
        node: NodeId,
        context: &mut dyn DrawContext,
        viewport: &dyn Viewport,
        draw: &mut dyn DrawPrimitives,
    ) -> bool {
        self.debug_draw(node, context, viewport, draw, &DebugFlags::global())
    }

    /// Disable the node and strip it: emits `Recycle`, runs the kind's
    /// `destroy`, drops the parent link, then retires every unit, last
    /// attached first.
    ///
    /// With [`ClearPolicy::Release`] the units go back to their pools. Clearing
    /// a node without units only repeats the first steps.
    pub fn clear(&mut self, node: NodeId) -> bool {
        let Some(go) = self.nodes.get_mut(node.0) else {
            log::warn!("clear on stale node {node:?}");
            return false;
        };

        go.events.execute(NodeEvent::Recycle, &node);
        go.behavior.destroy();

        go.can_update = false;
        go.can_draw = false;
        go.parent = None;

        let release = self.config.clear_policy == ClearPolicy::Release;
        while let Some(unit) = go.components.pop() {
            if let Some(component) = self.components.get_mut(unit.0) {
                component.on_removed(unit);
                component.destroy(unit);
            }
            if release {
                self.components.release(unit.0);
            }
        }

        true
    }

    /// Clear the node and return it to its pool. Its handle stops resolving.
    pub fn recycle(&mut self, node: NodeId) -> bool {
        if !self.clear(node) {
            return false;
        }

        log::debug!("Recycled node {node:?}");
        self.nodes.release(node.0)
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn holds(&self, node: NodeId, unit: ComponentId) -> bool {
        self.nodes
            .get(node.0)
            .is_some_and(|go| go.has_component(unit))
    }

    fn dispatch_unit(
        &mut self,
        node: NodeId,
        unit: ComponentId,
        hook: impl FnOnce(&mut Component, &mut HookContext<'_>),
    ) {
        let mut removals = Removals::new();
        {
            let Some(go) = self.nodes.get_mut(node.0) else {
                return;
            };
            let Some(component) = self.components.get_mut(unit.0) else {
                return;
            };
            let GameObject {
                transform, alpha, ..
            } = go;

            let mut ctx = HookContext::new(node, Some(unit), transform, alpha, &mut removals);
            hook(component, &mut ctx);
        }
        self.apply_removals(node, removals);
    }

    fn dispatch_node(
        &mut self,
        node: NodeId,
        hook: impl FnOnce(&mut dyn NodeBehavior, &mut HookContext<'_>),
    ) {
        let mut removals = Removals::new();
        {
            let Some(go) = self.nodes.get_mut(node.0) else {
                return;
            };
            let GameObject {
                transform,
                alpha,
                behavior,
                ..
            } = go;

            let mut ctx = HookContext::new(node, None, transform, alpha, &mut removals);
            hook(&mut **behavior, &mut ctx);
        }
        self.apply_removals(node, removals);
    }

    fn apply_removals(&mut self, node: NodeId, removals: Removals) {
        for unit in removals {
            self.remove_component(node, unit);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes)
            .field("components", &self.components)
            .field("config", &self.config)
            .finish()
    }
}
