//! Scene nodes
//!
//! A [`GameObject`] is a positioned, drawable node. It owns an ordered list of
//! behavior units (by handle), an optional renderer and a weak link to its
//! parent. Operations that need the units themselves live on
//! [`Scene`](super::Scene); this module holds the per-node state.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{Delegate, PoolIndex, Poolable};
use crate::math::Affine;
use crate::render::{DrawContext, Renderer};

use super::{ComponentId, Configure, NodeBehavior};

/// Handle to a pooled node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) PoolIndex);

/// Events a node emits. Listeners receive the node's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEvent {
    /// The node was started
    Start,
    /// The node is being cleared
    Recycle,
}

impl NodeEvent {
    /// Event name, as used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Recycle => "recycle",
        }
    }
}

// ============================================================================
// Local Transform
// ============================================================================

/// Placement of a node relative to its parent.
///
/// The node's local matrix is `T(x, y) * R(rotation) * S(scale) * T(-center)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTransform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Radians
    pub rotation: f64,
    /// Pivot, in local units
    pub center_x: f64,
    pub center_y: f64,
}

impl LocalTransform {
    /// The identity placement.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        center_x: 0.0,
        center_y: 0.0,
    };

    /// Assign every field.
    ///
    /// Missing, zero or NaN position, rotation and pivot become `0`; a missing
    /// scale becomes `1` (an explicit scale is kept as given).
    pub fn reset(&mut self, args: &TransformArgs) {
        self.x = or_zero(args.x);
        self.y = or_zero(args.y);
        self.scale_x = args.scale_x.unwrap_or(1.0);
        self.scale_y = args.scale_y.unwrap_or(1.0);
        self.rotation = or_zero(args.rotation);
        self.center_x = or_zero(args.center_x);
        self.center_y = or_zero(args.center_y);
    }

    /// Compose this placement after `m`, as when descending root-first.
    pub fn append_to<'m>(&self, m: &'m mut Affine) -> &'m mut Affine {
        m.append_transform(
            self.x,
            self.y,
            self.scale_x,
            self.scale_y,
            self.rotation,
            self.center_x,
            self.center_y,
        )
    }

    /// Compose this placement before `m`, as when ascending leaf-first.
    pub fn prepend_to<'m>(&self, m: &'m mut Affine) -> &'m mut Affine {
        m.prepend_transform(
            self.x,
            self.y,
            self.scale_x,
            self.scale_y,
            self.rotation,
            self.center_x,
            self.center_y,
        )
    }

    /// Assign only the fields given a non-zero, non-NaN value.
    ///
    /// Zero cannot be set through here: `0.0` reads as "leave unchanged".
    /// Use [`Self::reset`] or the fields directly for that.
    pub fn set(&mut self, args: &TransformArgs) {
        assign_truthy(&mut self.x, args.x);
        assign_truthy(&mut self.y, args.y);
        assign_truthy(&mut self.scale_x, args.scale_x);
        assign_truthy(&mut self.scale_y, args.scale_y);
        assign_truthy(&mut self.rotation, args.rotation);
        assign_truthy(&mut self.center_x, args.center_x);
        assign_truthy(&mut self.center_y, args.center_y);
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[inline]
fn is_truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

#[inline]
fn or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| is_truthy(*v)).unwrap_or(0.0)
}

#[inline]
fn assign_truthy(field: &mut f64, value: Option<f64>) {
    if let Some(value) = value.filter(|v| is_truthy(*v)) {
        *field = value;
    }
}

/// Optional transform fields, for [`LocalTransform::reset`] and
/// [`LocalTransform::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformArgs {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub rotation: Option<f64>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
}

impl TransformArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = Some(scale_x);
        self.scale_y = Some(scale_y);
        self
    }

    #[must_use]
    pub fn rotation(mut self, rotation: f64) -> Self {
        self.rotation = Some(rotation);
        self
    }

    #[must_use]
    pub fn center(mut self, center_x: f64, center_y: f64) -> Self {
        self.center_x = Some(center_x);
        self.center_y = Some(center_y);
        self
    }
}

/// Node configuration. Every `Some` field overwrites the node's value.
///
/// ```ignore
/// let args: NodeArgs = ron::from_str("(x: Some(10.0), alpha: Some(0.5))")?;
/// scene.node_mut(id).unwrap().configure(args);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeArgs {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub rotation: Option<f64>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub alpha: Option<f64>,
    pub skip_debug: Option<bool>,
}

// ============================================================================
// Game Object
// ============================================================================

/// A pooled scene node.
pub struct GameObject {
    /// Placement relative to the parent
    pub transform: LocalTransform,
    /// Own opacity, multiplied with the ancestors' while drawing
    pub alpha: f64,
    /// Opt out of the debug draw pass
    pub skip_debug: bool,

    pub(crate) matrix: Affine,
    pub(crate) components: SmallVec<[ComponentId; 4]>,
    pub(crate) renderer: Option<Box<dyn Renderer>>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) can_update: bool,
    pub(crate) can_draw: bool,

    args: Option<NodeArgs>,
    kind_args: Option<Box<dyn Any>>,
    pub(crate) events: Delegate<NodeEvent, NodeId>,
    pub(crate) behavior: Box<dyn NodeBehavior>,
}

impl GameObject {
    pub(crate) fn new(behavior: Box<dyn NodeBehavior>) -> Self {
        Self {
            transform: LocalTransform::IDENTITY,
            alpha: 1.0,
            skip_debug: false,
            matrix: Affine::IDENTITY,
            components: SmallVec::new(),
            renderer: None,
            parent: None,
            can_update: false,
            can_draw: false,
            args: None,
            kind_args: None,
            events: Delegate::new(),
            behavior,
        }
    }

    /// Apply `args` and keep them for [`Self::args`].
    pub fn configure(&mut self, args: NodeArgs) {
        let t = &mut self.transform;
        let fields = [
            (&mut t.x, args.x),
            (&mut t.y, args.y),
            (&mut t.scale_x, args.scale_x),
            (&mut t.scale_y, args.scale_y),
            (&mut t.rotation, args.rotation),
            (&mut t.center_x, args.center_x),
            (&mut t.center_y, args.center_y),
            (&mut self.alpha, args.alpha),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }

        if let Some(skip) = args.skip_debug {
            self.skip_debug = skip;
        }

        self.args = Some(args);
    }

    /// Last configuration applied through [`Self::configure`].
    #[must_use]
    pub fn args(&self) -> Option<&NodeArgs> {
        self.args.as_ref()
    }

    /// Apply kind-specific configuration. Returns `false`, changing nothing,
    /// when this node is not a `K`.
    pub fn configure_kind<K: NodeBehavior + Configure>(&mut self, args: K::Args) -> bool {
        let Some(behavior) = self.behavior_mut::<K>() else {
            return false;
        };

        behavior.configure(&args);
        self.kind_args = Some(Box::new(args));
        true
    }

    /// Last configuration applied through [`Self::configure_kind`].
    #[must_use]
    pub fn kind_args<K: Configure>(&self) -> Option<&K::Args> {
        self.kind_args.as_deref()?.downcast_ref::<K::Args>()
    }

    /// The kind-specific behavior, if it is a `K`.
    #[must_use]
    pub fn behavior<K: NodeBehavior>(&self) -> Option<&K> {
        let behavior: &dyn NodeBehavior = self.behavior.as_ref();
        behavior.as_any().downcast_ref::<K>()
    }

    /// The kind-specific behavior, mutably, if it is a `K`.
    pub fn behavior_mut<K: NodeBehavior>(&mut self) -> Option<&mut K> {
        let behavior: &mut dyn NodeBehavior = self.behavior.as_mut();
        behavior.as_any_mut().downcast_mut::<K>()
    }

    /// See [`LocalTransform::reset`].
    pub fn reset_transform(&mut self, args: &TransformArgs) {
        self.transform.reset(args);
    }

    /// See [`LocalTransform::set`].
    pub fn set_transform(&mut self, args: &TransformArgs) {
        self.transform.set(args);
    }

    /// Attached units, in update and draw order.
    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    #[must_use]
    pub fn has_component(&self, unit: ComponentId) -> bool {
        self.components.contains(&unit)
    }

    #[must_use]
    pub fn renderer(&self) -> Option<&dyn Renderer> {
        self.renderer.as_deref()
    }

    /// Install a renderer, returning the previous one.
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) -> Option<Box<dyn Renderer>> {
        self.renderer.replace(renderer)
    }

    pub fn take_renderer(&mut self) -> Option<Box<dyn Renderer>> {
        self.renderer.take()
    }

    /// Parent handle. It may have gone stale; the scene checks it on use.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn can_update(&self) -> bool {
        self.can_update
    }

    #[must_use]
    pub fn can_draw(&self) -> bool {
        self.can_draw
    }

    /// Local matrix as of the last draw.
    #[must_use]
    pub fn matrix(&self) -> &Affine {
        &self.matrix
    }

    /// Local matrix from the current transform.
    #[must_use]
    pub fn local_matrix(&self) -> Affine {
        let mut m = Affine::IDENTITY;
        self.transform.append_to(&mut m);
        m
    }

    #[must_use]
    pub fn events(&self) -> &Delegate<NodeEvent, NodeId> {
        &self.events
    }

    /// Event channel, to register or remove listeners.
    pub fn events_mut(&mut self) -> &mut Delegate<NodeEvent, NodeId> {
        &mut self.events
    }

    /// Compose this node into `context` and draw it.
    ///
    /// The context is expected to hold the parent's composed state; callers
    /// bracket children with `save`/`restore`. Returns `false` without
    /// touching the context when drawing is disabled.
    pub fn transform_and_draw(&mut self, context: &mut dyn DrawContext) -> bool {
        if !self.can_draw {
            return false;
        }

        self.transform.append_to(self.matrix.identity());
        context.transform(&self.matrix);
        context.set_global_alpha(context.global_alpha() * self.alpha);

        if let Some(renderer) = self.renderer.as_deref_mut() {
            renderer.render(context);
        }
        true
    }
}

impl Poolable for GameObject {
    fn reset(&mut self) {
        debug_assert!(
            self.components.is_empty(),
            "node returned to the pool with attached units"
        );

        self.transform = LocalTransform::IDENTITY;
        self.alpha = 1.0;
        self.skip_debug = false;
        self.matrix = Affine::IDENTITY;
        self.parent = None;
        self.can_update = false;
        self.can_draw = false;
        self.args = None;
        self.kind_args = None;
        self.events.clear();
        self.behavior.reset();
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("transform", &self.transform)
            .field("alpha", &self.alpha)
            .field("components", &self.components)
            .field("parent", &self.parent)
            .field("can_update", &self.can_update)
            .field("can_draw", &self.can_draw)
            .field("has_renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MatrixContext;
    use crate::scene::Basic;
    use std::cell::Cell;
    use std::f64::consts::FRAC_PI_2;
    use std::rc::Rc;

    fn node() -> GameObject {
        GameObject::new(Box::new(Basic))
    }

    #[test]
    fn test_set_transform_zero_means_unchanged() {
        let mut go = node();
        go.transform.x = 5.0;
        go.transform.y = 5.0;

        go.set_transform(&TransformArgs::new().position(0.0, 0.0));
        assert_eq!(go.transform.x, 5.0);
        assert_eq!(go.transform.y, 5.0);

        go.set_transform(&TransformArgs::new().position(f64::NAN, 3.0));
        assert_eq!(go.transform.x, 5.0);
        assert_eq!(go.transform.y, 3.0);
    }

    #[test]
    fn test_reset_transform_defaults() {
        let mut go = node();
        go.transform = LocalTransform {
            x: 1.0,
            y: 2.0,
            scale_x: 3.0,
            scale_y: 4.0,
            rotation: 5.0,
            center_x: 6.0,
            center_y: 7.0,
        };

        go.reset_transform(&TransformArgs::new().position(f64::NAN, 9.0));
        assert_eq!(
            go.transform,
            LocalTransform {
                y: 9.0,
                ..LocalTransform::IDENTITY
            }
        );

        // Explicit zero scale is kept, unlike position
        go.reset_transform(&TransformArgs::new().scale(0.0, 2.0));
        assert_eq!(go.transform.scale_x, 0.0);
        assert_eq!(go.transform.scale_y, 2.0);
    }

    #[test]
    fn test_configure_overwrites_given_fields() {
        let mut go = node();
        go.transform.y = 4.0;

        go.configure(NodeArgs {
            x: Some(0.0),
            alpha: Some(0.25),
            skip_debug: Some(true),
            ..Default::default()
        });

        assert_eq!(go.transform.x, 0.0);
        assert_eq!(go.transform.y, 4.0);
        assert_eq!(go.alpha, 0.25);
        assert!(go.skip_debug);
        assert_eq!(go.args().and_then(|a| a.alpha), Some(0.25));
    }

    #[test]
    fn test_node_args_from_ron() {
        let args: NodeArgs = ron::from_str("(x: Some(10.0), rotation: Some(1.5))").unwrap();
        assert_eq!(args.x, Some(10.0));
        assert_eq!(args.rotation, Some(1.5));
        assert!(args.alpha.is_none());
    }

    struct Spinner {
        speed: f64,
    }

    impl NodeBehavior for Spinner {}

    impl Configure for Spinner {
        type Args = f64;

        fn configure(&mut self, speed: &f64) {
            self.speed = *speed;
        }
    }

    #[test]
    fn test_configure_kind() {
        let mut go = GameObject::new(Box::new(Spinner { speed: 0.0 }));

        assert!(go.configure_kind::<Spinner>(2.0));
        assert_eq!(go.behavior::<Spinner>().map(|s| s.speed), Some(2.0));
        assert_eq!(go.kind_args::<Spinner>(), Some(&2.0));

        let mut basic = node();
        assert!(!basic.configure_kind::<Spinner>(2.0));
    }

    struct Probe(Rc<Cell<f64>>);

    impl Renderer for Probe {
        fn render(&mut self, context: &mut dyn DrawContext) {
            self.0.set(context.global_alpha());
        }
    }

    #[test]
    fn test_transform_and_draw_gated() {
        let seen = Rc::new(Cell::new(-1.0));
        let mut go = node();
        go.set_renderer(Box::new(Probe(Rc::clone(&seen))));
        go.transform.x = 10.0;
        go.alpha = 0.5;

        let mut ctx = MatrixContext::new();
        assert!(!go.transform_and_draw(&mut ctx));
        assert!(ctx.matrix().is_identity());
        assert_eq!(seen.get(), -1.0);

        go.can_draw = true;
        ctx.set_global_alpha(0.5);
        assert!(go.transform_and_draw(&mut ctx));
        assert_eq!(ctx.matrix().tx, 10.0);
        assert_eq!(seen.get(), 0.25);
    }

    #[test]
    fn test_local_matrix() {
        let mut go = node();
        go.transform.rotation = FRAC_PI_2;
        go.transform.x = 3.0;

        let m = go.local_matrix();
        let p = m.transform_point(glam::DVec2::new(1.0, 0.0));
        assert!((p.x - 3.0).abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_local_transform_composes_into_affine() {
        let parent = LocalTransform {
            x: 20.0,
            rotation: 0.4,
            scale_x: 2.0,
            scale_y: 2.0,
            ..LocalTransform::IDENTITY
        };
        let child = LocalTransform {
            y: -3.0,
            center_x: 1.0,
            center_y: 2.0,
            ..LocalTransform::IDENTITY
        };

        let mut direct = Affine::IDENTITY;
        direct.append_transform(20.0, 0.0, 2.0, 2.0, 0.4, 0.0, 0.0);
        direct.append_transform(0.0, -3.0, 1.0, 1.0, 0.0, 1.0, 2.0);

        let mut descending = Affine::IDENTITY;
        parent.append_to(&mut descending);
        child.append_to(&mut descending);

        let mut ascending = Affine::IDENTITY;
        child.prepend_to(&mut ascending);
        parent.prepend_to(&mut ascending);

        assert!(descending.abs_diff_eq(&direct, 1e-12));
        assert!(ascending.abs_diff_eq(&direct, 1e-9));
    }

    #[test]
    fn test_pool_reset_keeps_renderer() {
        let mut go = node();
        go.set_renderer(Box::new(Probe(Rc::new(Cell::new(0.0)))));
        go.transform.x = 4.0;
        go.alpha = 0.1;
        go.can_draw = true;
        go.events_mut().on(NodeEvent::Start, |_| {});

        go.reset();

        assert_eq!(go.transform, LocalTransform::IDENTITY);
        assert_eq!(go.alpha, 1.0);
        assert!(!go.can_draw());
        assert!(go.events().is_empty());
        assert!(go.renderer().is_some());
    }
}
