//! Scene graph
//!
//! Nodes ([`GameObject`]) and behavior units ([`Component`]) live in the pools
//! of a [`Scene`] and refer to each other through generational handles:
//!
//! - a node owns its units through an ordered list of [`ComponentId`]s
//! - a unit knows its owner as an `Option<NodeId>`
//! - a node knows its parent as an `Option<NodeId>` that never keeps the
//!   parent alive and is checked on every walk
//!
//! # Example
//!
//! ```ignore
//! let mut scene = Scene::new();
//! scene.register_node_kind("Ship", 4, || Basic);
//! scene.register_component_kind("Thruster", 4, Thruster::default);
//!
//! let ship = scene.spawn("Ship")?;
//! let thruster = scene.create_component("Thruster")?;
//! scene.add_component(ship, thruster)?;
//!
//! scene.start(ship);
//! scene.update(ship, 1.0 / 60.0);
//! ```

mod behavior;
mod component;
mod game_object;
mod hierarchy;
mod world;

pub use behavior::{AsAny, Basic, Behavior, Configure, HookContext, NodeBehavior};
pub use component::{Component, ComponentId, UnitEvent, UnitState};
pub use game_object::{GameObject, LocalTransform, NodeArgs, NodeEvent, NodeId, TransformArgs};
pub use hierarchy::Ancestors;
pub use world::Scene;

pub(crate) use behavior::Removals;

use std::fmt;

/// Scene operation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// No pool kind registered under this name
    UnknownKind(String),
    /// The node handle no longer resolves
    StaleNode(NodeId),
    /// The unit handle no longer resolves
    StaleComponent(ComponentId),
    /// The unit was retired and cannot be attached
    DestroyedComponent(ComponentId),
    /// Parenting would make a node its own ancestor
    Cycle { child: NodeId, parent: NodeId },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind(name) => write!(f, "Unknown kind: {name}"),
            Self::StaleNode(id) => write!(f, "Stale node handle: {id:?}"),
            Self::StaleComponent(id) => write!(f, "Stale component handle: {id:?}"),
            Self::DestroyedComponent(id) => write!(f, "Component was destroyed: {id:?}"),
            Self::Cycle { child, parent } => {
                write!(f, "Parenting {child:?} under {parent:?} would create a cycle")
            }
        }
    }
}

impl std::error::Error for SceneError {}
