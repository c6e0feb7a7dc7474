//! Core building blocks
//!
//! Configuration, the debug switch, event channels and the object pool that
//! the scene is built on.

mod config;
pub mod debug;
mod events;
pub mod pool;

pub use config::{ClearPolicy, ConfigError, SceneConfig};
pub use debug::{DebugFlags, debug_enabled, set_debug_enabled};
pub use events::{Delegate, ListenerId};
pub use pool::{KindId, Pool, PoolIndex, Poolable};
