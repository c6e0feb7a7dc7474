//! Debug drawing switch
//!
//! A process-wide flag that turns on the debug draw pass of every node that
//! has not opted out.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global debug draw switch
static DEBUG_DRAW: AtomicBool = AtomicBool::new(false);

/// Serializes tests that flip the global switch.
#[cfg(test)]
pub(crate) static SWITCH_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Turn debug drawing on or off for the whole process.
pub fn set_debug_enabled(enabled: bool) {
    DEBUG_DRAW.store(enabled, Ordering::Relaxed);
    log::debug!("Debug drawing {}", if enabled { "enabled" } else { "disabled" });
}

/// Check the process-wide debug switch.
#[must_use]
pub fn debug_enabled() -> bool {
    DEBUG_DRAW.load(Ordering::Relaxed)
}

/// Flags handed to debug draw hooks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Whether the debug pass runs at all
    pub enabled: bool,
}

impl DebugFlags {
    /// Flags with debug drawing on.
    #[must_use]
    pub const fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Snapshot of the process-wide switch.
    #[must_use]
    pub fn global() -> Self {
        Self {
            enabled: debug_enabled(),
        }
    }
}
