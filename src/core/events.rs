//! Synchronous Event Channels
//!
//! Nodes and behavior units announce lifecycle changes (added, removed,
//! recycled, started) through a [`Delegate`]: a typed list of callbacks keyed
//! by an event kind. Dispatch is synchronous, and listeners run in the order
//! they were registered.
//!
//! # Example
//!
//! ```ignore
//! let mut events: Delegate<UnitEvent, ComponentId> = Delegate::new();
//!
//! let id = events.on(UnitEvent::Added, |unit| log::info!("added {unit:?}"));
//! events.execute(UnitEvent::Added, &unit);
//! events.remove(UnitEvent::Added, id);
//! ```

use std::fmt;

// ============================================================================
// Listener Id
// ============================================================================

/// Identifies a registered callback so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<E, P> {
    id: ListenerId,
    event: E,
    callback: Box<dyn FnMut(&P)>,
}

// ============================================================================
// Delegate
// ============================================================================

/// Multi-listener, insertion-ordered callback list.
///
/// `E` is the event kind and `P` the payload every listener of this channel
/// receives.
pub struct Delegate<E, P> {
    /// All listeners in registration order, regardless of event kind
    listeners: Vec<Listener<E, P>>,
    next_id: u64,
}

impl<E: Copy + PartialEq, P> Delegate<E, P> {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a callback for `event`.
    pub fn on(&mut self, event: E, callback: impl FnMut(&P) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        self.listeners.push(Listener {
            id,
            event,
            callback: Box::new(callback),
        });

        id
    }

    /// Remove a callback previously registered for `event`.
    ///
    /// Returns `false` if no such listener exists.
    pub fn remove(&mut self, event: E, id: ListenerId) -> bool {
        let Some(index) = self
            .listeners
            .iter()
            .position(|listener| listener.id == id && listener.event == event)
        else {
            return false;
        };

        self.listeners.remove(index);
        true
    }

    /// Invoke every listener registered for `event`, oldest first.
    pub fn execute(&mut self, event: E, payload: &P) {
        for listener in self.listeners.iter_mut().filter(|l| l.event == event) {
            (listener.callback)(payload);
        }
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: E) -> usize {
        self.listeners.iter().filter(|l| l.event == event).count()
    }

    /// Check if there are no listeners at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<E: Copy + PartialEq, P> Default for Delegate<E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> fmt::Debug for Delegate<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
