//! Kind-Keyed Object Pool
//!
//! Nodes and behavior units are constructed once and then reused: releasing an
//! object keeps the instance in its slot, and the next acquisition of the same
//! kind resets and hands it out again instead of allocating.
//!
//! # Design Principles
//!
//! - **Zero Allocation**: after warm-up, acquire/release only move indices
//! - **Arrives Reset**: every acquired object has had [`Poolable::reset`] applied
//! - **Generational Handles**: a handle from a previous life of a slot never
//!   resolves, so stale references are detected instead of aliasing
//! - **Per-Kind Free Lists**: each kind reuses its own instances, LIFO
//!
//! # Example
//!
//! ```ignore
//! let mut pool: Pool<Particle> = Pool::new();
//! let spark = pool.register("Spark", 16, Particle::default);
//!
//! let index = pool.acquire(spark).unwrap();
//! pool.get_mut(index).unwrap().ttl = 2.0;
//!
//! pool.release(index);
//! assert!(pool.get(index).is_none());
//! ```

use rustc_hash::FxHashMap;

// ============================================================================
// Poolable
// ============================================================================

/// Objects that can be handed out again after release.
pub trait Poolable {
    /// Return to the freshly-acquired state.
    fn reset(&mut self);
}

// ============================================================================
// Handles
// ============================================================================

/// Index into a pool, identifying one life of a specific slot.
///
/// The index stops resolving when the object is released, and keeps failing
/// after the slot is handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolIndex {
    index: u32,
    generation: u32,
}

impl PoolIndex {
    /// Get the raw slot index.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> usize {
        self.index as usize
    }

    /// Get the generation this handle was issued for.
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Registered kind of pooled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindId(u32);

// ============================================================================
// Internals
// ============================================================================

#[derive(Debug)]
struct Slot<T> {
    value: T,
    kind: KindId,
    generation: u32,
    active: bool,
}

struct Kind<T> {
    name: String,
    create: Box<dyn Fn() -> T>,
    /// Released slots of this kind, reused LIFO
    free: Vec<usize>,
}

/// Slots are only ever pushed below `u32::MAX`, see `Pool::push_slot`.
#[inline]
fn slot_index(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

// ============================================================================
// Pool
// ============================================================================

/// Arena of reusable objects grouped by kind.
///
/// # Performance Characteristics
///
/// | Operation  | Time Complexity |
/// |------------|-----------------|
/// | `acquire`  | O(1) amortized  |
/// | `release`  | O(1)            |
/// | `get`      | O(1)            |
/// | `kind_id`  | O(1) hash       |
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    kinds: Vec<Kind<T>>,
    by_name: FxHashMap<String, KindId>,
    active_count: usize,
}

impl<T: Poolable> Pool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a pool with room for `capacity` slots before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            kinds: Vec::new(),
            by_name: FxHashMap::default(),
            active_count: 0,
        }
    }

    /// Register a kind with its constructor and pre-build `prealloc` instances.
    ///
    /// Registering a name twice replaces the constructor for future growth;
    /// instances already built are kept.
    ///
    /// Kinds and slots are addressed with `u32`; pre-building stops, with an
    /// error logged, once the slot space is exhausted.
    ///
    /// # Panics
    ///
    /// Panics when more than `u32::MAX` kinds are registered.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        prealloc: usize,
        create: impl Fn() -> T + 'static,
    ) -> KindId {
        let name = name.into();

        let kind = if let Some(&existing) = self.by_name.get(&name) {
            log::warn!("Pool kind '{name}' registered twice, replacing its constructor");
            self.kinds[existing.0 as usize].create = Box::new(create);
            existing
        } else {
            let Ok(raw) = u32::try_from(self.kinds.len()) else {
                panic!("Pool kind space exhausted registering '{name}'");
            };
            let kind = KindId(raw);
            self.by_name.insert(name.clone(), kind);
            self.kinds.push(Kind {
                name,
                create: Box::new(create),
                free: Vec::with_capacity(prealloc),
            });
            kind
        };

        for _ in 0..prealloc {
            let Some(index) = self.push_slot(kind) else {
                break;
            };
            self.kinds[kind.0 as usize].free.push(index);
        }

        kind
    }

    /// Look up a registered kind by name.
    #[must_use]
    pub fn kind_id(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }

    /// Name a kind was registered with.
    #[must_use]
    pub fn kind_name(&self, kind: KindId) -> Option<&str> {
        self.kinds.get(kind.0 as usize).map(|k| k.name.as_str())
    }

    /// Kind of the object behind `index`, if it is active.
    #[must_use]
    pub fn kind_of(&self, index: PoolIndex) -> Option<KindId> {
        self.slot(index).map(|slot| slot.kind)
    }

    /// Acquire an object of `kind`.
    ///
    /// Reuses the most recently released instance of that kind if there is
    /// one, otherwise constructs a new one. Either way the object is reset
    /// before it is returned. Returns `None` for an unregistered kind, or when
    /// a new instance is needed but the `u32` slot space is exhausted.
    pub fn acquire(&mut self, kind: KindId) -> Option<PoolIndex> {
        let entry = self.kinds.get_mut(kind.0 as usize)?;

        let index = match entry.free.pop() {
            Some(index) => index,
            None => {
                log::debug!(
                    "Pool '{}' exhausted, constructing a new instance",
                    entry.name
                );
                self.push_slot(kind)?
            }
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.active = true;
        slot.value.reset();
        self.active_count += 1;

        Some(PoolIndex {
            index: slot_index(index),
            generation: slot.generation,
        })
    }

    /// Release an object back to its kind's free list.
    ///
    /// The instance stays allocated but `index` no longer resolves.
    /// Returns `false` if the index was stale or already released.
    pub fn release(&mut self, index: PoolIndex) -> bool {
        let Some(slot) = self.slot_mut(index) else {
            return false;
        };

        slot.active = false;
        let kind = slot.kind;
        self.kinds[kind.0 as usize].free.push(index.raw());
        self.active_count -= 1;

        true
    }

    fn push_slot(&mut self, kind: KindId) -> Option<usize> {
        let index = self.slots.len();
        if u32::try_from(index).is_err() {
            log::error!("Pool slot space exhausted, cannot build more instances");
            return None;
        }

        let value = (self.kinds[kind.0 as usize].create)();
        self.slots.push(Slot {
            value,
            kind,
            generation: 0,
            active: false,
        });
        Some(index)
    }
}

impl<T> Pool<T> {
    fn slot(&self, index: PoolIndex) -> Option<&Slot<T>> {
        self.slots
            .get(index.raw())
            .filter(|slot| slot.active && slot.generation == index.generation)
    }

    fn slot_mut(&mut self, index: PoolIndex) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(index.raw())
            .filter(|slot| slot.active && slot.generation == index.generation)
    }

    /// Get a reference to an active object.
    #[must_use]
    #[inline]
    pub fn get(&self, index: PoolIndex) -> Option<&T> {
        self.slot(index).map(|slot| &slot.value)
    }

    /// Get a mutable reference to an active object.
    #[inline]
    pub fn get_mut(&mut self, index: PoolIndex) -> Option<&mut T> {
        self.slot_mut(index).map(|slot| &mut slot.value)
    }

    /// Check if an index refers to an active object.
    #[must_use]
    #[inline]
    pub fn is_active(&self, index: PoolIndex) -> bool {
        self.slot(index).is_some()
    }

    /// Number of objects currently handed out.
    #[must_use]
    #[inline]
    pub const fn active_count(&self) -> usize {
        self.active_count
    }

    /// Total number of instances ever built (active + available).
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of instances of `kind` waiting to be reused.
    #[must_use]
    pub fn available(&self, kind: KindId) -> usize {
        self.kinds.get(kind.0 as usize).map_or(0, |k| k.free.len())
    }

    /// Check if nothing is handed out.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    /// Iterate over active objects with their indices.
    pub fn iter_with_index(&self) -> impl Iterator<Item = (PoolIndex, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(idx, slot)| {
                (
                    PoolIndex {
                        index: slot_index(idx),
                        generation: slot.generation,
                    },
                    &slot.value,
                )
            })
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("kinds", &self.kinds.iter().map(|k| &k.name).collect::<Vec<_>>())
            .field("capacity", &self.slots.len())
            .field("active_count", &self.active_count)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestObject {
        value: i32,
        resets: u32,
    }

    impl TestObject {
        fn new(value: i32) -> Self {
            Self { value, resets: 0 }
        }
    }

    impl Poolable for TestObject {
        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn test_pool_acquire_and_release() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Test", 0, || TestObject::new(1));

        let idx1 = pool.acquire(kind).unwrap();
        let idx2 = pool.acquire(kind).unwrap();
        assert_eq!(pool.active_count(), 2);

        assert!(pool.release(idx2));
        assert_eq!(pool.active_count(), 1);
        assert!(pool.get(idx2).is_none());
        assert!(pool.get(idx1).is_some());
    }

    #[test]
    fn test_pool_prealloc() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Test", 3, || TestObject::new(0));

        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.available(kind), 3);
        assert!(pool.is_empty());

        pool.acquire(kind).unwrap();
        assert_eq!(pool.capacity(), 3, "Should reuse a pre-built instance");
        assert_eq!(pool.available(kind), 2);
    }

    #[test]
    fn test_pool_reuses_instance_and_resets() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Test", 0, || TestObject::new(100));

        let idx1 = pool.acquire(kind).unwrap();
        pool.get_mut(idx1).unwrap().value = 5;
        pool.release(idx1);

        let idx2 = pool.acquire(kind).unwrap();
        assert_eq!(idx1.raw(), idx2.raw(), "Should reuse the same slot");

        // Same instance, not a new one: the field survives, reset ran again
        let obj = pool.get(idx2).unwrap();
        assert_eq!(obj.value, 5);
        assert_eq!(obj.resets, 2);
    }

    #[test]
    fn test_pool_stale_handle() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Test", 0, || TestObject::new(1));

        let old = pool.acquire(kind).unwrap();
        pool.release(old);
        let new = pool.acquire(kind).unwrap();

        assert_eq!(old.raw(), new.raw());
        assert_ne!(old.generation(), new.generation());
        assert!(pool.get(old).is_none());
        assert!(!pool.release(old), "Stale handle must not release the new life");
        assert!(pool.is_active(new));
    }

    #[test]
    fn test_pool_free_list_is_per_kind_lifo() {
        let mut pool: Pool<TestObject> = Pool::new();
        let a = pool.register("A", 0, || TestObject::new(1));
        let b = pool.register("B", 0, || TestObject::new(2));

        let a0 = pool.acquire(a).unwrap();
        let a1 = pool.acquire(a).unwrap();
        let b0 = pool.acquire(b).unwrap();

        pool.release(a0);
        pool.release(b0);
        pool.release(a1);

        assert_eq!(pool.acquire(a).unwrap().raw(), a1.raw());
        assert_eq!(pool.acquire(a).unwrap().raw(), a0.raw());
        assert_eq!(pool.acquire(b).unwrap().raw(), b0.raw());
    }

    #[test]
    fn test_pool_double_release() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Test", 0, || TestObject::new(1));

        let idx = pool.acquire(kind).unwrap();
        assert!(pool.release(idx));
        assert!(!pool.release(idx), "Double release should return false");
        assert_eq!(pool.available(kind), 1);
    }

    #[test]
    fn test_pool_kind_lookup() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Bullet", 0, || TestObject::new(1));

        assert_eq!(pool.kind_id("Bullet"), Some(kind));
        assert_eq!(pool.kind_name(kind), Some("Bullet"));
        assert!(pool.kind_id("Missing").is_none());

        let idx = pool.acquire(kind).unwrap();
        assert_eq!(pool.kind_of(idx), Some(kind));
    }

    #[test]
    fn test_pool_register_twice_keeps_kind() {
        let mut pool: Pool<TestObject> = Pool::new();
        let first = pool.register("Test", 1, || TestObject::new(1));
        let second = pool.register("Test", 1, || TestObject::new(2));

        assert_eq!(first, second);
        assert_eq!(pool.available(first), 2);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_slot_index_does_not_wrap() {
        assert_eq!(slot_index(7), 7);
        assert_eq!(slot_index(u32::MAX as usize), u32::MAX);
        assert_eq!(slot_index(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn test_pool_iteration_skips_released() {
        let mut pool: Pool<TestObject> = Pool::new();
        let kind = pool.register("Test", 0, || TestObject::new(1));

        let idx0 = pool.acquire(kind).unwrap();
        let idx1 = pool.acquire(kind).unwrap();
        pool.release(idx0);

        let active: Vec<PoolIndex> = pool.iter_with_index().map(|(i, _)| i).collect();
        assert_eq!(active, vec![idx1]);
    }
}
