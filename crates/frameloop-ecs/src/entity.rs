//! Entity identifiers, allocation, and the insertion-ordered entity registry.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, so an id that has been removed never
//! refers to a live entity again.
//!
//! [`EntityRegistry`] is the sole owner of whatever value is stored per
//! entity. Lookup goes through a hash map; iteration follows insertion order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Whether the slot is currently alive.
    alive: Vec<bool>,
    /// Free-list of recyclable indices (FIFO queue).
    free_indices: VecDeque<u32>,
    /// Number of live ids.
    live: usize,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`].
    ///
    /// If a recycled index is available it is reused with the generation that
    /// was bumped when it was freed; otherwise a brand-new index is created.
    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free_indices.pop_front() {
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Free an id, bumping the generation of its index so any outstanding
    /// copies become stale.
    ///
    /// Returns `true` if the id was alive and is now freed, `false` if it was
    /// already dead or had a stale generation.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        self.live -= 1;
        true
    }

    /// Returns `true` if `id` refers to a currently alive entity whose
    /// generation matches the allocator's current generation for that index.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        self.alive[idx] && self.generations[idx] == id.generation()
    }

    /// Total number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.live
    }
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Slot<T> {
    /// Monotonic insertion sequence, used for ordering.
    sequence: u64,
    value: T,
}

/// Owns one value per live entity and hands out the ids.
///
/// Removal is idempotent: removing an id that is not live is a no-op. This
/// lets several parties (a self-timeout and an external caller, say) request
/// the same removal without coordinating.
#[derive(Debug)]
pub struct EntityRegistry<T> {
    allocator: EntityAllocator,
    slots: HashMap<EntityId, Slot<T>>,
    /// Insertion sequence -> id, for deterministic iteration order.
    order: BTreeMap<u64, EntityId>,
    next_sequence: u64,
}

impl<T> EntityRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            slots: HashMap::new(),
            order: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Insert a value and return the id assigned to it.
    pub fn add(&mut self, value: T) -> EntityId {
        let id = self.allocator.allocate();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.slots.insert(id, Slot { sequence, value });
        self.order.insert(sequence, id);
        id
    }

    /// Remove an entity and return its value, or `None` if `id` is not live.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.slots.remove(&id)?;
        self.order.remove(&slot.sequence);
        self.allocator.deallocate(id);
        Some(slot.value)
    }

    /// Borrow the value of a live entity. `None` for removed or stale ids.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(&id).map(|slot| &slot.value)
    }

    /// Mutably borrow the value of a live entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slots.get_mut(&id).map(|slot| &mut slot.value)
    }

    /// Whether `id` refers to a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    /// The insertion sequence number of a live entity.
    ///
    /// Sequence numbers increase strictly with each `add`, so sorting by them
    /// reproduces insertion order.
    pub fn sequence_of(&self, id: EntityId) -> Option<u64> {
        self.slots.get(&id).map(|slot| slot.sequence)
    }

    /// Snapshot of live ids in insertion order.
    ///
    /// The returned vector is detached from the registry, so callers may add
    /// or remove entities while walking it.
    pub fn ids(&self) -> Vec<EntityId> {
        self.order.values().copied().collect()
    }

    /// Iterate live `(id, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.order
            .values()
            .filter_map(move |id| self.slots.get(id).map(|slot| (*id, &slot.value)))
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry holds no entities.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> Default for EntityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
