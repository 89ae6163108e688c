//! Derived values that are only valid for the current step.

use crate::events::{EntityRemovedListener, TickBoundaryListener};
use crate::identity::{EntityId, IdentityKey, IdentityMap};

/// Per-scope derived values, all dropped at every tick boundary.
///
/// Useful for summaries that many consumers ask for within one step (e.g.
/// "does this map have anyone who needs feeding?") but that would be stale
/// by the next one.
#[derive(Debug)]
pub struct TickScopedCache<S, V> {
    values: IdentityMap<S, V>,
    computed_this_tick: u64,
}

impl<S: IdentityKey, V> TickScopedCache<S, V> {
    pub fn new() -> Self {
        Self {
            values: IdentityMap::default(),
            computed_this_tick: 0,
        }
    }

    pub fn get_or_compute(&mut self, scope: S, compute: impl FnOnce() -> V) -> &V {
        let computed = &mut self.computed_this_tick;
        self.values.entry(scope).or_insert_with(|| {
            *computed += 1;
            compute()
        })
    }

    pub fn get(&self, scope: S) -> Option<&V> {
        self.values.get(&scope)
    }

    /// How many values were computed since the last tick boundary.
    pub fn computed_this_tick(&self) -> u64 {
        self.computed_this_tick
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.computed_this_tick = 0;
    }
}

impl<S: IdentityKey, V> Default for TickScopedCache<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: IdentityKey, V> TickBoundaryListener for TickScopedCache<S, V> {
    fn on_tick_boundary(&mut self) {
        self.clear();
    }
}

/// Per-entity values that go stale both when the entity leaves and when the
/// step ends.
#[derive(Debug)]
pub struct TickEntityCache<V> {
    values: IdentityMap<EntityId, V>,
}

impl<V> TickEntityCache<V> {
    pub fn new() -> Self {
        Self {
            values: IdentityMap::default(),
        }
    }

    pub fn get_or_insert_with(&mut self, entity: EntityId, compute: impl FnOnce() -> V) -> &V {
        self.values.entry(entity).or_insert_with(compute)
    }

    pub fn get(&self, entity: EntityId) -> Option<&V> {
        self.values.get(&entity)
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<V> {
        self.values.remove(&entity)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<V> Default for TickEntityCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EntityRemovedListener for TickEntityCache<V> {
    fn on_entity_removed(&mut self, entity: EntityId) {
        self.values.remove(&entity);
    }
}

impl<V> TickBoundaryListener for TickEntityCache<V> {
    fn on_tick_boundary(&mut self) {
        self.values.clear();
    }
}
