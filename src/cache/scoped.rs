//! Scope-partitioned item cache with a reverse index.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

use crate::identity::{Identified, IdentityBuildHasher, IdentityKey, IdentityMap, IdentitySet};

/// Resolves the scope an item currently belongs to.
///
/// Resolution may fail, e.g. while the spatial structure for the item's
/// location is still being built. A failed resolution leaves the item
/// untracked.
pub trait ScopeResolver<I, S> {
    fn resolve_scope(&self, item: &I) -> Option<S>;
}

impl<I, S, F> ScopeResolver<I, S> for F
where
    F: Fn(&I) -> Option<S>,
{
    fn resolve_scope(&self, item: &I) -> Option<S> {
        self(item)
    }
}

type ScopeSet<K, I> = IndexMap<K, I, IdentityBuildHasher>;

/// Size counters for one scoped cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScopedCacheStats {
    pub scopes: usize,
    pub items: usize,
}

/// Cache grouping items into scopes (maps, regions, ...).
///
/// Two structures are kept in lockstep:
/// - scope -> items in that scope, in insertion order
/// - item key -> its scope (the reverse index)
///
/// An item is in at most one scope, and it is in a scope's set iff the
/// reverse index maps it to that scope. An item missing from the reverse
/// index is untracked. Empty scope sets are dropped as soon as they empty.
///
/// Every operation is total: unknown keys and scopes are no-ops or empty
/// results.
pub struct ScopedMultiCache<S, I: Identified> {
    items_by_scope: IdentityMap<S, ScopeSet<I::Key, I>>,
    scope_by_item: IdentityMap<I::Key, S>,
}

impl<S, I> ScopedMultiCache<S, I>
where
    S: IdentityKey,
    I: Identified,
{
    pub fn new() -> Self {
        Self {
            items_by_scope: IdentityMap::default(),
            scope_by_item: IdentityMap::default(),
        }
    }

    /// Start tracking `item` under the scope `resolver` assigns it.
    ///
    /// Already-tracked items keep their current scope (moving an item is
    /// [`relocate`](Self::relocate)). Returns whether the item was added.
    pub fn add<R>(&mut self, item: I, resolver: &R) -> bool
    where
        R: ScopeResolver<I, S> + ?Sized,
    {
        if self.scope_by_item.contains_key(&item.id()) {
            return false;
        }
        match resolver.resolve_scope(&item) {
            Some(scope) => self.insert_into(item, scope),
            None => false,
        }
    }

    /// Start tracking `item` under a scope the caller already knows.
    ///
    /// Same first-writer-wins rule as [`add`](Self::add).
    pub fn insert_into(&mut self, item: I, scope: S) -> bool {
        let key = item.id();
        if self.scope_by_item.contains_key(&key) {
            return false;
        }
        self.items_by_scope
            .entry(scope)
            .or_default()
            .insert(key, item);
        self.scope_by_item.insert(key, scope);
        true
    }

    /// Items currently tracked under `scope`, in insertion order.
    pub fn items_in_scope(&self, scope: S) -> impl Iterator<Item = &I> + '_ {
        self.items_by_scope
            .get(&scope)
            .into_iter()
            .flat_map(|set| set.values())
    }

    pub fn scope_len(&self, scope: S) -> usize {
        self.items_by_scope.get(&scope).map_or(0, |set| set.len())
    }

    /// Re-resolve the scope of a tracked item and move it there.
    ///
    /// The resolver sees the stored item, so it must consult the current
    /// state of the world rather than fields captured in the item. If the
    /// new scope cannot be resolved the item ends up untracked. Untracked
    /// keys are a no-op. Returns the item's scope afterwards.
    pub fn relocate<R>(&mut self, key: I::Key, resolver: &R) -> Option<S>
    where
        R: ScopeResolver<I, S> + ?Sized,
    {
        let old_scope = *self.scope_by_item.get(&key)?;
        let item = self.remove(key)?;

        match resolver.resolve_scope(&item) {
            Some(scope) => {
                if scope != old_scope {
                    trace!(?key, from = ?old_scope, to = ?scope, "relocated cached item");
                }
                self.insert_into(item, scope);
                Some(scope)
            }
            None => {
                trace!(?key, from = ?old_scope, "item left every resolvable scope");
                None
            }
        }
    }

    /// Stop tracking `key`. No-op if it is not tracked.
    pub fn remove(&mut self, key: I::Key) -> Option<I> {
        let scope = self.scope_by_item.remove(&key)?;
        let set = self.items_by_scope.get_mut(&scope)?;
        let item = set.shift_remove(&key);
        if set.is_empty() {
            self.items_by_scope.remove(&scope);
        }
        item
    }

    /// Every scope that holds at least one item.
    pub fn scopes(&self) -> IdentitySet<S> {
        self.items_by_scope.keys().copied().collect()
    }

    /// Drop a scope and stop tracking everything in it.
    ///
    /// Used when the scope itself (a region, a map) goes away. Returns how
    /// many items were dropped.
    pub fn remove_scope(&mut self, scope: S) -> usize {
        let Some(set) = self.items_by_scope.remove(&scope) else {
            return 0;
        };
        for key in set.keys() {
            self.scope_by_item.remove(key);
        }
        set.len()
    }

    pub fn scope_of(&self, key: I::Key) -> Option<S> {
        self.scope_by_item.get(&key).copied()
    }

    pub fn contains(&self, key: I::Key) -> bool {
        self.scope_by_item.contains_key(&key)
    }

    pub fn get(&self, key: I::Key) -> Option<&I> {
        let scope = self.scope_by_item.get(&key)?;
        self.items_by_scope.get(scope)?.get(&key)
    }

    /// Number of tracked items across all scopes.
    pub fn len(&self) -> usize {
        self.scope_by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope_by_item.is_empty()
    }

    pub fn clear(&mut self) {
        self.items_by_scope.clear();
        self.scope_by_item.clear();
    }

    pub fn stats(&self) -> ScopedCacheStats {
        ScopedCacheStats {
            scopes: self.items_by_scope.len(),
            items: self.scope_by_item.len(),
        }
    }
}

impl<S, I> Default for ScopedMultiCache<S, I>
where
    S: IdentityKey,
    I: Identified,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, I> fmt::Debug for ScopedMultiCache<S, I>
where
    S: IdentityKey,
    I: Identified,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedMultiCache")
            .field("scopes", &self.items_by_scope.len())
            .field("items", &self.scope_by_item.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::identity::{EntityId, RegionId};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Item(u32);

    impl Identified for Item {
        type Key = EntityId;

        fn id(&self) -> EntityId {
            EntityId::new(self.0)
        }
    }

    /// Resolver backed by a mutable item -> region table.
    #[derive(Default)]
    struct Placement(RefCell<HashMap<u32, RegionId>>);

    impl Placement {
        fn place(&self, item: u32, region: u32) {
            self.0.borrow_mut().insert(item, RegionId::new(region));
        }

        fn unplace(&self, item: u32) {
            self.0.borrow_mut().remove(&item);
        }
    }

    impl ScopeResolver<Item, RegionId> for Placement {
        fn resolve_scope(&self, item: &Item) -> Option<RegionId> {
            self.0.borrow().get(&item.0).copied()
        }
    }

    impl ScopedMultiCache<RegionId, Item> {
        fn assert_consistent(&self) {
            let mut seen = 0;
            for (scope, set) in &self.items_by_scope {
                assert!(!set.is_empty(), "empty scope {scope:?} left behind");
                for key in set.keys() {
                    assert_eq!(self.scope_by_item.get(key), Some(scope));
                    seen += 1;
                }
            }
            assert_eq!(seen, self.scope_by_item.len());
        }
    }

    fn ids(cache: &ScopedMultiCache<RegionId, Item>, region: u32) -> Vec<u32> {
        cache.items_in_scope(RegionId::new(region)).map(|item| item.0).collect()
    }

    #[test]
    fn test_relocate_moves_between_regions() {
        let world = Placement::default();
        let mut cache = ScopedMultiCache::new();
        world.place(42, 7);
        assert!(cache.add(Item(42), &world));

        world.place(42, 9);
        assert_eq!(cache.relocate(EntityId::new(42), &world), Some(RegionId::new(9)));

        assert!(ids(&cache, 7).is_empty());
        assert!(!cache.scopes().contains(&RegionId::new(7)));
        assert_eq!(ids(&cache, 9), vec![42]);
        cache.assert_consistent();
    }

    #[test]
    fn test_add_is_first_writer_wins() {
        let world = Placement::default();
        let mut cache = ScopedMultiCache::new();
        world.place(1, 7);
        cache.add(Item(1), &world);

        world.place(1, 9);
        assert!(!cache.add(Item(1), &world));

        assert_eq!(cache.scope_of(EntityId::new(1)), Some(RegionId::new(7)));
        assert_eq!(ids(&cache, 9), Vec::<u32>::new());
    }

    #[test]
    fn test_unresolved_scope_is_not_tracked() {
        let world = Placement::default();
        let mut cache = ScopedMultiCache::new();

        assert!(!cache.add(Item(5), &world));
        assert!(!cache.contains(EntityId::new(5)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_relocate_untracked_is_noop() {
        let world = Placement::default();
        let mut cache = ScopedMultiCache::<RegionId, Item>::new();
        world.place(3, 1);

        assert_eq!(cache.relocate(EntityId::new(3), &world), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_relocate_to_same_region_keeps_single_entry() {
        let world = Placement::default();
        let mut cache = ScopedMultiCache::new();
        world.place(1, 4);
        world.place(2, 4);
        cache.add(Item(1), &world);
        cache.add(Item(2), &world);

        cache.relocate(EntityId::new(1), &world);

        assert_eq!(ids(&cache, 4).iter().filter(|id| **id == 1).count(), 1);
        assert_eq!(cache.len(), 2);
        cache.assert_consistent();
    }

    #[test]
    fn test_relocate_to_unresolvable_drops_item() {
        let world = Placement::default();
        let mut cache = ScopedMultiCache::new();
        world.place(1, 4);
        cache.add(Item(1), &world);

        world.unplace(1);
        assert_eq!(cache.relocate(EntityId::new(1), &world), None);

        assert!(!cache.contains(EntityId::new(1)));
        assert!(cache.scopes().is_empty());
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let mut cache = ScopedMultiCache::new();
        for id in [5, 3, 9, 1] {
            cache.insert_into(Item(id), RegionId::new(2));
        }
        cache.remove(EntityId::new(3));

        assert_eq!(ids(&cache, 2), vec![5, 9, 1]);
        assert_eq!(cache.get(EntityId::new(9)), Some(&Item(9)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cache = ScopedMultiCache::new();
        cache.insert_into(Item(1), RegionId::new(1));

        assert_eq!(cache.remove(EntityId::new(1)), Some(Item(1)));
        assert_eq!(cache.remove(EntityId::new(1)), None);
        assert!(cache.scopes().is_empty());
        cache.assert_consistent();
    }

    #[test]
    fn test_remove_scope_clears_reverse_index() {
        let mut cache = ScopedMultiCache::new();
        cache.insert_into(Item(1), RegionId::new(1));
        cache.insert_into(Item(2), RegionId::new(1));
        cache.insert_into(Item(3), RegionId::new(2));

        assert_eq!(cache.remove_scope(RegionId::new(1)), 2);
        assert_eq!(cache.remove_scope(RegionId::new(1)), 0);

        assert!(!cache.contains(EntityId::new(1)));
        assert!(!cache.contains(EntityId::new(2)));
        assert!(cache.contains(EntityId::new(3)));
        assert_eq!(cache.scopes().len(), 1);
        assert_eq!(cache.stats(), ScopedCacheStats { scopes: 1, items: 1 });
        cache.assert_consistent();
    }

    #[test]
    fn test_unknown_scope_is_empty() {
        let cache = ScopedMultiCache::<RegionId, Item>::new();

        assert_eq!(cache.items_in_scope(RegionId::new(99)).count(), 0);
        assert_eq!(cache.scope_len(RegionId::new(99)), 0);
    }

    #[test]
    fn test_closure_resolver() {
        let mut cache = ScopedMultiCache::new();
        let resolver = |item: &Item| (item.0 % 2 == 0).then(|| RegionId::new(item.0 / 10));

        assert!(cache.add(Item(42), &resolver));
        assert!(!cache.add(Item(43), &resolver));
        assert_eq!(cache.scope_of(EntityId::new(42)), Some(RegionId::new(4)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32, Option<u32>),
        Move(u32, Option<u32>),
        Remove(u32),
        RemoveScope(u32),
    }

    fn region() -> impl Strategy<Value = Option<u32>> {
        prop::option::weighted(0.85, 0u32..4)
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..12, region()).prop_map(|(i, r)| Op::Add(i, r)),
            (0u32..12, region()).prop_map(|(i, r)| Op::Move(i, r)),
            (0u32..12).prop_map(Op::Remove),
            (0u32..4).prop_map(Op::RemoveScope),
        ]
    }

    proptest! {
        #[test]
        fn prop_reverse_index_matches_sets(ops in prop::collection::vec(op(), 0..150)) {
            let world = Placement::default();
            let mut cache = ScopedMultiCache::new();

            for op in ops {
                match op {
                    Op::Add(item, region) => {
                        match region {
                            Some(r) => world.place(item, r),
                            None => world.unplace(item),
                        }
                        cache.add(Item(item), &world);
                    }
                    Op::Move(item, region) => {
                        match region {
                            Some(r) => world.place(item, r),
                            None => world.unplace(item),
                        }
                        let was_tracked = cache.contains(EntityId::new(item));
                        let scope = cache.relocate(EntityId::new(item), &world);
                        if was_tracked {
                            prop_assert_eq!(scope, region.map(RegionId::new));
                        } else {
                            prop_assert_eq!(scope, None);
                        }
                    }
                    Op::Remove(item) => {
                        cache.remove(EntityId::new(item));
                        prop_assert!(!cache.contains(EntityId::new(item)));
                    }
                    Op::RemoveScope(region) => {
                        let before: Vec<u32> = ids(&cache, region);
                        cache.remove_scope(RegionId::new(region));
                        for item in before {
                            prop_assert!(!cache.contains(EntityId::new(item)));
                        }
                        prop_assert!(!cache.scopes().contains(&RegionId::new(region)));
                    }
                }
                cache.assert_consistent();
            }
        }
    }
}
