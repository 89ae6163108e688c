//! Named cache registry - lazily created caches sharing one machinery.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use super::{CacheHandle, ScopeResolver, ScopedCacheStats, ScopedMultiCache};
use crate::events::{EntityRemovedListener, SpatialItemRemovedListener};
use crate::identity::{EntityId, Identified, IdentityKey};

type Factory<C> = Box<dyn Fn(&str) -> C>;

/// Registry of named cache instances of one cache type.
///
/// Independent consumers ask for a cache by name and get the same instance
/// back every time. Instances live as long as the registry; they are never
/// dropped one by one, only cleared together.
///
/// Bulk operations visit every registered cache, so this is meant for tens
/// of names, not thousands.
///
/// ## Example
///
/// ```rust
/// use worldcache::cache::{NamedCacheRegistry, ScopedMultiCache};
/// use worldcache::identity::{EntityId, Identified, RegionId};
///
/// struct Crate(u32);
///
/// impl Identified for Crate {
///     type Key = EntityId;
///     fn id(&self) -> EntityId {
///         EntityId::new(self.0)
///     }
/// }
///
/// let mut registry: NamedCacheRegistry<ScopedMultiCache<RegionId, Crate>> =
///     NamedCacheRegistry::with_default("region");
///
/// let haulables = registry.get_or_create("haulable-items");
/// haulables.write(|cache| cache.insert_into(Crate(1), RegionId::new(7)));
///
/// // Later, retrieve the same cache
/// let again = registry.get_or_create("haulable-items");
/// assert!(again.same_cache(&haulables));
/// ```
pub struct NamedCacheRegistry<C> {
    kind: &'static str,
    caches: IndexMap<String, CacheHandle<C>>,
    factory: Factory<C>,
}

impl<C> NamedCacheRegistry<C> {
    /// Create an empty registry building new caches with `factory`.
    ///
    /// `kind` only labels log lines.
    pub fn new(kind: &'static str, factory: impl Fn(&str) -> C + 'static) -> Self {
        debug!(kind, "Cache registry initialized");
        Self {
            kind,
            caches: IndexMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Get an existing cache by name.
    ///
    /// Returns `None` if the cache doesn't exist.
    pub fn get(&self, name: &str) -> Option<CacheHandle<C>> {
        self.caches.get(name).cloned()
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    ///
    /// This is the recommended way for consumers to obtain caches.
    pub fn get_or_create(&mut self, name: &str) -> CacheHandle<C> {
        if let Some(cache) = self.caches.get(name) {
            return cache.clone();
        }

        debug!(kind = self.kind, name, "Creating cache");
        let cache = CacheHandle::new(name, (self.factory)(name));
        self.caches.insert(name.to_string(), cache.clone());
        cache
    }

    /// Check if a cache with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Get the number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Names of all registered caches, in creation order.
    pub fn cache_names(&self) -> Vec<&str> {
        self.caches.keys().map(String::as_str).collect()
    }

    /// Run `f` against every registered cache, in creation order.
    pub fn for_each(&self, mut f: impl FnMut(&str, &mut C)) {
        for (name, cache) in &self.caches {
            cache.write(|c| f(name, c));
        }
    }
}

impl<C: Default + 'static> NamedCacheRegistry<C> {
    /// Registry whose caches start out as `C::default()`.
    pub fn with_default(kind: &'static str) -> Self {
        Self::new(kind, |_| C::default())
    }
}

impl<S, I> NamedCacheRegistry<ScopedMultiCache<S, I>>
where
    S: IdentityKey,
    I: Identified,
{
    /// Stop tracking `key` in every cache.
    pub fn remove_item(&self, key: I::Key) {
        self.for_each(|_, cache| {
            cache.remove(key);
        });
    }

    /// Drop `scope` from every cache.
    pub fn remove_scope(&self, scope: S) -> usize {
        let mut removed = 0;
        self.for_each(|_, cache| removed += cache.remove_scope(scope));
        if removed > 0 {
            debug!(kind = self.kind, ?scope, removed, "Removed scope from caches");
        }
        removed
    }

    /// Re-resolve the scope of `key` in every cache that tracks it.
    pub fn relocate_item<R>(&self, key: I::Key, resolver: &R)
    where
        R: ScopeResolver<I, S> + ?Sized,
    {
        self.for_each(|_, cache| {
            cache.relocate(key, resolver);
        });
    }

    /// Empty every cache. Handles held by consumers stay valid.
    pub fn clear(&self) {
        self.for_each(|_, cache| cache.clear());
    }

    pub fn stats(&self) -> BTreeMap<String, ScopedCacheStats> {
        let mut stats = BTreeMap::new();
        self.for_each(|name, cache| {
            stats.insert(name.to_string(), cache.stats());
        });
        stats
    }
}

impl<S, I> SpatialItemRemovedListener for NamedCacheRegistry<ScopedMultiCache<S, I>>
where
    S: IdentityKey,
    I: Identified<Key = EntityId>,
{
    fn on_spatial_item_removed(&mut self, item: EntityId) {
        self.remove_item(item);
    }
}

impl<S, I> EntityRemovedListener for NamedCacheRegistry<ScopedMultiCache<S, I>>
where
    S: IdentityKey,
    I: Identified<Key = EntityId>,
{
    fn on_entity_removed(&mut self, entity: EntityId) {
        self.remove_item(entity);
    }
}

impl<C> fmt::Debug for NamedCacheRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCacheRegistry")
            .field("kind", &self.kind)
            .field("cache_count", &self.caches.len())
            .field("cache_names", &self.caches.keys().collect::<Vec<_>>())
            .finish()
    }
}
