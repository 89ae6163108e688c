//! Cache for relations between pairs of entities.

use rustc_hash::FxBuildHasher;

use crate::cache::{BoundedLruCache, CacheConfig, LruStats};
use crate::identity::{EntityId, RelationKey};
use crate::sim::{RelationKind, Thing};

/// Bounded cache of the relations `subject` has towards `related`.
///
/// Only humanlike subjects are cached; animals have too few relations to be
/// worth it.
#[derive(Debug)]
pub struct RelationsCache {
    cache: BoundedLruCache<RelationKey, Vec<RelationKind>, FxBuildHasher>,
}

impl RelationsCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: BoundedLruCache::with_hasher(config.capacity, FxBuildHasher),
        }
    }

    pub fn add_relations_between(
        &mut self,
        subject: &Thing,
        related: &Thing,
        relations: Vec<RelationKind>,
    ) {
        if !subject.kind.is_humanlike() {
            return;
        }
        self.cache.put(RelationKey::new(subject.id, related.id), relations);
    }

    pub fn relations_between(
        &mut self,
        subject: EntityId,
        related: EntityId,
    ) -> Option<&[RelationKind]> {
        self.cache
            .get(&RelationKey::new(subject, related))
            .map(Vec::as_slice)
    }

    /// Forget the pair in both directions.
    pub fn clear_relations_between(&mut self, subject: EntityId, other: EntityId) {
        let key = RelationKey::new(subject, other);
        self.cache.remove(&key);
        self.cache.remove(&key.reversed());
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> LruStats {
        self.cache.stats()
    }
}
