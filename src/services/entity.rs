//! Per-entity caches purged when the entity leaves the simulation.

use std::hash::Hash;

use crate::events::EntityRemovedListener;
use crate::identity::{CacheTag, EntityId, FxHashMap, IdentityMap, TaggedKey};

/// One small value per entity, computed on first lookup.
#[derive(Debug)]
pub struct EntityKeyedCache<V> {
    values: IdentityMap<EntityId, V>,
}

impl<V> EntityKeyedCache<V> {
    pub fn new() -> Self {
        Self {
            values: IdentityMap::default(),
        }
    }

    pub fn get(&self, entity: EntityId) -> Option<&V> {
        self.values.get(&entity)
    }

    pub fn get_or_insert_with(&mut self, entity: EntityId, compute: impl FnOnce() -> V) -> &V {
        self.values.entry(entity).or_insert_with(compute)
    }

    pub fn insert(&mut self, entity: EntityId, value: V) {
        self.values.insert(entity, value);
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<V> {
        self.values.remove(&entity)
    }

    /// Drop entries for every entity in `entities`.
    pub fn remove_all(&mut self, entities: impl IntoIterator<Item = EntityId>) {
        for entity in entities {
            self.values.remove(&entity);
        }
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

impl<V> Default for EntityKeyedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EntityRemovedListener for EntityKeyedCache<V> {
    fn on_entity_removed(&mut self, entity: EntityId) {
        self.values.remove(&entity);
    }
}

/// Values keyed by entity and a small enum tag.
#[derive(Debug)]
pub struct TaggedEntityCache<T: CacheTag, V> {
    values: FxHashMap<TaggedKey<T>, V>,
}

impl<T: CacheTag, V> TaggedEntityCache<T, V> {
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }

    pub fn get(&self, entity: EntityId, tag: T) -> Option<&V> {
        self.values.get(&TaggedKey::new(entity, tag))
    }

    pub fn get_or_insert_with(
        &mut self,
        entity: EntityId,
        tag: T,
        compute: impl FnOnce() -> V,
    ) -> &V {
        self.values
            .entry(TaggedKey::new(entity, tag))
            .or_insert_with(compute)
    }

    /// Drop the `tag` entry for each of `entities`.
    pub fn remove_entries(&mut self, tag: T, entities: impl IntoIterator<Item = EntityId>) {
        for entity in entities {
            self.values.remove(&TaggedKey::new(entity, tag));
        }
    }

    /// Drop every tag's entry for `entity`.
    pub fn remove_entity(&mut self, entity: EntityId) {
        for &tag in T::ALL {
            self.values.remove(&TaggedKey::new(entity, tag));
        }
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

impl<T: CacheTag, V> Default for TaggedEntityCache<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CacheTag, V> EntityRemovedListener for TaggedEntityCache<T, V> {
    fn on_entity_removed(&mut self, entity: EntityId) {
        self.remove_entity(entity);
    }
}

/// Which group (squad, caravan, raid party) each member belongs to.
#[derive(Debug)]
pub struct GroupMembershipCache<G> {
    group_by_member: IdentityMap<EntityId, G>,
}

impl<G: Copy + Eq + Hash> GroupMembershipCache<G> {
    pub fn new() -> Self {
        Self {
            group_by_member: IdentityMap::default(),
        }
    }

    /// Map every member to `group`, replacing existing mappings.
    ///
    /// Used when a whole group is loaded or formed at once.
    pub fn map_members(&mut self, members: impl IntoIterator<Item = EntityId>, group: G) {
        for member in members {
            self.group_by_member.insert(member, group);
        }
    }

    /// Map one member to `group` unless it already belongs to a group.
    /// Returns whether the mapping was recorded.
    pub fn map_member(&mut self, member: EntityId, group: G) -> bool {
        if self.group_by_member.contains_key(&member) {
            return false;
        }
        self.group_by_member.insert(member, group);
        true
    }

    pub fn group_of(&self, member: EntityId) -> Option<G> {
        self.group_by_member.get(&member).copied()
    }

    /// Forget `member`'s mapping, but only if it still points at `group`.
    pub fn remove_member(&mut self, member: EntityId, group: G) {
        if self.group_by_member.get(&member) == Some(&group) {
            self.group_by_member.remove(&member);
        }
    }

    /// Forget every member of a disbanded group.
    pub fn remove_group(&mut self, group: G) {
        self.group_by_member.retain(|_, g| *g != group);
    }

    pub fn len(&self) -> usize {
        self.group_by_member.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group_by_member.is_empty()
    }

    pub fn clear(&mut self) {
        self.group_by_member.clear();
    }
}

impl<G: Copy + Eq + Hash> Default for GroupMembershipCache<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Copy + Eq + Hash> EntityRemovedListener for GroupMembershipCache<G> {
    fn on_entity_removed(&mut self, entity: EntityId) {
        self.group_by_member.remove(&entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Affiliation {
        Guest,
        Mercenary,
        Refugee,
    }

    impl CacheTag for Affiliation {
        const ALL: &'static [Self] = &[
            Affiliation::Guest,
            Affiliation::Mercenary,
            Affiliation::Refugee,
        ];
    }

    #[test]
    fn test_entity_cache_computes_once() {
        let mut cache = EntityKeyedCache::new();
        let mut calls = 0;

        cache.get_or_insert_with(EntityId::new(1), || {
            calls += 1;
            vec!["mining"]
        });
        let value = cache.get_or_insert_with(EntityId::new(1), || vec!["never"]);

        assert_eq!(value, &vec!["mining"]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_entity_cache_purged_on_removal() {
        let mut cache = EntityKeyedCache::new();
        cache.insert(EntityId::new(1), 10);
        cache.insert(EntityId::new(2), 20);

        cache.on_entity_removed(EntityId::new(1));
        cache.remove_all([EntityId::new(2), EntityId::new(3)]);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_tagged_cache_removes_every_tag() {
        let mut cache = TaggedEntityCache::new();
        let entity = EntityId::new(4);
        cache.get_or_insert_with(entity, Affiliation::Guest, || Some(EntityId::new(100)));
        cache.get_or_insert_with(entity, Affiliation::Refugee, || None);
        cache.get_or_insert_with(EntityId::new(5), Affiliation::Guest, || None);

        cache.on_entity_removed(entity);

        assert_eq!(cache.get(entity, Affiliation::Guest), None);
        assert_eq!(cache.get(entity, Affiliation::Refugee), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_tagged_cache_caches_absent_values() {
        let mut cache: TaggedEntityCache<Affiliation, Option<EntityId>> = TaggedEntityCache::new();
        cache.get_or_insert_with(EntityId::new(1), Affiliation::Mercenary, || None);

        assert_eq!(cache.get(EntityId::new(1), Affiliation::Mercenary), Some(&None));

        cache.remove_entries(Affiliation::Mercenary, [EntityId::new(1)]);
        assert_eq!(cache.get(EntityId::new(1), Affiliation::Mercenary), None);
    }

    #[test]
    fn test_group_first_mapping_wins() {
        let mut groups = GroupMembershipCache::new();

        assert!(groups.map_member(EntityId::new(1), 10u32));
        assert!(!groups.map_member(EntityId::new(1), 11));
        assert_eq!(groups.group_of(EntityId::new(1)), Some(10));

        groups.map_members([EntityId::new(1), EntityId::new(2)], 11);
        assert_eq!(groups.group_of(EntityId::new(1)), Some(11));
    }

    #[test]
    fn test_group_removal() {
        let mut groups = GroupMembershipCache::new();
        groups.map_members([EntityId::new(1), EntityId::new(2), EntityId::new(3)], 10u32);
        groups.map_member(EntityId::new(4), 20);

        groups.remove_member(EntityId::new(1), 20);
        assert_eq!(groups.group_of(EntityId::new(1)), Some(10));

        groups.remove_member(EntityId::new(1), 10);
        groups.on_entity_removed(EntityId::new(2));
        groups.remove_group(10);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.group_of(EntityId::new(4)), Some(20));
    }
}
