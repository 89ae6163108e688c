//! Composite cache keys.
//!
//! These are small `Copy` structs compared and hashed over all of their
//! fields. They hash through `FxHasher` since the pass-through identity hash
//! would only see the last field written.

use std::hash::Hash;

use super::EntityId;

pub use rustc_hash::FxHashMap;

/// Directional relation between two entities.
///
/// `(a, b)` and `(b, a)` are distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub subject: EntityId,
    pub related: EntityId,
}

impl RelationKey {
    pub const fn new(subject: EntityId, related: EntityId) -> Self {
        Self { subject, related }
    }

    /// The same relation seen from the other side.
    pub const fn reversed(self) -> Self {
        Self {
            subject: self.related,
            related: self.subject,
        }
    }
}

/// Fieldless enum usable as the tag half of a [`TaggedKey`].
pub trait CacheTag: Copy + Eq + Hash + 'static {
    /// Every variant, so entries for one entity can be purged tag by tag.
    const ALL: &'static [Self];
}

/// Entity identity paired with an enum tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaggedKey<T: CacheTag> {
    pub id: EntityId,
    pub tag: T,
}

impl<T: CacheTag> TaggedKey<T> {
    pub const fn new(id: EntityId, tag: T) -> Self {
        Self { id, tag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Side {
        Left,
        Right,
    }

    impl CacheTag for Side {
        const ALL: &'static [Self] = &[Side::Left, Side::Right];
    }

    #[test]
    fn test_relation_key_is_directional() {
        let forward = RelationKey::new(EntityId::new(1), EntityId::new(2));

        assert_ne!(forward, forward.reversed());
        assert_eq!(forward, forward.reversed().reversed());
    }

    #[test]
    fn test_tagged_key_structural_equality() {
        let mut map: FxHashMap<TaggedKey<Side>, u8> = FxHashMap::default();
        map.insert(TaggedKey::new(EntityId::new(3), Side::Left), 1);
        map.insert(TaggedKey::new(EntityId::new(3), Side::Right), 2);

        assert_eq!(map.len(), 2);
        assert_eq!(map[&TaggedKey::new(EntityId::new(3), Side::Right)], 2);
        assert_eq!(Side::ALL.len(), 2);
    }
}
