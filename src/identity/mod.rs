//! Identity keys.
//!
//! Every cache in this crate is keyed by plain numeric identities rather than
//! by the domain objects themselves. A key is equal to another key iff their
//! integers are equal, and it hashes to the integer itself (see
//! [`IdentityHasher`]).
//!
//! ## Key types
//!
//! - [`EntityId`] - an entity or item in the simulated world
//! - [`MapId`] - a map (coarse spatial scope)
//! - [`RegionId`] - a region within a map (fine spatial scope)
//!
//! Composite keys built from these live in [`composite`].

mod composite;
mod hasher;

use std::fmt;
use std::hash::Hash;

use serde::Serialize;

pub use composite::{CacheTag, FxHashMap, RelationKey, TaggedKey};
pub use hasher::{IdentityBuildHasher, IdentityHasher, IdentityMap, IdentitySet};

/// A hashable opaque numeric identity.
///
/// Implementors must hash through a single `write_u32`/`write_u64` call so
/// that [`IdentityHasher`] can use the integer as the hash.
pub trait IdentityKey: Copy + Eq + Hash + fmt::Debug {
    /// The raw integer behind this key.
    fn raw(self) -> u64;
}

/// A domain object that carries an identity.
///
/// Caches never compare domain objects directly; they extract the key once
/// and work with it.
pub trait Identified {
    type Key: IdentityKey;

    fn id(&self) -> Self::Key;
}

macro_rules! identity_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl IdentityKey for $name {
            #[inline]
            fn raw(self) -> u64 {
                u64::from(self.0)
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

identity_key!(
    /// Identity of an entity or item, unique within one session.
    EntityId,
    "entity"
);

identity_key!(
    /// Identity of a map.
    MapId,
    "map"
);

identity_key!(
    /// Identity of a region within a map.
    RegionId,
    "region"
);

impl IdentityKey for u32 {
    #[inline]
    fn raw(self) -> u64 {
        u64::from(self)
    }
}

impl IdentityKey for u64 {
    #[inline]
    fn raw(self) -> u64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_compare_by_integer() {
        assert_eq!(EntityId::new(7), EntityId::from(7));
        assert_ne!(EntityId::new(7), EntityId::new(8));
        assert_eq!(RegionId::new(9).raw(), 9);
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(RegionId::new(7).to_string(), "region-7");
        assert_eq!(MapId::new(1).to_string(), "map-1");
        assert_eq!(EntityId::new(42).to_string(), "entity-42");
    }
}
