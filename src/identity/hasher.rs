//! Pass-through hasher for identity keys.

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hasher};

/// Hasher that uses the identity integer itself as the hash.
///
/// Only the fixed-width integer writes are pass-through. Anything else falls
/// back to folding the bytes, so a mis-keyed map still works, just slower.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityHasher {
    hash: u64,
}

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash = self.hash.rotate_left(8) ^ u64::from(byte);
        }
    }

    #[inline]
    fn write_u8(&mut self, n: u8) {
        self.hash = u64::from(n);
    }

    #[inline]
    fn write_u16(&mut self, n: u16) {
        self.hash = u64::from(n);
    }

    #[inline]
    fn write_u32(&mut self, n: u32) {
        self.hash = u64::from(n);
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.hash = n;
    }

    #[inline]
    fn write_usize(&mut self, n: usize) {
        self.hash = n as u64;
    }
}

pub type IdentityBuildHasher = BuildHasherDefault<IdentityHasher>;

/// `HashMap` keyed by an identity, hashed by the identity itself.
pub type IdentityMap<K, V> = HashMap<K, V, IdentityBuildHasher>;

/// `HashSet` of identities, hashed by the identity itself.
pub type IdentitySet<K> = HashSet<K, IdentityBuildHasher>;
