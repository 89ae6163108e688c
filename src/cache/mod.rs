//! Cache module - generic cache primitives.
//!
//! ## Architecture
//!
//! - `BoundedLruCache` - fixed-capacity cache evicting the least recently
//!   used key
//! - `ScopedMultiCache` - items grouped by scope (map, region) with a reverse
//!   index for O(1) lookup of an item's scope
//! - `NamedCacheRegistry` - lazily creates and keeps named instances of one
//!   cache type, and fans bulk invalidation out to all of them
//! - `CacheHandle` - shared handle consumers hold onto
//!
//! ## Usage
//!
//! ```rust
//! use worldcache::cache::BoundedLruCache;
//!
//! let mut cache = BoundedLruCache::new(3);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! cache.put(3, "c");
//! cache.get(&1);
//! cache.put(4, "d");
//!
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.get(&1), Some(&"a"));
//! ```

mod config;
mod handle;
mod lru;
mod registry;
mod scoped;

pub use config::CacheConfig;
pub use handle::CacheHandle;
pub use lru::{BoundedLruCache, Iter, LruStats};
pub use registry::NamedCacheRegistry;
pub use scoped::{ScopeResolver, ScopedCacheStats, ScopedMultiCache};
