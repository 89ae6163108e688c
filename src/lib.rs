//! Worldcache - caching and invalidation for simulated entity graphs.
//!
//! Game systems ask the same questions many times per tick: which items in
//! this region need hauling, which relations does this pawn have. The
//! caches here remember the answers and drop them when the world changes.
//!
//! ## Architecture
//!
//! - `identity` - typed entity ids, identity hashing, composite keys
//! - `cache` - bounded LRU, scoped multi-cache, named registries
//! - `events` - invalidation event bus and listener traits
//! - `services` - domain caches built on the primitives
//! - `session` - per-simulation ownership of every cache
//! - `sim` - synthetic world and driver
//! - `config` - environment configuration
//! - `error` - error types

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod services;
pub mod session;
pub mod sim;
