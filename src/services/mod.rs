//! Domain caches built on the generic primitives.
//!
//! These decide what is worth caching and what invalidates it. The
//! primitives in [`crate::cache`] stay unaware of any of it.
//!
//! - `relations` - LRU of relations between entity pairs
//! - `bleeding` - LRU of projected bleeding durations per injury
//! - `entity` - per-entity caches purged on entity removal
//! - `components` - component slots per thing, purged on despawn
//! - `immunity` - ailments that develop immunity
//! - `tick` - derived values valid for a single step
//! - `spatial` - region/map scoped work lists

mod bleeding;
mod components;
mod entity;
mod immunity;
mod relations;
mod spatial;
mod tick;

use crate::cache::{NamedCacheRegistry, ScopedMultiCache};
use crate::identity::{MapId, RegionId};
use crate::sim::Thing;

pub use bleeding::{InjuryBleedingCache, stop_bleeding_age};
pub use components::{ThingComponentCache, ThingComponentService};
pub use entity::{EntityKeyedCache, GroupMembershipCache, TaggedEntityCache};
pub use immunity::ImmunizableCache;
pub use relations::RelationsCache;
pub use spatial::{ColonyAnimalsService, HarvestService, HaulingService, RefuelService};
pub use tick::{TickEntityCache, TickScopedCache};

/// Things grouped by the region they stand in.
pub type RegionThingCache = ScopedMultiCache<RegionId, Thing>;

/// Things grouped by the map they are on.
pub type MapThingCache = ScopedMultiCache<MapId, Thing>;

pub type RegionCacheRegistry = NamedCacheRegistry<RegionThingCache>;

pub type MapCacheRegistry = NamedCacheRegistry<MapThingCache>;
