//! Invalidation event system.
//!
//! Caches subscribe to the events that can make their entries stale:
//! 1. Implement one of the listener traits in [`listener`]
//! 2. Register the cache on the [`EventBusBuilder`] when building the session
//! 3. Hosts call the bus's `notify_*` entry points from their lifecycle hooks

mod bus;
mod listener;

pub use bus::{EventBus, EventBusBuilder, ListenerCounts};
pub use listener::{
    EntityRemovedListener, Shared, SpatialItemRemovedListener, TickBoundaryListener, shared,
};
