//! Listener traits for invalidation events.

use std::cell::RefCell;
use std::rc::Rc;

use crate::identity::EntityId;

/// Shared, single-threaded ownership of a listener.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value for registration on the bus.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Notified when an entity leaves the simulation for good (it died, or it
/// changed allegiance and is no longer tracked).
///
/// Caches keyed by the entity's identity must purge every entry for it.
pub trait EntityRemovedListener {
    fn on_entity_removed(&mut self, entity: EntityId);
}

/// Notified when an item leaves its spatial container (despawns).
///
/// Distinct from [`EntityRemovedListener`]: plain objects and resources
/// despawn too.
pub trait SpatialItemRemovedListener {
    fn on_spatial_item_removed(&mut self, item: EntityId);
}

/// Notified at the start of each simulation step.
///
/// Caches whose entries are only valid within one step clear themselves.
pub trait TickBoundaryListener {
    fn on_tick_boundary(&mut self);
}
