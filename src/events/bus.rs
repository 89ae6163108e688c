//! Synchronous fan-out of invalidation events.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, trace};

use super::listener::{EntityRemovedListener, SpatialItemRemovedListener, TickBoundaryListener};
use crate::identity::EntityId;

type Listeners<L> = Vec<Rc<RefCell<L>>>;

/// Number of listeners registered per event kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListenerCounts {
    pub entity_removed: usize,
    pub spatial_item_removed: usize,
    pub tick_boundary: usize,
}

/// Dispatches invalidation events to every registered listener.
///
/// Listener lists are fixed when the bus is built. Each `notify_*` call
/// invokes its listeners in registration order and returns only after all
/// of them ran. Listeners must not rely on each other's order, and must not
/// notify the bus again from inside a callback.
pub struct EventBus {
    entity_removed: Listeners<dyn EntityRemovedListener>,
    spatial_item_removed: Listeners<dyn SpatialItemRemovedListener>,
    tick_boundary: Listeners<dyn TickBoundaryListener>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// An entity was deregistered from the simulation.
    pub fn notify_entity_removed(&self, entity: EntityId) {
        trace!(%entity, listeners = self.entity_removed.len(), "entity removed");
        for listener in &self.entity_removed {
            listener.borrow_mut().on_entity_removed(entity);
        }
    }

    /// An item despawned from its spatial container.
    pub fn notify_spatial_item_removed(&self, item: EntityId) {
        trace!(%item, listeners = self.spatial_item_removed.len(), "spatial item removed");
        for listener in &self.spatial_item_removed {
            listener.borrow_mut().on_spatial_item_removed(item);
        }
    }

    /// A new simulation step is starting.
    pub fn notify_tick_boundary(&self) {
        for listener in &self.tick_boundary {
            listener.borrow_mut().on_tick_boundary();
        }
    }

    pub fn listener_counts(&self) -> ListenerCounts {
        ListenerCounts {
            entity_removed: self.entity_removed.len(),
            spatial_item_removed: self.spatial_item_removed.len(),
            tick_boundary: self.tick_boundary.len(),
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_counts())
            .finish()
    }
}

/// Collects listeners before the bus is frozen.
#[derive(Default)]
pub struct EventBusBuilder {
    entity_removed: Listeners<dyn EntityRemovedListener>,
    spatial_item_removed: Listeners<dyn SpatialItemRemovedListener>,
    tick_boundary: Listeners<dyn TickBoundaryListener>,
}

impl EventBusBuilder {
    #[must_use]
    pub fn on_entity_removed<L>(mut self, listener: Rc<RefCell<L>>) -> Self
    where
        L: EntityRemovedListener + 'static,
    {
        self.entity_removed.push(listener);
        self
    }

    #[must_use]
    pub fn on_spatial_item_removed<L>(mut self, listener: Rc<RefCell<L>>) -> Self
    where
        L: SpatialItemRemovedListener + 'static,
    {
        self.spatial_item_removed.push(listener);
        self
    }

    #[must_use]
    pub fn on_tick_boundary<L>(mut self, listener: Rc<RefCell<L>>) -> Self
    where
        L: TickBoundaryListener + 'static,
    {
        self.tick_boundary.push(listener);
        self
    }

    pub fn build(self) -> EventBus {
        let bus = EventBus {
            entity_removed: self.entity_removed,
            spatial_item_removed: self.spatial_item_removed,
            tick_boundary: self.tick_boundary,
        };
        debug!(listeners = ?bus.listener_counts(), "Event bus built");
        bus
    }
}
