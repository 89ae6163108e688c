//! Component lookups served from caches.

use super::EntityKeyedCache;
use crate::events::SpatialItemRemovedListener;
use crate::identity::EntityId;
use crate::sim::{Component, ComponentKind, Quality, World};

/// Where a thing keeps its component of one kind.
///
/// Finding a component means scanning the thing's component list. The slot
/// never moves while the thing exists, so it is looked up once and the
/// current state is read through it. Things without the component are
/// cached as `None`.
#[derive(Debug)]
pub struct ThingComponentCache {
    kind: ComponentKind,
    slots: EntityKeyedCache<Option<usize>>,
}

impl ThingComponentCache {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            slots: EntityKeyedCache::new(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn try_get(&mut self, thing: EntityId, world: &World) -> Option<Component> {
        let kind = self.kind;
        let slot = *self
            .slots
            .get_or_insert_with(thing, || world.find_component(thing, kind));
        world.component_at(thing, slot?)
    }

    pub fn remove(&mut self, thing: EntityId) {
        self.slots.remove(thing);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Answers the component questions work planning asks about buildings and
/// items.
#[derive(Debug)]
pub struct ThingComponentService {
    quality: ThingComponentCache,
    power_switch: ThingComponentCache,
    schedule: ThingComponentCache,
    breakdown: ThingComponentCache,
}

impl ThingComponentService {
    pub fn new() -> Self {
        Self {
            quality: ThingComponentCache::new(ComponentKind::Quality),
            power_switch: ThingComponentCache::new(ComponentKind::PowerSwitch),
            schedule: ThingComponentCache::new(ComponentKind::Schedule),
            breakdown: ThingComponentCache::new(ComponentKind::Breakdown),
        }
    }

    /// Quality of `thing`, or `None` if it has no quality at all.
    pub fn quality_of(&mut self, thing: EntityId, world: &World) -> Option<Quality> {
        match self.quality.try_get(thing, world) {
            Some(Component::Quality(quality)) => Some(quality),
            _ => None,
        }
    }

    /// Switched on and allowed by its schedule. Missing components allow.
    pub fn wants_to_be_on(&mut self, thing: EntityId, world: &World) -> bool {
        let switch = self.power_switch.try_get(thing, world);
        if let Some(Component::PowerSwitch { on: false }) = switch {
            return false;
        }
        !matches!(
            self.schedule.try_get(thing, world),
            Some(Component::Schedule { allowed: false })
        )
    }

    pub fn is_broken_down(&mut self, thing: EntityId, world: &World) -> bool {
        matches!(
            self.breakdown.try_get(thing, world),
            Some(Component::Breakdown { broken: true })
        )
    }

    /// Forget every cached slot of `thing`.
    pub fn forget(&mut self, thing: EntityId) {
        for cache in self.caches_mut() {
            cache.remove(thing);
        }
    }

    /// Cached lookups across all component kinds.
    pub fn len(&self) -> usize {
        self.quality.len() + self.power_switch.len() + self.schedule.len() + self.breakdown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        for cache in self.caches_mut() {
            cache.clear();
        }
    }

    fn caches_mut(&mut self) -> [&mut ThingComponentCache; 4] {
        [
            &mut self.quality,
            &mut self.power_switch,
            &mut self.schedule,
            &mut self.breakdown,
        ]
    }
}

impl Default for ThingComponentService {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialItemRemovedListener for ThingComponentService {
    fn on_spatial_item_removed(&mut self, item: EntityId) {
        self.forget(item);
    }
}
