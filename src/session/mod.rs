//! Session lifecycle.
//!
//! A [`Session`] is bound to one loaded simulation. It owns every cache,
//! both registries and the event bus wiring them together. Nothing outlives
//! it: loading a new simulation drops the old session and builds a fresh one,
//! so no entry from a previous world can leak into the next. Dropping a
//! session also empties every cache, so clones of its handles held elsewhere
//! come back empty instead of serving the old world.

use std::cell::{Ref, RefMut};
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{LruStats, NamedCacheRegistry, ScopedCacheStats};
use crate::config::Config;
use crate::events::{EventBus, ListenerCounts, Shared, shared};
use crate::identity::{EntityId, MapId, RegionId};
use crate::services::{
    ColonyAnimalsService, EntityKeyedCache, GroupMembershipCache, HarvestService, HaulingService,
    ImmunizableCache, InjuryBleedingCache, MapCacheRegistry, RefuelService, RegionCacheRegistry,
    RelationsCache, TaggedEntityCache, ThingComponentService, TickEntityCache, TickScopedCache,
};
use crate::sim::{Affiliation, Area, MapSummary, PlantSpecies, World, WorkKind};

/// Cache names inside the region registry.
pub const HAULABLE_ITEMS: &str = "haulable-items";
pub const HARVESTABLE_PLANTS: &str = "harvestable-plants";

/// Cache names inside the map registry.
pub const REFUELABLE_TURRETS: &str = "refuelable-turrets";
pub const REFUELABLE_NON_TURRETS: &str = "refuelable-non-turrets";
pub const COLONY_ANIMALS: &str = "colony-animals";

/// Point-in-time counters for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub generation: u32,
    pub ticks: u64,
    pub listeners: ListenerCounts,
    pub relations: LruStats,
    pub injury_bleeding: LruStats,
    pub region_caches: BTreeMap<String, ScopedCacheStats>,
    pub map_caches: BTreeMap<String, ScopedCacheStats>,
    pub work_restrictions: usize,
    pub affiliations: usize,
    pub group_members: usize,
    pub component_slots: usize,
    pub area_restrictions: usize,
    pub immunizable_ailments: usize,
}

pub struct Session {
    generation: u32,
    ticks: u64,
    bus: EventBus,
    region_caches: Shared<RegionCacheRegistry>,
    map_caches: Shared<MapCacheRegistry>,
    relations: RelationsCache,
    injury_bleeding: InjuryBleedingCache,
    work_restrictions: Shared<EntityKeyedCache<Vec<WorkKind>>>,
    affiliations: Shared<TaggedEntityCache<Affiliation, Option<EntityId>>>,
    groups: Shared<GroupMembershipCache<EntityId>>,
    map_summaries: Shared<TickScopedCache<MapId, MapSummary>>,
    components: Shared<ThingComponentService>,
    area_restrictions: Shared<TickEntityCache<Option<Area>>>,
    immunizable: ImmunizableCache,
    hauling: HaulingService,
    harvest: HarvestService,
    refuel: RefuelService,
    colony_animals: Shared<ColonyAnimalsService>,
}

impl Session {
    /// Build every cache for a freshly loaded simulation and wire the bus.
    pub fn new(config: &Config) -> Self {
        Self::with_generation(config, 1)
    }

    fn with_generation(config: &Config, generation: u32) -> Self {
        let mut regions: RegionCacheRegistry = NamedCacheRegistry::with_default("region");
        let mut maps: MapCacheRegistry = NamedCacheRegistry::with_default("map");

        let hauling = HaulingService::new(regions.get_or_create(HAULABLE_ITEMS));
        let harvest = HarvestService::new(
            PlantSpecies::CULTIVARS,
            regions.get_or_create(HARVESTABLE_PLANTS),
        );
        let refuel = RefuelService::new(
            maps.get_or_create(REFUELABLE_TURRETS),
            maps.get_or_create(REFUELABLE_NON_TURRETS),
        );
        let colony_animals = shared(ColonyAnimalsService::new(maps.get_or_create(COLONY_ANIMALS)));

        let region_caches = shared(regions);
        let map_caches = shared(maps);
        let work_restrictions = shared(EntityKeyedCache::new());
        let affiliations = shared(TaggedEntityCache::new());
        let groups = shared(GroupMembershipCache::new());
        let map_summaries = shared(TickScopedCache::new());
        let components = shared(ThingComponentService::new());
        let area_restrictions = shared(TickEntityCache::new());

        let bus = EventBus::builder()
            .on_spatial_item_removed(region_caches.clone())
            .on_spatial_item_removed(map_caches.clone())
            .on_spatial_item_removed(components.clone())
            .on_entity_removed(region_caches.clone())
            .on_entity_removed(map_caches.clone())
            .on_entity_removed(colony_animals.clone())
            .on_entity_removed(work_restrictions.clone())
            .on_entity_removed(affiliations.clone())
            .on_entity_removed(groups.clone())
            .on_entity_removed(area_restrictions.clone())
            .on_tick_boundary(map_summaries.clone())
            .on_tick_boundary(area_restrictions.clone())
            .build();

        info!(generation, "Session created");

        Self {
            generation,
            ticks: 0,
            bus,
            region_caches,
            map_caches,
            relations: RelationsCache::new(config.relations_cache),
            injury_bleeding: InjuryBleedingCache::new(config.injury_cache),
            work_restrictions,
            affiliations,
            groups,
            map_summaries,
            components,
            area_restrictions,
            immunizable: ImmunizableCache::from_known_ailments(),
            hauling,
            harvest,
            refuel,
            colony_animals,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// An entity left the simulation for good.
    pub fn entity_removed(&self, entity: EntityId) {
        self.bus.notify_entity_removed(entity);
    }

    /// A positioned item stopped existing in the world.
    pub fn spatial_item_removed(&self, item: EntityId) {
        self.bus.notify_spatial_item_removed(item);
    }

    /// A new step is about to run; drops every per-tick value.
    pub fn tick_started(&mut self) {
        self.ticks += 1;
        self.bus.notify_tick_boundary();
    }

    /// Re-resolve the region of a tracked item after it moved.
    pub fn item_moved(&self, item: EntityId, world: &World) {
        self.region_caches.borrow().relocate_item(item, world);
    }

    /// A map was unloaded. Drops its scope from the map caches and every one
    /// of `regions` from the region caches.
    pub fn map_removed(&self, map: MapId, regions: &[RegionId]) -> usize {
        let mut removed = self.map_caches.borrow().remove_scope(map);
        let region_caches = self.region_caches.borrow();
        for &region in regions {
            removed += region_caches.remove_scope(region);
        }
        debug!(%map, removed, "Map caches dropped");
        removed
    }

    /// A region was rebuilt or destroyed.
    pub fn region_removed(&self, region: RegionId) -> usize {
        self.region_caches.borrow().remove_scope(region)
    }

    pub fn hauling(&self) -> &HaulingService {
        &self.hauling
    }

    pub fn harvest(&self) -> &HarvestService {
        &self.harvest
    }

    pub fn refuel(&self) -> &RefuelService {
        &self.refuel
    }

    pub fn colony_animals(&self) -> Ref<'_, ColonyAnimalsService> {
        self.colony_animals.borrow()
    }

    pub fn relations(&mut self) -> &mut RelationsCache {
        &mut self.relations
    }

    pub fn injury_bleeding(&mut self) -> &mut InjuryBleedingCache {
        &mut self.injury_bleeding
    }

    pub fn work_restrictions(&self) -> RefMut<'_, EntityKeyedCache<Vec<WorkKind>>> {
        self.work_restrictions.borrow_mut()
    }

    pub fn affiliations(&self) -> RefMut<'_, TaggedEntityCache<Affiliation, Option<EntityId>>> {
        self.affiliations.borrow_mut()
    }

    pub fn groups(&self) -> RefMut<'_, GroupMembershipCache<EntityId>> {
        self.groups.borrow_mut()
    }

    pub fn map_summaries(&self) -> RefMut<'_, TickScopedCache<MapId, MapSummary>> {
        self.map_summaries.borrow_mut()
    }

    pub fn components(&self) -> RefMut<'_, ThingComponentService> {
        self.components.borrow_mut()
    }

    /// Area `pawn` may move in, computed at most once per step.
    pub fn effective_area_restriction(&self, pawn: EntityId, world: &World) -> Option<Area> {
        *self
            .area_restrictions
            .borrow_mut()
            .get_or_insert_with(pawn, || world.effective_area_restriction(pawn))
    }

    pub fn immunizable(&self) -> &ImmunizableCache {
        &self.immunizable
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            generation: self.generation,
            ticks: self.ticks,
            listeners: self.bus.listener_counts(),
            relations: self.relations.stats(),
            injury_bleeding: self.injury_bleeding.stats(),
            region_caches: self.region_caches.borrow().stats(),
            map_caches: self.map_caches.borrow().stats(),
            work_restrictions: self.work_restrictions.borrow().len(),
            affiliations: self.affiliations.borrow().len(),
            group_members: self.groups.borrow().len(),
            component_slots: self.components.borrow().len(),
            area_restrictions: self.area_restrictions.borrow().len(),
            immunizable_ailments: self.immunizable.len(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.region_caches.borrow().clear();
        self.map_caches.borrow().clear();
        self.relations.clear();
        self.injury_bleeding.clear();
        self.work_restrictions.borrow_mut().clear();
        self.affiliations.borrow_mut().clear();
        self.groups.borrow_mut().clear();
        self.map_summaries.borrow_mut().clear();
        self.components.borrow_mut().clear();
        self.area_restrictions.borrow_mut().clear();
        debug!(generation = self.generation, "Session caches cleared");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generation", &self.generation)
            .field("ticks", &self.ticks)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

/// Holds the session for whatever simulation is currently loaded.
#[derive(Debug)]
pub struct SessionHost {
    config: Config,
    current: Option<Session>,
    generation: u32,
}

impl SessionHost {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            current: None,
            generation: 0,
        }
    }

    /// Tear down the current session, if any, and start a fresh one.
    pub fn load(&mut self) -> &mut Session {
        self.unload();
        self.generation += 1;
        self.current.insert(Session::with_generation(&self.config, self.generation))
    }

    /// Drop the current session. Returns its final stats.
    pub fn unload(&mut self) -> Option<SessionStats> {
        let session = self.current.take()?;
        let stats = session.stats();
        drop(session);
        info!(
            generation = stats.generation,
            ticks = stats.ticks,
            "Session torn down"
        );
        Some(stats)
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.current.as_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
