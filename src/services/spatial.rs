//! Spatially scoped work lists backed by named scoped caches.
//!
//! Each service owns nothing itself: it holds a handle to a named cache in
//! the session's region or map registry and decides what qualifies.

use rustc_hash::FxHashSet;

use super::{MapThingCache, RegionThingCache};
use crate::cache::CacheHandle;
use crate::events::EntityRemovedListener;
use crate::identity::{EntityId, IdentitySet, MapId, RegionId};
use crate::sim::{AnimalProduct, Cell, PlantSpecies, Thing, ThingKind, World};

/// Items waiting to be hauled to storage, by region.
#[derive(Debug, Clone)]
pub struct HaulingService {
    cache: CacheHandle<RegionThingCache>,
}

impl HaulingService {
    pub fn new(cache: CacheHandle<RegionThingCache>) -> Self {
        Self { cache }
    }

    /// Track every haulable on `map`.
    ///
    /// Run once the map's region grid is ready; before that nothing can be
    /// placed and this returns 0.
    pub fn add_all_haulables(&self, world: &World, map: MapId) -> usize {
        self.cache.write(|cache| {
            world
                .things_on(map)
                .into_iter()
                .filter(|thing| thing.kind == ThingKind::Item)
                .filter(|thing| cache.add(*thing, world))
                .count()
        })
    }

    pub fn add_haulable(&self, haulable: Thing, world: &World) -> bool {
        self.cache.write(|cache| cache.add(haulable, world))
    }

    pub fn remove_haulable(&self, haulable: EntityId) {
        self.cache.write(|cache| cache.remove(haulable));
    }

    pub fn regions(&self) -> IdentitySet<RegionId> {
        self.cache.read(|cache| cache.scopes())
    }

    pub fn haulables_in_region(&self, region: RegionId) -> Vec<Thing> {
        self.cache.read(|cache| cache.items_in_scope(region).copied().collect())
    }
}

/// Fully grown plants ready for harvest, by region.
#[derive(Debug, Clone)]
pub struct HarvestService {
    cultivars: FxHashSet<PlantSpecies>,
    cache: CacheHandle<RegionThingCache>,
}

impl HarvestService {
    pub fn new(
        cultivars: impl IntoIterator<Item = PlantSpecies>,
        cache: CacheHandle<RegionThingCache>,
    ) -> Self {
        Self {
            cultivars: cultivars.into_iter().collect(),
            cache,
        }
    }

    /// Track a plant that just finished growing.
    ///
    /// Only sown species and plants inside grow zones are tracked.
    pub fn mark_ready_for_harvest(&self, plant: Thing, world: &World) -> bool {
        let ThingKind::Plant(species) = plant.kind else {
            return false;
        };
        if !self.cultivars.contains(&species) && !world.in_grow_zone(plant.map, plant.cell) {
            return false;
        }
        self.cache.write(|cache| cache.add(plant, world))
    }

    pub fn complete_harvest(&self, plant: EntityId) {
        self.cache.write(|cache| cache.remove(plant));
    }

    pub fn regions(&self) -> IdentitySet<RegionId> {
        self.cache.read(|cache| cache.scopes())
    }

    /// Current cells of the plants tracked in `region`.
    pub fn harvestable_cells_in_region(&self, region: RegionId, world: &World) -> Vec<Cell> {
        self.cache.read(|cache| {
            cache
                .items_in_scope(region)
                .filter_map(|plant| world.thing(plant.id).map(|current| current.cell))
                .collect()
        })
    }
}

/// Buildings that want refueling, per map. Turrets are kept apart since
/// rearming them is a separate job.
#[derive(Debug, Clone)]
pub struct RefuelService {
    turrets: CacheHandle<MapThingCache>,
    non_turrets: CacheHandle<MapThingCache>,
}

impl RefuelService {
    pub fn new(
        turrets: CacheHandle<MapThingCache>,
        non_turrets: CacheHandle<MapThingCache>,
    ) -> Self {
        Self { turrets, non_turrets }
    }

    fn cache_for(&self, kind: ThingKind) -> &CacheHandle<MapThingCache> {
        if kind.is_turret() {
            &self.turrets
        } else {
            &self.non_turrets
        }
    }

    pub fn mark_as_ready_for_refueling(&self, refuelable: Thing) -> bool {
        self.cache_for(refuelable.kind)
            .write(|cache| cache.insert_into(refuelable, refuelable.map))
    }

    pub fn unmark_for_refueling(&self, refuelable: &Thing) {
        self.cache_for(refuelable.kind)
            .write(|cache| cache.remove(refuelable.id));
    }

    pub fn refuelable_turrets(&self, map: MapId) -> Vec<Thing> {
        self.turrets.read(|cache| cache.items_in_scope(map).copied().collect())
    }

    pub fn refuelable_non_turrets(&self, map: MapId) -> Vec<Thing> {
        self.non_turrets.read(|cache| cache.items_in_scope(map).copied().collect())
    }
}

/// Animals whose milk or wool is ready to be gathered, per map.
#[derive(Debug, Clone)]
pub struct ColonyAnimalsService {
    cache: CacheHandle<MapThingCache>,
}

impl ColonyAnimalsService {
    pub fn new(cache: CacheHandle<MapThingCache>) -> Self {
        Self { cache }
    }

    pub fn mark_animal_ready_for_harvest(&self, animal: Thing) -> bool {
        if !matches!(animal.kind, ThingKind::Animal(_)) {
            return false;
        }
        self.cache.write(|cache| cache.insert_into(animal, animal.map))
    }

    pub fn remove_animal(&self, animal: EntityId) {
        self.cache.write(|cache| cache.remove(animal));
    }

    pub fn animals_ready_for(&self, map: MapId, product: AnimalProduct) -> Vec<Thing> {
        self.cache.read(|cache| {
            cache
                .items_in_scope(map)
                .filter(|animal| animal.kind == ThingKind::Animal(product))
                .copied()
                .collect()
        })
    }
}

impl EntityRemovedListener for ColonyAnimalsService {
    fn on_entity_removed(&mut self, entity: EntityId) {
        self.remove_animal(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NamedCacheRegistry;
    use crate::services::{MapCacheRegistry, RegionCacheRegistry};

    struct Fixture {
        world: World,
        map: MapId,
        regions: RegionCacheRegistry,
        maps: MapCacheRegistry,
    }

    fn fixture() -> Fixture {
        let mut world = World::new();
        let map = world.add_map(40, 20, 10);
        world.set_regions_enabled(map, true);
        Fixture {
            world,
            map,
            regions: NamedCacheRegistry::with_default("region"),
            maps: NamedCacheRegistry::with_default("map"),
        }
    }

    #[test]
    fn test_hauling_warms_after_region_grid() {
        let mut fx = fixture();
        let hauling = HaulingService::new(fx.regions.get_or_create("haulable-items"));
        fx.world.set_regions_enabled(fx.map, false);
        fx.world.spawn(fx.map, ThingKind::Item, Cell::new(1, 1));
        fx.world.spawn(fx.map, ThingKind::Item, Cell::new(35, 15));
        fx.world.spawn(fx.map, ThingKind::Turret, Cell::new(2, 2));

        assert_eq!(hauling.add_all_haulables(&fx.world, fx.map), 0);

        fx.world.set_regions_enabled(fx.map, true);
        assert_eq!(hauling.add_all_haulables(&fx.world, fx.map), 2);
        assert_eq!(hauling.regions().len(), 2);
    }

    #[test]
    fn test_hauling_follows_relocation() {
        let mut fx = fixture();
        let hauling = HaulingService::new(fx.regions.get_or_create("haulable-items"));
        let item = fx.world.spawn(fx.map, ThingKind::Item, Cell::new(1, 1)).unwrap();
        hauling.add_haulable(item, &fx.world);
        let start = fx.world.region_at(fx.map, Cell::new(1, 1)).unwrap();

        fx.world.move_to(item.id, Cell::new(15, 1));
        fx.regions.relocate_item(item.id, &fx.world);

        let end = fx.world.region_at(fx.map, Cell::new(15, 1)).unwrap();
        assert!(hauling.haulables_in_region(start).is_empty());
        assert_eq!(hauling.haulables_in_region(end).len(), 1);

        hauling.remove_haulable(item.id);
        assert!(hauling.regions().is_empty());
    }

    #[test]
    fn test_harvest_only_tracks_cultivars_or_grow_zones() {
        let mut fx = fixture();
        let harvest = HarvestService::new(
            PlantSpecies::CULTIVARS,
            fx.regions.get_or_create("harvestable-plants"),
        );
        let mut plant = |species, cell| {
            fx.world
                .spawn(fx.map, ThingKind::Plant(species), cell)
                .unwrap()
        };
        let rice = plant(PlantSpecies::Rice, Cell::new(30, 1));
        let wild_oak = plant(PlantSpecies::Oak, Cell::new(30, 2));
        let zoned_berries = plant(PlantSpecies::Berries, Cell::new(2, 2));
        let item = fx.world.spawn(fx.map, ThingKind::Item, Cell::new(2, 3)).unwrap();

        assert!(harvest.mark_ready_for_harvest(rice, &fx.world));
        assert!(!harvest.mark_ready_for_harvest(wild_oak, &fx.world));
        assert!(harvest.mark_ready_for_harvest(zoned_berries, &fx.world));
        assert!(!harvest.mark_ready_for_harvest(item, &fx.world));

        let region = fx.world.region_at(fx.map, Cell::new(30, 1)).unwrap();
        assert_eq!(harvest.harvestable_cells_in_region(region, &fx.world), vec![Cell::new(30, 1)]);

        harvest.complete_harvest(rice.id);
        assert_eq!(harvest.regions().len(), 1);
    }

    #[test]
    fn test_refuel_splits_turrets() {
        let mut fx = fixture();
        let refuel = RefuelService::new(
            fx.maps.get_or_create("refuelable-turrets"),
            fx.maps.get_or_create("refuelable-non-turrets"),
        );
        let turret = fx.world.spawn(fx.map, ThingKind::Turret, Cell::new(1, 1)).unwrap();
        let generator = fx.world.spawn(fx.map, ThingKind::Generator, Cell::new(2, 1)).unwrap();

        refuel.mark_as_ready_for_refueling(turret);
        refuel.mark_as_ready_for_refueling(generator);

        assert_eq!(refuel.refuelable_turrets(fx.map), vec![turret]);
        assert_eq!(refuel.refuelable_non_turrets(fx.map), vec![generator]);

        refuel.unmark_for_refueling(&turret);
        assert!(refuel.refuelable_turrets(fx.map).is_empty());
    }

    #[test]
    fn test_colony_animals_by_product() {
        let mut fx = fixture();
        let mut animals = ColonyAnimalsService::new(fx.maps.get_or_create("colony-animals"));
        let mut animal = |product, cell| {
            fx.world
                .spawn(fx.map, ThingKind::Animal(product), cell)
                .unwrap()
        };
        let cow = animal(AnimalProduct::Milk, Cell::new(1, 1));
        let sheep = animal(AnimalProduct::Wool, Cell::new(2, 1));
        let colonist = fx.world.spawn(fx.map, ThingKind::Colonist, Cell::new(3, 1)).unwrap();

        animals.mark_animal_ready_for_harvest(cow);
        animals.mark_animal_ready_for_harvest(sheep);
        assert!(!animals.mark_animal_ready_for_harvest(colonist));

        assert_eq!(animals.animals_ready_for(fx.map, AnimalProduct::Milk), vec![cow]);

        animals.on_entity_removed(cow.id);
        assert!(animals.animals_ready_for(fx.map, AnimalProduct::Milk).is_empty());
        assert_eq!(animals.animals_ready_for(fx.map, AnimalProduct::Wool), vec![sheep]);
    }
}
