//! Minimal entity world used as the caches' external collaborator.
//!
//! Maps are split into square regions. Things have positions, colonists
//! carry injuries and relations. Lookups here are what the caches sit in
//! front of.

use serde::Serialize;

use crate::cache::ScopeResolver;
use crate::identity::{
    CacheTag, EntityId, FxHashMap, Identified, IdentityMap, MapId, RegionId, RelationKey, TaggedKey,
};

/// Region ids are allocated in blocks per map so they stay unique across maps.
const REGIONS_PER_MAP: u32 = 10_000;

/// Global id of region `local` of `map`. `None` once the block would
/// leave the `u32` range.
fn region_id(map: MapId, local: u32) -> Option<RegionId> {
    if local >= REGIONS_PER_MAP {
        return None;
    }
    map.0
        .checked_mul(REGIONS_PER_MAP)?
        .checked_add(local)
        .map(RegionId::new)
}

/// Smallest region size not below `requested` whose grid fits one block.
fn fitting_region_size(width: u32, height: u32, requested: u32) -> u32 {
    let mut size = requested.max(1);
    loop {
        let regions = u64::from(width.div_ceil(size)) * u64::from(height.div_ceil(size));
        if regions <= u64::from(REGIONS_PER_MAP) {
            return size;
        }
        size += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Cell {
    pub x: u32,
    pub z: u32,
}

impl Cell {
    pub const fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlantSpecies {
    Rice,
    Corn,
    Berries,
    Oak,
}

impl PlantSpecies {
    /// Species that only grow when sown.
    pub const CULTIVARS: [PlantSpecies; 2] = [PlantSpecies::Rice, PlantSpecies::Corn];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnimalProduct {
    Milk,
    Wool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ThingKind {
    Item,
    Plant(PlantSpecies),
    Animal(AnimalProduct),
    Turret,
    Generator,
    Colonist,
}

impl ThingKind {
    pub fn is_humanlike(self) -> bool {
        matches!(self, ThingKind::Colonist)
    }

    pub fn is_turret(self) -> bool {
        matches!(self, ThingKind::Turret)
    }
}

/// A spawned thing. Copies of this are what the caches store; the world's
/// own record is the source of truth for position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thing {
    pub id: EntityId,
    pub kind: ThingKind,
    pub map: MapId,
    pub cell: Cell,
}

impl Identified for Thing {
    type Key = EntityId;

    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelationKind {
    Parent,
    Child,
    Sibling,
    Spouse,
    Friend,
}

impl RelationKind {
    /// The relation as seen by the other side.
    pub fn inverse(self) -> Self {
        match self {
            RelationKind::Parent => RelationKind::Child,
            RelationKind::Child => RelationKind::Parent,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkKind {
    Hauling,
    Harvesting,
    Refueling,
    Gathering,
}

/// Temporary allegiance handed to an entity by an ongoing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Affiliation {
    Guest,
    Mercenary,
}

impl CacheTag for Affiliation {
    const ALL: &'static [Self] = &[Affiliation::Guest, Affiliation::Mercenary];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Quality {
    Poor,
    Normal,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentKind {
    Quality,
    PowerSwitch,
    Schedule,
    Breakdown,
}

/// State attached to a thing. A thing has at most one component per kind,
/// found by scanning its component list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Component {
    Quality(Quality),
    PowerSwitch { on: bool },
    Schedule { allowed: bool },
    Breakdown { broken: bool },
}

impl Component {
    pub fn kind(self) -> ComponentKind {
        match self {
            Component::Quality(_) => ComponentKind::Quality,
            Component::PowerSwitch { .. } => ComponentKind::PowerSwitch,
            Component::Schedule { .. } => ComponentKind::Schedule,
            Component::Breakdown { .. } => ComponentKind::Breakdown,
        }
    }
}

fn default_components(kind: ThingKind) -> Vec<Component> {
    match kind {
        ThingKind::Item => vec![Component::Quality(Quality::Normal)],
        ThingKind::Turret => vec![
            Component::PowerSwitch { on: true },
            Component::Breakdown { broken: false },
        ],
        ThingKind::Generator => vec![
            Component::PowerSwitch { on: true },
            Component::Schedule { allowed: true },
            Component::Breakdown { broken: false },
        ],
        ThingKind::Plant(_) | ThingKind::Animal(_) | ThingKind::Colonist => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ailment {
    Flu,
    Plague,
    Malaria,
    GutWorms,
    Asthma,
}

impl Ailment {
    pub const ALL: [Ailment; 5] = [
        Ailment::Flu,
        Ailment::Plague,
        Ailment::Malaria,
        Ailment::GutWorms,
        Ailment::Asthma,
    ];

    /// Whether a patient can build up immunity against it.
    pub fn develops_immunity(self) -> bool {
        matches!(self, Ailment::Flu | Ailment::Plague | Ailment::Malaria)
    }
}

/// Inclusive rectangle of cells a colonist is allowed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Area {
    pub min: Cell,
    pub max: Cell,
}

impl Area {
    pub fn contains(&self, cell: Cell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x) && (self.min.z..=self.max.z).contains(&cell.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Injury {
    pub id: EntityId,
    pub owner: EntityId,
    pub severity: f32,
    pub age_ticks: u32,
}

#[derive(Debug, Clone)]
pub struct MapGrid {
    pub id: MapId,
    pub width: u32,
    pub height: u32,
    pub region_size: u32,
    /// Off until the region grid is built; region lookups fail before then.
    pub regions_enabled: bool,
}

impl MapGrid {
    fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.z < self.height
    }

    fn region_columns(&self) -> u32 {
        self.width.div_ceil(self.region_size)
    }

    fn region_rows(&self) -> u32 {
        self.height.div_ceil(self.region_size)
    }

    fn region_at(&self, cell: Cell) -> Option<RegionId> {
        if !self.regions_enabled || !self.contains(cell) {
            return None;
        }
        let local = (cell.z / self.region_size) * self.region_columns() + cell.x / self.region_size;
        region_id(self.id, local)
    }

    /// Grow zones cover the western quarter of every map.
    fn in_grow_zone(&self, cell: Cell) -> bool {
        self.contains(cell) && cell.x < self.width / 4
    }
}

/// The simulated world.
#[derive(Debug, Default)]
pub struct World {
    maps: IdentityMap<MapId, MapGrid>,
    things: IdentityMap<EntityId, Thing>,
    injuries: IdentityMap<EntityId, Injury>,
    relations: FxHashMap<RelationKey, Vec<RelationKind>>,
    work_restrictions: IdentityMap<EntityId, Vec<WorkKind>>,
    affiliations: FxHashMap<TaggedKey<Affiliation>, EntityId>,
    components: IdentityMap<EntityId, Vec<Component>>,
    ailments: IdentityMap<EntityId, Vec<Ailment>>,
    area_restrictions: IdentityMap<EntityId, Area>,
    next_map: u32,
    next_entity: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a map whose region grid is not built yet.
    ///
    /// `region_size` is raised when needed so the grid never has more than
    /// `REGIONS_PER_MAP` regions.
    pub fn add_map(&mut self, width: u32, height: u32, region_size: u32) -> MapId {
        self.next_map += 1;
        let id = MapId::new(self.next_map);
        let (width, height) = (width.max(1), height.max(1));
        self.maps.insert(
            id,
            MapGrid {
                id,
                width,
                height,
                region_size: fitting_region_size(width, height, region_size),
                regions_enabled: false,
            },
        );
        id
    }

    pub fn set_regions_enabled(&mut self, map: MapId, enabled: bool) {
        if let Some(grid) = self.maps.get_mut(&map) {
            grid.regions_enabled = enabled;
        }
    }

    /// Remove a map along with everything on it. Returns the removed things.
    pub fn remove_map(&mut self, map: MapId) -> Vec<Thing> {
        if self.maps.remove(&map).is_none() {
            return Vec::new();
        }
        let removed: Vec<Thing> = self.things.values().filter(|t| t.map == map).copied().collect();
        for thing in &removed {
            self.forget(thing.id);
        }
        removed
    }

    pub fn map(&self, map: MapId) -> Option<&MapGrid> {
        self.maps.get(&map)
    }

    pub fn map_ids(&self) -> Vec<MapId> {
        let mut ids: Vec<MapId> = self.maps.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Every region of a map, whether or not anything is in it.
    pub fn regions_of(&self, map: MapId) -> Vec<RegionId> {
        let Some(grid) = self.maps.get(&map) else {
            return Vec::new();
        };
        let count = grid.region_columns() * grid.region_rows();
        (0..count).filter_map(|local| region_id(map, local)).collect()
    }

    pub fn region_at(&self, map: MapId, cell: Cell) -> Option<RegionId> {
        self.maps.get(&map)?.region_at(cell)
    }

    pub fn in_grow_zone(&self, map: MapId, cell: Cell) -> bool {
        self.maps.get(&map).is_some_and(|grid| grid.in_grow_zone(cell))
    }

    /// Spawn a thing. Fails if the map is unknown or the cell is off-map.
    pub fn spawn(&mut self, map: MapId, kind: ThingKind, cell: Cell) -> Option<Thing> {
        if !self.maps.get(&map)?.contains(cell) {
            return None;
        }
        self.next_entity += 1;
        let thing = Thing {
            id: EntityId::new(self.next_entity),
            kind,
            map,
            cell,
        };
        self.things.insert(thing.id, thing);
        let components = default_components(kind);
        if !components.is_empty() {
            self.components.insert(thing.id, components);
        }
        Some(thing)
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Thing> {
        let thing = self.things.get(&id).copied()?;
        self.forget(id);
        Some(thing)
    }

    /// Move a thing within its map. Off-map targets are rejected.
    pub fn move_to(&mut self, id: EntityId, cell: Cell) -> bool {
        let Some(thing) = self.things.get_mut(&id) else {
            return false;
        };
        let in_bounds = self.maps.get(&thing.map).is_some_and(|grid| grid.contains(cell));
        if in_bounds {
            thing.cell = cell;
        }
        in_bounds
    }

    pub fn thing(&self, id: EntityId) -> Option<&Thing> {
        self.things.get(&id)
    }

    /// Things on a map in id order.
    pub fn things_on(&self, map: MapId) -> Vec<Thing> {
        let mut things: Vec<Thing> = self
            .things
            .values()
            .filter(|t| t.map == map)
            .copied()
            .collect();
        things.sort_by_key(|t| t.id);
        things
    }

    pub fn thing_count(&self) -> usize {
        self.things.len()
    }

    pub fn add_injury(&mut self, owner: EntityId, severity: f32) -> Option<Injury> {
        self.things.get(&owner)?;
        self.next_entity += 1;
        let injury = Injury {
            id: EntityId::new(self.next_entity),
            owner,
            severity,
            age_ticks: 0,
        };
        self.injuries.insert(injury.id, injury);
        Some(injury)
    }

    pub fn heal(&mut self, injury: EntityId) -> Option<Injury> {
        self.injuries.remove(&injury)
    }

    pub fn injuries_of(&self, owner: EntityId) -> Vec<Injury> {
        let mut injuries: Vec<Injury> = self
            .injuries
            .values()
            .filter(|i| i.owner == owner)
            .copied()
            .collect();
        injuries.sort_by_key(|i| i.id);
        injuries
    }

    /// Advance every injury's age by `ticks`.
    pub fn age_injuries(&mut self, ticks: u32) {
        for injury in self.injuries.values_mut() {
            injury.age_ticks = injury.age_ticks.saturating_add(ticks);
        }
    }

    /// Record `kind` from `subject` to `related`, and its inverse.
    pub fn relate(&mut self, subject: EntityId, related: EntityId, kind: RelationKind) {
        let forward = RelationKey::new(subject, related);
        self.relations.entry(forward).or_default().push(kind);
        self.relations.entry(forward.reversed()).or_default().push(kind.inverse());
    }

    /// Drop every relation between the two, in both directions.
    pub fn unrelate(&mut self, a: EntityId, b: EntityId) {
        let key = RelationKey::new(a, b);
        self.relations.remove(&key);
        self.relations.remove(&key.reversed());
    }

    pub fn relations_between(&self, subject: EntityId, related: EntityId) -> Vec<RelationKind> {
        self.relations
            .get(&RelationKey::new(subject, related))
            .cloned()
            .unwrap_or_default()
    }

    pub fn restrict_work(&mut self, id: EntityId, kinds: Vec<WorkKind>) {
        self.work_restrictions.insert(id, kinds);
    }

    pub fn lift_work_restrictions(&mut self, id: EntityId) {
        self.work_restrictions.remove(&id);
    }

    pub fn disabled_work(&self, id: EntityId) -> Vec<WorkKind> {
        self.work_restrictions.get(&id).cloned().unwrap_or_default()
    }

    pub fn affiliate(&mut self, id: EntityId, tag: Affiliation, faction: EntityId) {
        self.affiliations.insert(TaggedKey::new(id, tag), faction);
    }

    pub fn end_affiliation(&mut self, id: EntityId, tag: Affiliation) {
        self.affiliations.remove(&TaggedKey::new(id, tag));
    }

    pub fn affiliation(&self, id: EntityId, tag: Affiliation) -> Option<EntityId> {
        self.affiliations.get(&TaggedKey::new(id, tag)).copied()
    }

    /// Slot of the `kind` component on `id`, by linear scan.
    pub fn find_component(&self, id: EntityId, kind: ComponentKind) -> Option<usize> {
        self.components.get(&id)?.iter().position(|c| c.kind() == kind)
    }

    pub fn component_at(&self, id: EntityId, slot: usize) -> Option<Component> {
        self.components.get(&id)?.get(slot).copied()
    }

    /// Replace the state of a component in place. A thing's set of
    /// components is fixed at spawn, so slots never move. Returns false if
    /// `id` has no component of that kind.
    pub fn set_component(&mut self, id: EntityId, component: Component) -> bool {
        let existing = self
            .components
            .get_mut(&id)
            .and_then(|components| {
                components.iter_mut().find(|c| c.kind() == component.kind())
            });
        match existing {
            Some(existing) => {
                *existing = component;
                true
            }
            None => false,
        }
    }

    pub fn infect(&mut self, owner: EntityId, ailment: Ailment) -> bool {
        if !self.things.contains_key(&owner) {
            return false;
        }
        self.ailments.entry(owner).or_default().push(ailment);
        true
    }

    pub fn ailments_of(&self, owner: EntityId) -> Vec<Ailment> {
        self.ailments.get(&owner).cloned().unwrap_or_default()
    }

    pub fn restrict_area(&mut self, id: EntityId, area: Option<Area>) {
        match area {
            Some(area) => self.area_restrictions.insert(id, area),
            None => self.area_restrictions.remove(&id),
        };
    }

    /// Area `id` is currently allowed in. Only colonists can be restricted.
    pub fn effective_area_restriction(&self, id: EntityId) -> Option<Area> {
        let thing = self.things.get(&id)?;
        if !thing.kind.is_humanlike() {
            return None;
        }
        self.area_restrictions.get(&id).copied()
    }

    fn forget(&mut self, id: EntityId) {
        self.things.remove(&id);
        self.components.remove(&id);
        self.ailments.remove(&id);
        self.area_restrictions.remove(&id);
        self.work_restrictions.remove(&id);
        self.affiliations.retain(|key, _| key.id != id);
        self.injuries.retain(|_, injury| injury.owner != id);
        self.relations
            .retain(|key, _| key.subject != id && key.related != id);
    }
}

impl ScopeResolver<Thing, RegionId> for World {
    fn resolve_scope(&self, item: &Thing) -> Option<RegionId> {
        let current = self.things.get(&item.id)?;
        self.region_at(current.map, current.cell)
    }
}

impl ScopeResolver<Thing, MapId> for World {
    fn resolve_scope(&self, item: &Thing) -> Option<MapId> {
        self.things.get(&item.id).map(|current| current.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_map() -> (World, MapId) {
        let mut world = World::new();
        let map = world.add_map(20, 20, 10);
        world.set_regions_enabled(map, true);
        (world, map)
    }

    #[test]
    fn test_regions_before_grid_is_built() {
        let mut world = World::new();
        let map = world.add_map(20, 20, 10);
        let thing = world.spawn(map, ThingKind::Item, Cell::new(1, 1)).unwrap();

        let region: Option<RegionId> = world.resolve_scope(&thing);
        assert_eq!(region, None);

        world.set_regions_enabled(map, true);
        let region: Option<RegionId> = world.resolve_scope(&thing);
        assert_eq!(region, Some(RegionId::new(10_000)));
    }

    #[test]
    fn test_region_layout() {
        let (world, map) = world_with_map();

        assert_eq!(world.regions_of(map).len(), 4);
        assert_eq!(world.region_at(map, Cell::new(15, 0)), Some(RegionId::new(10_001)));
        assert_eq!(world.region_at(map, Cell::new(0, 15)), Some(RegionId::new(10_002)));
        assert_eq!(world.region_at(map, Cell::new(20, 0)), None);
    }

    #[test]
    fn test_resolver_uses_current_position() {
        let (mut world, map) = world_with_map();
        let stale = world.spawn(map, ThingKind::Item, Cell::new(1, 1)).unwrap();
        world.move_to(stale.id, Cell::new(15, 15));

        let region: Option<RegionId> = world.resolve_scope(&stale);
        assert_eq!(region, Some(RegionId::new(10_003)));
    }

    #[test]
    fn test_region_blocks_never_overlap() {
        let mut world = World::new();
        let big = world.add_map(200, 200, 1);
        let small = world.add_map(5, 5, 5);
        world.set_regions_enabled(big, true);
        world.set_regions_enabled(small, true);

        let big_regions = world.regions_of(big);
        assert!(big_regions.len() <= REGIONS_PER_MAP as usize);
        assert_eq!(world.map(big).map(|grid| grid.region_size), Some(2));

        let small_region = world.region_at(small, Cell::new(0, 0));
        assert_ne!(world.region_at(big, Cell::new(0, 50)), small_region);
        assert!(small_region.is_some_and(|region| !big_regions.contains(&region)));
    }

    #[test]
    fn test_region_ids_do_not_overflow() {
        let grid = MapGrid {
            id: MapId::new(u32::MAX),
            width: 10,
            height: 10,
            region_size: 5,
            regions_enabled: true,
        };

        assert_eq!(grid.region_at(Cell::new(1, 1)), None);
    }

    #[test]
    fn test_spawn_rejects_off_map() {
        let (mut world, map) = world_with_map();

        assert!(world.spawn(map, ThingKind::Item, Cell::new(30, 1)).is_none());
        assert!(world.spawn(MapId::new(99), ThingKind::Item, Cell::new(1, 1)).is_none());
        assert!(!world.move_to(EntityId::new(99), Cell::new(1, 1)));
    }

    #[test]
    fn test_relations_are_mirrored_and_forgotten() {
        let (mut world, map) = world_with_map();
        let a = world.spawn(map, ThingKind::Colonist, Cell::new(1, 1)).unwrap().id;
        let b = world.spawn(map, ThingKind::Colonist, Cell::new(2, 1)).unwrap().id;
        world.relate(a, b, RelationKind::Parent);

        assert_eq!(world.relations_between(a, b), vec![RelationKind::Parent]);
        assert_eq!(world.relations_between(b, a), vec![RelationKind::Child]);

        world.despawn(a);
        assert!(world.relations_between(b, a).is_empty());
    }

    #[test]
    fn test_component_slots_are_stable() {
        let (mut world, map) = world_with_map();
        let generator = world.spawn(map, ThingKind::Generator, Cell::new(1, 1)).unwrap().id;
        let slot = world.find_component(generator, ComponentKind::Breakdown).unwrap();

        assert!(world.set_component(generator, Component::Breakdown { broken: true }));
        assert!(!world.set_component(generator, Component::Quality(Quality::Good)));

        assert_eq!(world.find_component(generator, ComponentKind::Breakdown), Some(slot));
        assert_eq!(
            world.component_at(generator, slot),
            Some(Component::Breakdown { broken: true })
        );
        assert_eq!(world.find_component(generator, ComponentKind::Quality), None);

        world.despawn(generator);
        assert_eq!(world.component_at(generator, slot), None);
    }

    #[test]
    fn test_area_restrictions_only_for_colonists() {
        let (mut world, map) = world_with_map();
        let colonist = world.spawn(map, ThingKind::Colonist, Cell::new(1, 1)).unwrap().id;
        let item = world.spawn(map, ThingKind::Item, Cell::new(1, 1)).unwrap().id;
        let home = Area {
            min: Cell::new(0, 0),
            max: Cell::new(4, 4),
        };
        world.restrict_area(colonist, Some(home));
        world.restrict_area(item, Some(home));

        assert_eq!(world.effective_area_restriction(colonist), Some(home));
        assert_eq!(world.effective_area_restriction(item), None);
        assert!(home.contains(Cell::new(4, 0)));
        assert!(!home.contains(Cell::new(5, 0)));
    }

    #[test]
    fn test_remove_map_takes_things() {
        let (mut world, map) = world_with_map();
        let other = world.add_map(5, 5, 5);
        world.spawn(map, ThingKind::Item, Cell::new(1, 1));
        let kept = world.spawn(other, ThingKind::Item, Cell::new(1, 1)).unwrap();

        assert_eq!(world.remove_map(map).len(), 1);
        assert_eq!(world.thing_count(), 1);
        assert!(world.thing(kept.id).is_some());
        assert!(world.map(map).is_none());
    }
}
