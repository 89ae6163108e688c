//! Deterministic churn over a small world.
//!
//! Every step moves, spawns and destroys things on each map and fires the
//! matching session hooks, then queries every cache the way game systems
//! would. All choices derive from the tick number, so two runs with the
//! same config produce the same reports.

use serde::Serialize;
use tracing::{debug, trace};

use super::world::{
    Affiliation, Ailment, AnimalProduct, Area, Cell, Component, PlantSpecies, Quality,
    RelationKind, Thing, ThingKind, WorkKind, World,
};
use crate::identity::MapId;
use crate::session::Session;

const MAP_COUNT: usize = 2;
const MAP_SIZE: u32 = 48;
const REGION_SIZE: u32 = 12;

/// The newest map is unloaded and replaced every this many ticks.
const MAP_CYCLE_TICKS: u64 = 120;

const SPECIES: [PlantSpecies; 4] = [
    PlantSpecies::Rice,
    PlantSpecies::Corn,
    PlantSpecies::Berries,
    PlantSpecies::Oak,
];

const QUALITIES: [Quality; 4] = [
    Quality::Poor,
    Quality::Normal,
    Quality::Good,
    Quality::Excellent,
];

/// Headcount of one map, recomputed at most once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapSummary {
    pub colonists: usize,
    pub animals: usize,
    pub items: usize,
}

impl MapSummary {
    fn of(world: &World, map: MapId) -> Self {
        world
            .things_on(map)
            .into_iter()
            .fold(Self::default(), |mut summary, thing| {
                match thing.kind {
                    ThingKind::Colonist => summary.colonists += 1,
                    ThingKind::Animal(_) => summary.animals += 1,
                    ThingKind::Item => summary.items += 1,
                    _ => {}
                }
                summary
            })
    }
}

/// What the game systems saw through the caches in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub tick: u64,
    pub things: usize,
    pub colonists: usize,
    pub haulables: usize,
    pub harvestable: usize,
    pub refuelable: usize,
    pub milkable: usize,
    pub bleeding: usize,
    pub hauling_disabled: usize,
    pub guests: usize,
    pub relations_known: usize,
    pub immunizable_ailments: usize,
    pub area_restricted: usize,
    pub powered: usize,
    pub fine_items: usize,
}

#[derive(Debug, Default)]
pub struct Simulation {
    world: World,
    maps: Vec<MapId>,
    tick: u64,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn maps(&self) -> &[MapId] {
        &self.maps
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Load the starting maps and warm the session's caches from them.
    pub fn populate(&mut self, session: &Session) {
        for _ in 0..MAP_COUNT {
            let map = self.load_map(session);
            self.maps.push(map);
        }
    }

    /// Run one tick.
    pub fn step(&mut self, session: &mut Session) -> StepReport {
        session.tick_started();
        self.tick += 1;
        self.world.age_injuries(1);

        if self.tick % MAP_CYCLE_TICKS == 0 {
            self.cycle_map(session);
        }

        let maps = self.maps.clone();
        for (offset, map) in (0u64..).zip(maps) {
            self.churn_map(session, map, self.tick.wrapping_mul(7919).wrapping_add(offset));
        }

        self.report(session)
    }

    fn load_map(&mut self, session: &Session) -> MapId {
        let map = self.world.add_map(MAP_SIZE, MAP_SIZE, REGION_SIZE);
        let seed = u64::from(map.0) << 32;

        let colonists: Vec<Thing> = (0..6)
            .filter_map(|n| self.spawn_scattered(map, ThingKind::Colonist, seed + n))
            .collect();
        for n in 0..6u64 {
            let product = if n % 2 == 0 { AnimalProduct::Milk } else { AnimalProduct::Wool };
            self.spawn_scattered(map, ThingKind::Animal(product), seed + 100 + n);
        }
        for (n, species) in (0..16u64).zip(SPECIES.iter().cycle()) {
            self.spawn_scattered(map, ThingKind::Plant(*species), seed + 200 + n);
        }
        for n in 0..24 {
            self.spawn_scattered(map, ThingKind::Item, seed + 300 + n);
        }
        for n in 0..2 {
            self.spawn_scattered(map, ThingKind::Turret, seed + 400 + n);
            self.spawn_scattered(map, ThingKind::Generator, seed + 500 + n);
        }

        for pair in colonists.windows(2) {
            self.world.relate(pair[0].id, pair[1].id, RelationKind::Sibling);
        }
        if let [first, second, ..] = colonists.as_slice() {
            self.world.relate(first.id, second.id, RelationKind::Spouse);
        }
        for colonist in colonists.iter().step_by(3) {
            self.world.restrict_work(colonist.id, vec![WorkKind::Hauling]);
        }
        for colonist in colonists.iter().skip(1).step_by(2) {
            self.world.restrict_area(colonist.id, Some(home_area(colonist.cell)));
        }
        if let (Some(host), Some(guest)) = (colonists.first(), colonists.last()) {
            self.world.affiliate(guest.id, Affiliation::Guest, host.id);
            session.groups().map_members(colonists.iter().map(|c| c.id), host.id);
        }

        // Regions come last, as they do when a real map finishes loading.
        self.world.set_regions_enabled(map, true);
        let haulables = session.hauling().add_all_haulables(&self.world, map);
        for thing in self.world.things_on(map) {
            match thing.kind {
                ThingKind::Plant(_) => {
                    session.harvest().mark_ready_for_harvest(thing, &self.world);
                }
                ThingKind::Turret | ThingKind::Generator => {
                    session.refuel().mark_as_ready_for_refueling(thing);
                }
                ThingKind::Animal(_) => {
                    session.colony_animals().mark_animal_ready_for_harvest(thing);
                }
                ThingKind::Item | ThingKind::Colonist => {}
            }
        }

        debug!(%map, haulables, "Map loaded");
        map
    }

    fn cycle_map(&mut self, session: &Session) {
        let Some(old) = self.maps.pop() else {
            return;
        };
        let regions = self.world.regions_of(old);
        let dropped = session.map_removed(old, &regions);
        for thing in self.world.remove_map(old) {
            session.spatial_item_removed(thing.id);
            session.entity_removed(thing.id);
        }

        let map = self.load_map(session);
        self.maps.push(map);
        debug!(%old, new = %map, dropped, "Map cycled");
    }

    fn churn_map(&mut self, session: &mut Session, map: MapId, seed: u64) {
        let tick = self.tick;
        let things = self.world.things_on(map);
        let of_kind = |wanted: fn(ThingKind) -> bool| -> Vec<Thing> {
            things.iter().filter(|t| wanted(t.kind)).copied().collect()
        };
        let items = of_kind(|kind| kind == ThingKind::Item);
        let plants = of_kind(|kind| matches!(kind, ThingKind::Plant(_)));
        let colonists = of_kind(ThingKind::is_humanlike);

        // Pawns carry things around.
        if !items.is_empty() {
            let moved = items[pick(seed, items.len())];
            if self.world.move_to(moved.id, scatter_cell(seed ^ 1)) {
                trace!(item = %moved.id, "Item moved");
                session.item_moved(moved.id, &self.world);
            }
        }

        if let Some(item) = self.spawn_scattered(map, ThingKind::Item, seed ^ 2) {
            let quality = QUALITIES[pick(seed ^ 9, QUALITIES.len())];
            self.world.set_component(item.id, Component::Quality(quality));
            session.hauling().add_haulable(item, &self.world);
        }

        // Something reached storage and was absorbed into a stack.
        if tick % 4 == 0
            && let Some(stored) = items.first()
        {
            self.world.despawn(stored.id);
            session.spatial_item_removed(stored.id);
        }

        if tick % 7 == 0 && !plants.is_empty() {
            let cut = plants[pick(seed ^ 3, plants.len())];
            session.harvest().complete_harvest(cut.id);
            self.world.despawn(cut.id);
            session.spatial_item_removed(cut.id);

            let species = SPECIES[pick(seed ^ 4, SPECIES.len())];
            if let Some(sprout) = self.spawn_scattered(map, ThingKind::Plant(species), seed ^ 5) {
                session.harvest().mark_ready_for_harvest(sprout, &self.world);
            }
        }

        match tick % 15 {
            0 => {
                for turret in session.refuel().refuelable_turrets(map) {
                    session.refuel().unmark_for_refueling(&turret);
                }
            }
            8 => {
                for turret in things.iter().filter(|t| t.kind.is_turret()) {
                    session.refuel().mark_as_ready_for_refueling(*turret);
                }
            }
            _ => {}
        }

        match tick % 20 {
            0 => {
                let milked = session.colony_animals().animals_ready_for(map, AnimalProduct::Milk);
                for animal in milked {
                    session.colony_animals().remove_animal(animal.id);
                }
            }
            10 => {
                for animal in things.iter().filter(|t| matches!(t.kind, ThingKind::Animal(_))) {
                    session.colony_animals().mark_animal_ready_for_harvest(*animal);
                }
            }
            _ => {}
        }

        // Component state changes in place; cached slots stay valid.
        let buildings = of_kind(|kind| matches!(kind, ThingKind::Turret | ThingKind::Generator));
        if tick % 9 == 0 && !buildings.is_empty() {
            let building = buildings[pick(seed ^ 10, buildings.len())];
            let broken = tick % 18 == 0;
            self.world.set_component(building.id, Component::Breakdown { broken });
            let on = mix(seed ^ 11) % 4 != 0;
            self.world.set_component(building.id, Component::PowerSwitch { on });
        }

        if tick % 12 == 0 && !colonists.is_empty() {
            let patient = colonists[pick(seed ^ 12, colonists.len())];
            let ailment = Ailment::ALL[pick(seed ^ 13, Ailment::ALL.len())];
            self.world.infect(patient.id, ailment);
        }

        if tick % 3 == 0 && !colonists.is_empty() {
            let victim = colonists[pick(seed ^ 6, colonists.len())];
            let severity = 1.0 + (mix(seed ^ 7) % 30) as f32;
            self.world.add_injury(victim.id, severity);
        }

        if tick % 10 == 0
            && let Some(patient) = colonists.first()
            && let Some(injury) = self.world.injuries_of(patient.id).first().copied()
        {
            self.world.heal(injury.id);
            session.injury_bleeding().remove_cached_age(injury.id);
        }

        if let [leader, second, .., last] = colonists.as_slice() {
            if tick % 25 == 0 {
                self.world.despawn(last.id);
                session.entity_removed(last.id);

                if let Some(newcomer) = self.spawn_scattered(map, ThingKind::Colonist, seed ^ 8) {
                    self.world.relate(newcomer.id, leader.id, RelationKind::Friend);
                    session.relations().clear_relations_between(newcomer.id, leader.id);
                    session.groups().map_member(newcomer.id, leader.id);
                }
            }

            match tick % 30 {
                0 => {
                    for colonist in [leader, second] {
                        if self.world.affiliation(colonist.id, Affiliation::Guest).is_some() {
                            self.world.end_affiliation(colonist.id, Affiliation::Guest);
                            session
                                .affiliations()
                                .remove_entries(Affiliation::Guest, [colonist.id]);
                        }
                    }
                }
                15 => {
                    self.world.affiliate(second.id, Affiliation::Mercenary, leader.id);
                    session.affiliations().remove_entries(Affiliation::Mercenary, [second.id]);
                }
                _ => {}
            }

            if tick % 40 == 0 {
                self.world.lift_work_restrictions(leader.id);
                session.work_restrictions().remove(leader.id);
            }
        }
    }

    fn report(&self, session: &mut Session) -> StepReport {
        let mut report = StepReport {
            tick: self.tick,
            things: self.world.thing_count(),
            ..StepReport::default()
        };

        let hauling = session.hauling();
        report.haulables = hauling
            .regions()
            .into_iter()
            .map(|region| hauling.haulables_in_region(region).len())
            .sum();
        let harvest = session.harvest();
        report.harvestable = harvest
            .regions()
            .into_iter()
            .map(|region| harvest.harvestable_cells_in_region(region, &self.world).len())
            .sum();

        for &map in &self.maps {
            let summary = *session
                .map_summaries()
                .get_or_compute(map, || MapSummary::of(&self.world, map));
            report.colonists += summary.colonists;
            report.refuelable += session.refuel().refuelable_turrets(map).len()
                + session.refuel().refuelable_non_turrets(map).len();
            report.milkable += session
                .colony_animals()
                .animals_ready_for(map, AnimalProduct::Milk)
                .len();

            let things = self.world.things_on(map);
            for thing in &things {
                match thing.kind {
                    ThingKind::Item => {
                        let quality = session.components().quality_of(thing.id, &self.world);
                        if quality >= Some(Quality::Good) {
                            report.fine_items += 1;
                        }
                    }
                    ThingKind::Turret | ThingKind::Generator => {
                        let mut components = session.components();
                        if components.wants_to_be_on(thing.id, &self.world)
                            && !components.is_broken_down(thing.id, &self.world)
                        {
                            report.powered += 1;
                        }
                    }
                    _ => {}
                }
            }

            if summary.colonists == 0 {
                continue;
            }
            let colonists: Vec<Thing> = things
                .into_iter()
                .filter(|t| t.kind.is_humanlike())
                .collect();

            for colonist in &colonists {
                for injury in self.world.injuries_of(colonist.id) {
                    if session.injury_bleeding().is_bleeding(&injury) {
                        report.bleeding += 1;
                    }
                }

                let no_hauling = session
                    .work_restrictions()
                    .get_or_insert_with(colonist.id, || self.world.disabled_work(colonist.id))
                    .contains(&WorkKind::Hauling);
                if no_hauling {
                    report.hauling_disabled += 1;
                }

                let guest_of = *session.affiliations().get_or_insert_with(
                    colonist.id,
                    Affiliation::Guest,
                    || self.world.affiliation(colonist.id, Affiliation::Guest),
                );
                if guest_of.is_some() {
                    report.guests += 1;
                }

                if session
                    .effective_area_restriction(colonist.id, &self.world)
                    .is_some()
                {
                    report.area_restricted += 1;
                }
                report.immunizable_ailments += self
                    .world
                    .ailments_of(colonist.id)
                    .into_iter()
                    .filter(|&ailment| session.immunizable().is_immunizable(ailment))
                    .count();
            }

            for pair in colonists.windows(2) {
                let (subject, related) = (pair[0], pair[1]);
                let cached = session
                    .relations()
                    .relations_between(subject.id, related.id)
                    .map(<[RelationKind]>::len);
                report.relations_known += match cached {
                    Some(known) => known,
                    None => {
                        let relations = self.world.relations_between(subject.id, related.id);
                        let known = relations.len();
                        session.relations().add_relations_between(&subject, &related, relations);
                        known
                    }
                };
            }
        }

        report
    }

    fn spawn_scattered(&mut self, map: MapId, kind: ThingKind, seed: u64) -> Option<Thing> {
        self.world.spawn(map, kind, scatter_cell(seed))
    }
}

/// splitmix64 finalizer.
fn mix(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn pick(seed: u64, len: usize) -> usize {
    (mix(seed) % len as u64) as usize
}

/// Square of cells around `center`, clipped to the map.
fn home_area(center: Cell) -> Area {
    const REACH: u32 = 6;
    let edge = MAP_SIZE - 1;
    Area {
        min: Cell::new(center.x.saturating_sub(REACH), center.z.saturating_sub(REACH)),
        max: Cell::new((center.x + REACH).min(edge), (center.z + REACH).min(edge)),
    }
}

fn scatter_cell(seed: u64) -> Cell {
    let size = u64::from(MAP_SIZE);
    Cell::new((mix(seed) % size) as u32, (mix(!seed) % size) as u32)
}
