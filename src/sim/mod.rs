//! Synthetic simulation the caches run against.
//!
//! - `world` - maps, regions, things and their relations
//! - `driver` - deterministic churn exercising every cache through a session

mod driver;
mod world;

pub use driver::{MapSummary, Simulation, StepReport};
pub use world::{
    Affiliation, Ailment, AnimalProduct, Area, Cell, Component, ComponentKind, Injury, MapGrid,
    PlantSpecies, Quality, RelationKind, Thing, ThingKind, WorkKind, World,
};
