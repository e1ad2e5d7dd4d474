//! Collective interfaces consumed by the immigration engine
//!
//! The engine never owns the colony. Resources, structures, items, units,
//! technology, the clock, other factions and the map all belong to the
//! surrounding simulation and are reached through these narrow traits.
//! `Collective` bundles them and is implemented for anything that
//! implements all of them.

pub mod sandbox;

use crate::core::types::{
    CostInfo, FactionId, ItemKind, MinionTrait, NewUnit, Position, StructureKind, SunlightState,
    TechId, UnitId, UnitKind, UnitRef,
};

pub use sandbox::SandboxColony;

pub trait ResourceStore {
    fn has_resource(&self, cost: &CostInfo) -> bool;
    fn take_resource(&mut self, cost: &CostInfo);
}

pub trait StructureInventory {
    /// Number of fully built structures of a kind
    fn built_count(&self, kind: &StructureKind) -> u32;
    fn built_positions(&self, kind: &StructureKind) -> Vec<Position>;
    /// Upgraded variants that also count as this kind for attraction
    fn upgrades_of(&self, _kind: &StructureKind) -> Vec<StructureKind> {
        Vec::new()
    }
}

pub trait ItemInventory {
    fn item_count(&self, kind: &ItemKind) -> u32;
}

pub trait Population {
    /// Current members, in a stable order
    fn units(&self) -> Vec<UnitId>;
    /// Members counting against the population limit
    fn population_size(&self) -> u32;
    fn max_population(&self) -> u32;
    fn unit_position(&self, unit: UnitId) -> Option<Position>;
    fn is_pregnant(&self, unit: UnitId) -> bool;
    fn end_pregnancy(&mut self, unit: UnitId);
    /// Reserve an id for a unit that does not exist yet
    fn allocate_unit_id(&mut self) -> UnitId;
    fn add_unit(&mut self, unit: NewUnit, position: Position, traits: &[MinionTrait]);
    /// Move a unit from another faction into this collective
    fn enlist_recruit(&mut self, unit: UnitId, traits: &[MinionTrait]);
    /// Bundle units into a persistent, active team
    fn form_team(&mut self, members: &[UnitId]);
}

pub trait TechnologyStore {
    fn has_technology(&self, tech: &TechId) -> bool;
}

pub trait WorldClock {
    fn global_time(&self) -> f64;
    fn sunlight(&self) -> SunlightState;
}

pub trait FactionDirectory {
    /// Display name, or `None` when the faction does not exist
    fn faction_name(&self, faction: &FactionId) -> Option<String>;
    fn is_faction_discovered(&self, faction: &FactionId) -> bool;
    /// The faction's units carrying a trait, in the faction's order
    fn faction_units(&self, faction: &FactionId, with_trait: MinionTrait) -> Vec<UnitRef>;
}

pub trait Terrain {
    fn can_occupy(&self, kind: &UnitKind, position: Position) -> bool;
    fn neighbors(&self, position: Position) -> Vec<Position> {
        position.neighbors8()
    }
    fn leader_position(&self) -> Option<Position>;
    fn territory(&self) -> Vec<Position>;
    /// Positions between `min_radius` and `max_radius` outside the territory
    fn extended_territory(&self, min_radius: u32, max_radius: u32) -> Vec<Position>;
}

/// Everything the immigration engine needs from its collective
pub trait Collective:
    ResourceStore
    + StructureInventory
    + ItemInventory
    + Population
    + TechnologyStore
    + WorldClock
    + FactionDirectory
    + Terrain
{
}

impl<T> Collective for T where
    T: ResourceStore
        + StructureInventory
        + ItemInventory
        + Population
        + TechnologyStore
        + WorldClock
        + FactionDirectory
        + Terrain
        + ?Sized
{
}
