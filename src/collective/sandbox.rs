//! Sandbox colony - a self-contained collective for tests and the simulator
//!
//! A rectangular map with structures, a stockpile, members and neighbouring
//! factions. Nothing here models pathing or needs; it only keeps the state
//! the immigration engine reads and writes.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::collective::{
    FactionDirectory, ItemInventory, Population, ResourceStore, StructureInventory, TechnologyStore, Terrain,
    WorldClock,
};
use crate::core::types::{
    CostInfo, FactionId, ItemKind, MinionTrait, NewUnit, Position, ResourceId, StructureKind, SunlightState,
    TechId, UnitId, UnitKind, UnitRef,
};

/// A unit living in the colony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub kind: UnitKind,
    pub position: Position,
    pub traits: Vec<MinionTrait>,
    /// Base experience levels
    pub experience: u32,
    pub pregnant: bool,
}

impl Member {
    pub fn has_trait(&self, t: MinionTrait) -> bool {
        self.traits.contains(&t)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Faction {
    name: String,
    discovered: bool,
    units: Vec<(UnitRef, MinionTrait)>,
}

/// In-memory collective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxColony {
    width: i32,
    height: i32,
    time: f64,
    sunlight: SunlightState,
    max_population: u32,
    leader: Option<Position>,
    territory: Vec<Position>,
    blocked: AHashSet<Position>,
    structures: AHashMap<StructureKind, Vec<Position>>,
    upgrades: AHashMap<StructureKind, Vec<StructureKind>>,
    items: AHashMap<ItemKind, u32>,
    resources: AHashMap<ResourceId, u32>,
    technologies: AHashSet<TechId>,
    members: BTreeMap<UnitId, Member>,
    factions: BTreeMap<FactionId, Faction>,
    teams: Vec<Vec<UnitId>>,
    next_unit_id: u64,
}

impl SandboxColony {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            time: 0.0,
            sunlight: SunlightState::Day,
            max_population: 10,
            leader: None,
            territory: Vec::new(),
            blocked: AHashSet::new(),
            structures: AHashMap::new(),
            upgrades: AHashMap::new(),
            items: AHashMap::new(),
            resources: AHashMap::new(),
            technologies: AHashSet::new(),
            members: BTreeMap::new(),
            factions: BTreeMap::new(),
            teams: Vec::new(),
            next_unit_id: 1,
        }
    }

    /// A small dungeon matching the built-in keeper roster
    pub fn keeper_demo() -> Self {
        let mut colony = Self::new(64, 64);
        let center = Position::new(32, 32);
        colony.set_max_population(25);
        colony.spawn_member_with_traits("keeper", center, vec![MinionTrait::Leader, MinionTrait::NoLimit]);
        colony.set_leader(center);
        let territory = (26..=38)
            .flat_map(|y| (26..=38).map(move |x| Position::new(x, y)))
            .collect();
        colony.set_territory(territory);

        colony.build("forge", Position::new(27, 27));
        colony.build("workshop", Position::new(28, 27));
        colony.build("training_wood", Position::new(36, 27));
        colony.build("training_wood", Position::new(37, 27));
        colony.build("training_iron", Position::new(36, 28));
        colony.add_upgrade("training_wood", "training_iron");
        colony.build("book_shelf", Position::new(27, 36));
        colony.build("demon_shrine", Position::new(36, 36));
        colony.build("demon_shrine", Position::new(37, 36));
        colony.build("grave", Position::new(30, 37));
        colony.set_items("ranged_weapon", 2);

        colony.add_resource("gold", 400);
        colony.add_resource("mana", 600);
        colony.add_resource("corpse", 3);

        colony.add_faction("dark_elves", "Dark elves");
        colony.discover_faction("dark_elves");
        for _ in 0..5 {
            colony.add_faction_unit("dark_elves", "dark_elf_warrior", MinionTrait::Fighter);
        }
        colony
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn set_sunlight(&mut self, state: SunlightState) {
        self.sunlight = state;
    }

    pub fn set_max_population(&mut self, max: u32) {
        self.max_population = max;
    }

    pub fn set_leader(&mut self, position: Position) {
        self.leader = Some(position);
    }

    pub fn set_territory(&mut self, territory: Vec<Position>) {
        self.territory = territory;
    }

    /// Marks a cell as impassable
    pub fn block(&mut self, position: Position) {
        self.blocked.insert(position);
    }

    pub fn build(&mut self, kind: &str, position: Position) {
        self.structures.entry(kind.into()).or_default().push(position);
    }

    /// Declares `upgrade` as an upgraded variant of `base`
    pub fn add_upgrade(&mut self, base: &str, upgrade: &str) {
        self.upgrades.entry(base.into()).or_default().push(upgrade.into());
    }

    pub fn set_items(&mut self, kind: &str, count: u32) {
        self.items.insert(kind.into(), count);
    }

    pub fn add_resource(&mut self, resource: &str, amount: u32) {
        *self.resources.entry(resource.into()).or_insert(0) += amount;
    }

    pub fn resource(&self, resource: &str) -> u32 {
        self.resources.get(&ResourceId::from(resource)).copied().unwrap_or(0)
    }

    pub fn research(&mut self, tech: &str) {
        self.technologies.insert(tech.into());
    }

    fn next_id(&mut self) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        id
    }

    /// Adds a member with no traits
    pub fn spawn_member(&mut self, kind: &str, position: Position) -> UnitId {
        self.spawn_member_with_traits(kind, position, Vec::new())
    }

    pub fn spawn_member_with_traits(&mut self, kind: &str, position: Position, traits: Vec<MinionTrait>) -> UnitId {
        let id = self.next_id();
        self.members.insert(
            id,
            Member { kind: kind.into(), position, traits, experience: 0, pregnant: false },
        );
        id
    }

    /// Removes a unit from the world, whoever it belongs to
    pub fn kill(&mut self, unit: UnitId) {
        self.members.remove(&unit);
        for faction in self.factions.values_mut() {
            faction.units.retain(|(u, _)| u.id != unit);
        }
        for team in &mut self.teams {
            team.retain(|u| *u != unit);
        }
    }

    pub fn set_pregnant(&mut self, unit: UnitId, pregnant: bool) {
        if let Some(member) = self.members.get_mut(&unit) {
            member.pregnant = pregnant;
        }
    }

    pub fn member(&self, unit: UnitId) -> Option<&Member> {
        self.members.get(&unit)
    }

    pub fn is_member(&self, unit: UnitId) -> bool {
        self.members.contains_key(&unit)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Members of a kind, in id order
    pub fn members_of_kind(&self, kind: &str) -> Vec<UnitId> {
        self.members
            .iter()
            .filter(|(_, m)| m.kind.as_str() == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn teams(&self) -> &[Vec<UnitId>] {
        &self.teams
    }

    pub fn add_faction(&mut self, id: &str, name: &str) {
        self.factions.insert(
            id.into(),
            Faction { name: name.to_string(), discovered: false, units: Vec::new() },
        );
    }

    pub fn discover_faction(&mut self, id: &str) {
        if let Some(faction) = self.factions.get_mut(&FactionId::from(id)) {
            faction.discovered = true;
        }
    }

    /// Adds a unit to another faction; does nothing for unknown factions
    pub fn add_faction_unit(&mut self, faction: &str, kind: &str, with_trait: MinionTrait) -> UnitId {
        let id = self.next_id();
        if let Some(faction) = self.factions.get_mut(&FactionId::from(faction)) {
            faction.units.push((UnitRef { id, kind: kind.into() }, with_trait));
        }
        id
    }

    pub fn faction_size(&self, faction: &str) -> usize {
        self.factions.get(&FactionId::from(faction)).map_or(0, |f| f.units.len())
    }

    fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    fn free_cell_near(&self, kind: &UnitKind, origin: Position) -> Position {
        if self.can_occupy(kind, origin) {
            return origin;
        }
        origin
            .neighbors8()
            .into_iter()
            .find(|pos| self.can_occupy(kind, *pos))
            .unwrap_or(origin)
    }
}

impl ResourceStore for SandboxColony {
    fn has_resource(&self, cost: &CostInfo) -> bool {
        cost.is_free() || self.resources.get(&cost.resource).is_some_and(|amount| *amount >= cost.value)
    }

    fn take_resource(&mut self, cost: &CostInfo) {
        if let Some(amount) = self.resources.get_mut(&cost.resource) {
            *amount = amount.saturating_sub(cost.value);
        }
    }
}

impl StructureInventory for SandboxColony {
    fn built_count(&self, kind: &StructureKind) -> u32 {
        self.structures.get(kind).map_or(0, |positions| positions.len() as u32)
    }

    fn built_positions(&self, kind: &StructureKind) -> Vec<Position> {
        self.structures.get(kind).cloned().unwrap_or_default()
    }

    fn upgrades_of(&self, kind: &StructureKind) -> Vec<StructureKind> {
        self.upgrades.get(kind).cloned().unwrap_or_default()
    }
}

impl ItemInventory for SandboxColony {
    fn item_count(&self, kind: &ItemKind) -> u32 {
        self.items.get(kind).copied().unwrap_or(0)
    }
}

impl Population for SandboxColony {
    fn units(&self) -> Vec<UnitId> {
        self.members.keys().copied().collect()
    }

    fn population_size(&self) -> u32 {
        self.members.values().filter(|m| !m.has_trait(MinionTrait::NoLimit)).count() as u32
    }

    fn max_population(&self) -> u32 {
        self.max_population
    }

    fn unit_position(&self, unit: UnitId) -> Option<Position> {
        self.members.get(&unit).map(|m| m.position)
    }

    fn is_pregnant(&self, unit: UnitId) -> bool {
        self.members.get(&unit).is_some_and(|m| m.pregnant)
    }

    fn end_pregnancy(&mut self, unit: UnitId) {
        self.set_pregnant(unit, false);
    }

    fn allocate_unit_id(&mut self) -> UnitId {
        self.next_id()
    }

    fn add_unit(&mut self, unit: NewUnit, position: Position, traits: &[MinionTrait]) {
        self.members.insert(
            unit.id,
            Member {
                kind: unit.kind,
                position,
                traits: traits.to_vec(),
                experience: unit.experience_bonus,
                pregnant: false,
            },
        );
    }

    fn enlist_recruit(&mut self, unit: UnitId, traits: &[MinionTrait]) {
        let mut found = None;
        for faction in self.factions.values_mut() {
            if let Some(index) = faction.units.iter().position(|(u, _)| u.id == unit) {
                found = Some(faction.units.remove(index).0);
                break;
            }
        }
        let Some(recruit) = found else {
            tracing::warn!("Recruit {} is not part of any faction", unit);
            return;
        };
        let origin = self.leader.unwrap_or_default();
        let position = self.free_cell_near(&recruit.kind, origin);
        self.members.insert(
            unit,
            Member { kind: recruit.kind, position, traits: traits.to_vec(), experience: 0, pregnant: false },
        );
    }

    fn form_team(&mut self, members: &[UnitId]) {
        self.teams.push(members.to_vec());
    }
}

impl TechnologyStore for SandboxColony {
    fn has_technology(&self, tech: &TechId) -> bool {
        self.technologies.contains(tech)
    }
}

impl WorldClock for SandboxColony {
    fn global_time(&self) -> f64 {
        self.time
    }

    fn sunlight(&self) -> SunlightState {
        self.sunlight
    }
}

impl FactionDirectory for SandboxColony {
    fn faction_name(&self, faction: &FactionId) -> Option<String> {
        self.factions.get(faction).map(|f| f.name.clone())
    }

    fn is_faction_discovered(&self, faction: &FactionId) -> bool {
        self.factions.get(faction).is_some_and(|f| f.discovered)
    }

    fn faction_units(&self, faction: &FactionId, with_trait: MinionTrait) -> Vec<UnitRef> {
        self.factions
            .get(faction)
            .map(|f| {
                f.units
                    .iter()
                    .filter(|(_, t)| *t == with_trait)
                    .map(|(unit, _)| unit.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Terrain for SandboxColony {
    fn can_occupy(&self, _kind: &UnitKind, position: Position) -> bool {
        self.in_bounds(position)
            && !self.blocked.contains(&position)
            && !self.members.values().any(|m| m.position == position)
    }

    fn leader_position(&self) -> Option<Position> {
        self.leader
    }

    fn territory(&self) -> Vec<Position> {
        self.territory.clone()
    }

    fn extended_territory(&self, min_radius: u32, max_radius: u32) -> Vec<Position> {
        if self.territory.is_empty() {
            return Vec::new();
        }
        // Multi-source BFS over 8-neighbours yields Chebyshev distance to the territory
        let index = |pos: Position| (pos.y * self.width + pos.x) as usize;
        let mut distance = vec![u32::MAX; (self.width * self.height).max(0) as usize];
        let mut queue = VecDeque::new();
        for pos in &self.territory {
            if self.in_bounds(*pos) && distance[index(*pos)] == u32::MAX {
                distance[index(*pos)] = 0;
                queue.push_back(*pos);
            }
        }
        let mut ret = Vec::new();
        while let Some(pos) = queue.pop_front() {
            let d = distance[index(pos)];
            if d >= min_radius {
                ret.push(pos);
            }
            if d == max_radius {
                continue;
            }
            for next in pos.neighbors8() {
                if self.in_bounds(next) && distance[index(next)] == u32::MAX {
                    distance[index(next)] = d + 1;
                    queue.push_back(next);
                }
            }
        }
        ret.sort();
        ret
    }
}
