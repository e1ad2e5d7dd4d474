//! Spawn placement for accepted groups
//!
//! Raw positions come from the template's spawn policy. Blocked raw
//! positions contribute their free neighbors so tightly packed structures
//! still yield room. Each unit then gets a distinct position by random
//! sampling with a bounded number of attempts; one failure aborts the whole
//! placement so a group is never spawned partially.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::collective::{Collective, Terrain};
use crate::core::config::ImmigrationSettings;
use crate::core::types::{Position, UnitRef};
use crate::immigration::template::SpawnLocation;

/// Raw candidate positions for a spawn policy
pub fn spawn_area<C>(location: &SpawnLocation, collective: &C, settings: &ImmigrationSettings) -> Vec<Position>
where
    C: Collective + ?Sized,
{
    match location {
        SpawnLocation::Structure(kind) => collective.built_positions(kind),
        SpawnLocation::OutsideTerritory => {
            let mut ret = collective
                .extended_territory(settings.outskirts_min_radius, settings.outskirts_max_radius);
            if ret.is_empty() {
                ret = collective.territory();
            }
            if ret.is_empty() {
                if let Some(leader) = collective.leader_position() {
                    ret = vec![leader];
                }
            }
            ret
        }
        SpawnLocation::NearLeader => collective.leader_position().into_iter().collect(),
        SpawnLocation::Pregnancy => collective
            .units()
            .into_iter()
            .filter(|unit| collective.is_pregnant(*unit))
            .filter_map(|unit| collective.unit_position(unit))
            .collect(),
    }
}

/// Assigns distinct positions to units, or nothing at all
pub struct PlacementResolver {
    pub attempts: u32,
}

impl PlacementResolver {
    pub fn new(attempts: u32) -> Self {
        Self { attempts }
    }

    /// One position per unit, in unit order; empty when any unit cannot be placed
    pub fn pick_spawn_positions<T, R>(
        &self,
        units: &[UnitRef],
        mut positions: Vec<Position>,
        terrain: &T,
        rng: &mut R,
    ) -> Vec<Position>
    where
        T: Terrain + ?Sized,
        R: Rng,
    {
        let Some(first) = units.first() else {
            return Vec::new();
        };
        if positions.is_empty() {
            return Vec::new();
        }
        for pos in positions.clone() {
            if !terrain.can_occupy(&first.kind, pos) {
                for neighbor in terrain.neighbors(pos) {
                    if terrain.can_occupy(&first.kind, neighbor) {
                        positions.push(neighbor);
                    }
                }
            }
        }
        let mut spawn_pos: Vec<Position> = Vec::with_capacity(units.len());
        for unit in units {
            let mut found = None;
            for _ in 0..self.attempts {
                let Some(&pos) = positions.choose(rng) else {
                    break;
                };
                if terrain.can_occupy(&unit.kind, pos) && !spawn_pos.contains(&pos) {
                    found = Some(pos);
                    break;
                }
            }
            match found {
                Some(pos) => spawn_pos.push(pos),
                None => {
                    tracing::warn!("Couldn't spawn immigrant {} ({})", unit.kind, unit.id);
                    return Vec::new();
                }
            }
        }
        spawn_pos
    }
}

impl Default for PlacementResolver {
    fn default() -> Self {
        Self::new(ImmigrationSettings::default().spawn_attempts)
    }
}
