//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Unique identifier for units (minions) owned by a collective or an ally
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Identifier of a pending immigration candidate
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub u32);

/// Simulation time in global time units
pub type GlobalTime = f64;

/// Grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The eight surrounding cells
    pub fn neighbors8(&self) -> Vec<Position> {
        let mut ret = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx != 0 || dy != 0 {
                    ret.push(Position::new(self.x + dx, self.y + dy));
                }
            }
        }
        ret
    }

    /// Chebyshev distance
    pub fn distance(&self, other: &Position) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }
}

/// Declares a string-backed identifier loaded from configuration.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Creature kind a template produces (e.g. "imp", "goblin")
    UnitKind
);
string_id!(
    /// Kind of built structure (furniture) in the collective's territory
    StructureKind
);
string_id!(
    /// Category of held items (e.g. "ranged_weapon")
    ItemKind
);
string_id!(
    /// Collective resource (e.g. "mana", "gold", "corpse")
    ResourceId
);
string_id!(
    /// Researchable technology
    TechId
);
string_id!(
    /// Another collective in the world, ally or enemy
    FactionId
);

/// Role flags applied to units when they join the collective
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinionTrait {
    Leader,
    Worker,
    Fighter,
    /// Does not count against the population limit
    NoLimit,
    NoEquipment,
    NoReturning,
}

/// Diurnal phase of the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunlightState {
    Day,
    Night,
}

impl SunlightState {
    pub fn text(&self) -> &'static str {
        match self {
            SunlightState::Day => "day",
            SunlightState::Night => "night",
        }
    }
}

/// An amount of a single collective resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostInfo {
    pub resource: ResourceId,
    pub value: u32,
}

impl CostInfo {
    pub fn new(resource: impl Into<ResourceId>, value: u32) -> Self {
        Self { resource: resource.into(), value }
    }

    /// Same resource, amount multiplied by `count`
    pub fn times(&self, count: u32) -> Self {
        Self {
            resource: self.resource.clone(),
            value: self.value.saturating_mul(count),
        }
    }

    pub fn is_free(&self) -> bool {
        self.value == 0
    }
}

/// A unit referenced by a candidate: its identity and kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: UnitId,
    pub kind: UnitKind,
}

/// A freshly generated unit handed to the population on acceptance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub id: UnitId,
    pub kind: UnitKind,
    /// Extra base experience levels granted on arrival
    pub experience_bonus: u32,
}
