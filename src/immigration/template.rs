//! Immigrant templates - the configured sources of new minions
//!
//! A template says which unit kinds it produces, what the collective must
//! provide before a group may join, how large groups are, how often the
//! template is rolled and where the group appears. Templates are loaded once
//! with the collective's configuration and never change afterwards.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{ImmigrationError, Result};
use crate::core::types::{MinionTrait, StructureKind, UnitKind};
use crate::immigration::requirement::{RecruitmentInfo, Requirement};

/// Inclusive range of group sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSize {
    pub min: u32,
    pub max: u32,
}

impl GroupSize {
    pub fn single() -> Self {
        Self { min: 1, max: 1 }
    }

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn roll<R: Rng>(&self, rng: &mut R) -> u32 {
        if self.min >= self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

impl Default for GroupSize {
    fn default() -> Self {
        Self::single()
    }
}

/// Where an accepted group is placed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnLocation {
    /// Next to the collective's leader
    NearLeader,
    /// In the band around the territory, falling back to the territory itself
    #[default]
    OutsideTerritory,
    /// On built structures of a kind
    Structure(StructureKind),
    /// At the positions of pregnant units
    Pregnancy,
}

fn default_frequency() -> f64 {
    1.0
}

/// Immutable configuration of one immigration source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmigrantTemplate {
    /// Human-readable name, also used in logs
    pub name: String,
    /// Unit kinds produced; cycled by generation count
    pub unit_kinds: Vec<UnitKind>,
    /// Traits applied to every unit of an accepted group
    #[serde(default)]
    pub traits: Vec<MinionTrait>,
    /// Checked before acceptance and committed on acceptance
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Cheap filters gating generation and offer visibility; also committed
    #[serde(default)]
    pub preliminary_requirements: Vec<Requirement>,
    #[serde(default)]
    pub group_size: GroupSize,
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Persistent templates are always on offer and regenerate after acceptance
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub spawn_location: SpawnLocation,
    /// Bundle groups larger than one into a team
    #[serde(default)]
    pub auto_team: bool,
    /// Number of free acceptances performed when the collective starts
    #[serde(default)]
    pub initial_recruitment: u32,
    /// Cap on the total number of units this template may generate
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ImmigrantTemplate {
    pub fn new(name: impl Into<String>, unit_kind: impl Into<UnitKind>, traits: Vec<MinionTrait>) -> Self {
        Self {
            name: name.into(),
            unit_kinds: vec![unit_kind.into()],
            traits,
            requirements: Vec::new(),
            preliminary_requirements: Vec::new(),
            group_size: GroupSize::single(),
            frequency: default_frequency(),
            persistent: false,
            spawn_location: SpawnLocation::default(),
            auto_team: false,
            initial_recruitment: 0,
            limit: None,
        }
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_preliminary_requirement(mut self, requirement: Requirement) -> Self {
        self.preliminary_requirements.push(requirement);
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_group_size(mut self, min: u32, max: u32) -> Self {
        self.group_size = GroupSize::new(min, max);
        self
    }

    pub fn with_spawn_location(mut self, location: SpawnLocation) -> Self {
        self.spawn_location = location;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn with_auto_team(mut self) -> Self {
        self.auto_team = true;
        self
    }

    pub fn with_initial_recruitment(mut self, count: u32) -> Self {
        self.initial_recruitment = count;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every requirement, full and preliminary
    pub fn all_requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().chain(self.preliminary_requirements.iter())
    }

    /// The ally this template recruits from, if it is a recruitment template
    pub fn recruitment(&self) -> Option<&RecruitmentInfo> {
        self.all_requirements().find_map(|requirement| match requirement {
            Requirement::Recruitment(info) => Some(info),
            _ => None,
        })
    }

    pub fn has_trait(&self, t: MinionTrait) -> bool {
        self.traits.contains(&t)
    }

    /// Unit kind for the next unit given how many this template produced so far
    pub fn unit_kind(&self, num_generated: usize) -> &UnitKind {
        &self.unit_kinds[num_generated % self.unit_kinds.len()]
    }

    /// Whether the template may still generate after `num_generated` units
    pub fn is_available(&self, num_generated: usize) -> bool {
        self.limit.map_or(true, |limit| num_generated < limit)
    }

    /// Reject templates that could never produce a valid candidate
    pub fn validate(&self) -> Result<()> {
        if self.unit_kinds.is_empty() {
            return Err(ImmigrationError::invalid_template(&self.name, "no unit kinds"));
        }
        if self.group_size.min == 0 || self.group_size.min > self.group_size.max {
            return Err(ImmigrationError::invalid_template(
                &self.name,
                format!("bad group size {}..={}", self.group_size.min, self.group_size.max),
            ));
        }
        if !self.frequency.is_finite() || self.frequency < 0.0 {
            return Err(ImmigrationError::invalid_template(
                &self.name,
                format!("bad frequency {}", self.frequency),
            ));
        }
        if let SpawnLocation::Structure(kind) = &self.spawn_location {
            if kind.as_str().is_empty() {
                return Err(ImmigrationError::invalid_template(&self.name, "empty spawn structure"));
            }
        }
        for requirement in self.all_requirements() {
            requirement
                .validate()
                .map_err(|reason| ImmigrationError::invalid_template(&self.name, reason))?;
        }
        Ok(())
    }
}
