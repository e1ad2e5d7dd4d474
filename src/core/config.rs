//! Immigration configuration with documented constants
//!
//! Tunables live in `ImmigrationSettings`; the roster of immigrant
//! templates lives next to them in `ImmigrationConfig`. Both load from
//! TOML and are validated before the engine ever sees them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{ImmigrationError, Result};
use crate::immigration::template::ImmigrantTemplate;

/// Built-in roster for a dungeon keeper collective
pub const KEEPER_ROSTER: &str = include_str!("../../data/immigration/keeper.toml");

/// Tunables of the immigration engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmigrationSettings {
    /// How long a rolled candidate stays on offer (global time units)
    ///
    /// Persistent templates ignore this; their candidates never expire.
    pub candidate_timeout: f64,

    /// Chance per tick that a new candidate is rolled
    ///
    /// At 0.007 a keeper sees roughly one new offer every 140 ticks.
    pub immigrant_frequency: f64,

    /// Random draws per unit before placement gives up
    pub spawn_attempts: u32,

    /// Base experience levels granted to the first unit of a group
    pub leader_experience_bonus: u32,

    /// Inner radius of the band outside the territory used for spawning
    pub outskirts_min_radius: u32,

    /// Outer radius of that band
    pub outskirts_max_radius: u32,
}

impl Default for ImmigrationSettings {
    fn default() -> Self {
        Self {
            candidate_timeout: 500.0,
            immigrant_frequency: 0.007,
            spawn_attempts: 100,
            leader_experience_bonus: 2,
            outskirts_min_radius: 10,
            outskirts_max_radius: 20,
        }
    }
}

impl ImmigrationSettings {
    /// Validate settings for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !(self.candidate_timeout > 0.0) {
            return Err(ImmigrationError::InvalidSettings(format!(
                "candidate_timeout ({}) must be positive",
                self.candidate_timeout
            )));
        }
        if !(0.0..=1.0).contains(&self.immigrant_frequency) {
            return Err(ImmigrationError::InvalidSettings(format!(
                "immigrant_frequency ({}) must be within [0, 1]",
                self.immigrant_frequency
            )));
        }
        if self.spawn_attempts == 0 {
            return Err(ImmigrationError::InvalidSettings("spawn_attempts must be at least 1".into()));
        }
        if self.outskirts_min_radius > self.outskirts_max_radius {
            return Err(ImmigrationError::InvalidSettings(format!(
                "outskirts_min_radius ({}) exceeds outskirts_max_radius ({})",
                self.outskirts_min_radius, self.outskirts_max_radius
            )));
        }
        Ok(())
    }
}

/// Settings plus the immigrant roster of one collective
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImmigrationConfig {
    #[serde(default)]
    pub settings: ImmigrationSettings,
    #[serde(default)]
    pub immigrants: Vec<ImmigrantTemplate>,
}

impl ImmigrationConfig {
    pub fn new(settings: ImmigrationSettings, immigrants: Vec<ImmigrantTemplate>) -> Self {
        Self { settings, immigrants }
    }

    /// The built-in keeper roster
    pub fn keeper() -> Result<Self> {
        Self::parse_toml(KEEPER_ROSTER)
    }

    /// Load a roster from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a roster from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: ImmigrationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        for template in &self.immigrants {
            template.validate()?;
        }
        Ok(())
    }

    pub fn template_index(&self, name: &str) -> Option<usize> {
        self.immigrants.iter().position(|t| t.name == name)
    }
}
