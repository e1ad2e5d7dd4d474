//! Immigration controller - the per-collective orchestrator
//!
//! Once per tick `update` expires stale offers and may roll a new one.
//! Between ticks the keeper (player or AI) calls `accept` or `reject`.
//! Accepting either fully succeeds or changes nothing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collective::Collective;
use crate::core::config::{ImmigrationConfig, ImmigrationSettings};
use crate::core::error::Result;
use crate::core::types::{CandidateId, CostInfo, MinionTrait, NewUnit, Position, UnitId};
use crate::immigration::attraction::{AttractionKind, AttractionLedger};
use crate::immigration::candidate::{Candidate, CandidatePool, CandidateUnits};
use crate::immigration::cost::GeneratedHistory;
use crate::immigration::events::{ImmigrationEvent, ImmigrationEventType};
use crate::immigration::placement::{spawn_area, PlacementResolver};
use crate::immigration::requirement::{commit_requirements, Group, RequirementEngine};
use crate::immigration::template::ImmigrantTemplate;

/// An offer as shown to the keeper
#[derive(Debug, Clone)]
pub struct CandidateView<'a> {
    pub id: CandidateId,
    pub candidate: &'a Candidate,
    pub template: &'a ImmigrantTemplate,
    /// Current price of one unit, if the template charges anything
    pub cost: Option<CostInfo>,
}

/// Immigration state of one collective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Immigration {
    templates: Vec<ImmigrantTemplate>,
    settings: ImmigrationSettings,
    pool: CandidatePool,
    ledger: AttractionLedger,
    history: GeneratedHistory,
    initialized: bool,
    #[serde(skip)]
    events: Vec<ImmigrationEvent>,
}

impl Immigration {
    pub fn new(config: ImmigrationConfig) -> Result<Self> {
        config.validate()?;
        let history = GeneratedHistory::new(config.immigrants.len());
        Ok(Self {
            templates: config.immigrants,
            settings: config.settings,
            pool: CandidatePool::new(),
            ledger: AttractionLedger::new(),
            history,
            initialized: false,
            events: Vec::new(),
        })
    }

    pub fn templates(&self) -> &[ImmigrantTemplate] {
        &self.templates
    }

    pub fn settings(&self) -> &ImmigrationSettings {
        &self.settings
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn ledger(&self) -> &AttractionLedger {
        &self.ledger
    }

    pub fn history(&self) -> &GeneratedHistory {
        &self.history
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.pool.get(id)
    }

    fn engine(&self) -> RequirementEngine<'_> {
        RequirementEngine::new(&self.templates, &self.ledger, &self.history)
    }

    /// Free capacity of an attraction kind
    pub fn available_for<C>(&self, kind: &AttractionKind, collective: &C) -> u32
    where
        C: Collective + ?Sized,
    {
        self.ledger.available_for(kind, collective)
    }

    /// Advance one tick: expire offers, then maybe roll a new one
    pub fn update<C, R>(&mut self, collective: &mut C, rng: &mut R)
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        if !self.initialized {
            self.initialized = true;
            self.initialize_persistent(collective, rng);
        }
        let now = collective.global_time();
        for (id, candidate) in self.pool.sweep(now, &self.templates) {
            let name = self.templates[candidate.template].name.clone();
            tracing::debug!("Immigration candidate {} ({}) expired", id, name);
            self.push_event(now, id, candidate.template, ImmigrationEventType::Expired);
        }
        for (id, template) in self.pool.exhausted_persistent(&self.templates) {
            self.regenerate_persistent(id, template, collective, rng);
        }
        if rng.gen_bool(self.settings.immigrant_frequency) {
            self.roll_candidate(collective, rng);
        }
    }

    fn roll_candidate<C, R>(&mut self, collective: &mut C, rng: &mut R)
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        let groups: Vec<(Group, f64)> = {
            let engine = self.engine();
            self.templates
                .iter()
                .enumerate()
                .map(|(index, template)| {
                    let group = Group::new(index, template.group_size.roll(rng));
                    (group, engine.immigrant_chance(group, &*collective))
                })
                .collect()
        };
        let Some(group) = CandidatePool::roll(&groups, rng) else {
            return;
        };
        let template = &self.templates[group.template];
        let candidate = Candidate::generate(
            template,
            group,
            self.history.total(group.template),
            self.settings.candidate_timeout,
            collective,
        );
        let size = candidate.units().len();
        let id = self.pool.insert(candidate);
        tracing::debug!("Immigration candidate {} offered: {} x{}", id, template.name, size);
        let now = collective.global_time();
        self.push_event(now, id, group.template, ImmigrationEventType::Offered { group_size: size });
    }

    fn initialize_persistent<C, R>(&mut self, collective: &mut C, rng: &mut R)
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        for index in 0..self.templates.len() {
            if !self.templates[index].persistent {
                continue;
            }
            let candidate = Candidate::generate(
                &self.templates[index],
                Group::new(index, 1),
                self.history.total(index),
                self.settings.candidate_timeout,
                collective,
            );
            let id = self.pool.insert(candidate);
            for _ in 0..self.templates[index].initial_recruitment {
                self.accept(id, collective, rng);
            }
        }
    }

    /// Refills a persistent slot, or drops it once the template's cap is hit
    fn regenerate_persistent<C, R>(&mut self, id: CandidateId, index: usize, collective: &mut C, rng: &mut R)
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        let template = &self.templates[index];
        let total = self.history.total(index);
        if template.is_available(total) {
            let group = Group::new(index, template.group_size.roll(rng));
            let candidate =
                Candidate::generate(template, group, total, self.settings.candidate_timeout, collective);
            self.pool.replace(id, candidate);
        } else {
            self.pool.remove(id);
        }
    }

    /// Offers visible to the keeper: available and passing preliminary checks
    pub fn get_available<C>(&self, collective: &C) -> BTreeMap<CandidateId, CandidateView<'_>>
    where
        C: Collective + ?Sized,
    {
        let now = collective.global_time();
        let engine = self.engine();
        self.pool
            .iter()
            .filter(|(_, candidate)| {
                !candidate.is_unavailable(now)
                    && engine.preliminary_requirements_met(candidate.group(), collective)
            })
            .map(|(id, candidate)| {
                let view = CandidateView {
                    id,
                    candidate,
                    template: &self.templates[candidate.template],
                    cost: engine.unit_cost(candidate.template, collective),
                };
                (id, view)
            })
            .collect()
    }

    /// Per-requirement reasons a group of a template could not join now
    pub fn missing_requirements_for_group<C>(&self, group: Group, collective: &C) -> Vec<String>
    where
        C: Collective + ?Sized,
    {
        self.engine().missing_requirements(group, collective)
    }

    /// Every reason a pending candidate cannot be accepted now
    pub fn missing_requirements<C, R>(&self, id: CandidateId, collective: &C, rng: &mut R) -> Vec<String>
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        match self.pool.get(id) {
            Some(candidate) => self.candidate_missing_requirements(candidate, collective, rng),
            None => Vec::new(),
        }
    }

    fn candidate_missing_requirements<C, R>(&self, candidate: &Candidate, collective: &C, rng: &mut R) -> Vec<String>
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        let mut ret = self.engine().missing_requirements(candidate.group(), collective);
        let group_size = candidate.units().len() as u32;
        let template = &self.templates[candidate.template];
        if let (CandidateUnits::Recruits(units), Some(info)) = (&candidate.units, template.recruitment()) {
            let spares = info.recruits(template.unit_kind(0), collective);
            if units.iter().any(|unit| !spares.iter().any(|spare| spare.id == unit.id)) {
                ret.push("Recruit is no longer available.".to_string());
            }
        }
        let free_slots = collective.max_population().saturating_sub(collective.population_size());
        if !template.has_trait(MinionTrait::NoLimit) && group_size > free_slots {
            ret.push("Exceeds population limit".to_string());
        }
        if ret.is_empty() && self.spawn_positions(candidate, collective, rng).len() < group_size as usize {
            ret.push("Not enough room to spawn.".to_string());
        }
        ret
    }

    /// Distinct spawn positions for the whole group, or none
    pub fn spawn_positions<C, R>(&self, candidate: &Candidate, collective: &C, rng: &mut R) -> Vec<Position>
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        let template = &self.templates[candidate.template];
        let area = spawn_area(&template.spawn_location, collective, &self.settings);
        PlacementResolver::new(self.settings.spawn_attempts).pick_spawn_positions(
            candidate.units(),
            area,
            collective,
            rng,
        )
    }

    /// Accepts a candidate. Returns the units that joined; empty when the
    /// id is unknown or the group cannot join, in which case nothing changed.
    pub fn accept<C, R>(&mut self, id: CandidateId, collective: &mut C, rng: &mut R) -> Vec<UnitId>
    where
        C: Collective + ?Sized,
        R: Rng,
    {
        let Some(candidate) = self.pool.get(id).cloned() else {
            return Vec::new();
        };
        let now = collective.global_time();
        if candidate.is_unavailable(now) {
            return Vec::new();
        }
        let index = candidate.template;
        let missing = self.candidate_missing_requirements(&candidate, &*collective, rng);
        if !missing.is_empty() {
            tracing::debug!("Candidate {} refused: {}", id, missing.join("; "));
            return Vec::new();
        }
        let group_size = candidate.units().len();
        let spawn_pos = self.spawn_positions(&candidate, &*collective, rng);
        if spawn_pos.len() < group_size {
            tracing::debug!("Candidate {} refused: no room to spawn", id);
            return Vec::new();
        }

        let template = &self.templates[index];
        match &candidate.units {
            CandidateUnits::Fresh(units) => {
                for (i, (unit, pos)) in units.iter().zip(spawn_pos.iter()).enumerate() {
                    let experience_bonus = if i == 0 && group_size > 1 {
                        self.settings.leader_experience_bonus
                    } else {
                        0
                    };
                    let new_unit = NewUnit { id: unit.id, kind: unit.kind.clone(), experience_bonus };
                    collective.add_unit(new_unit, *pos, &template.traits);
                }
            }
            CandidateUnits::Recruits(units) => {
                // Recruits walk over from the ally; enlisting places them.
                for unit in units {
                    collective.enlist_recruit(unit.id, &template.traits);
                }
            }
        }
        // Members are in the population before committing so that each
        // unit's attraction claim sees the claims of the units before it.
        let joined = candidate.unit_ids();
        for unit in &joined {
            commit_requirements(template, index, *unit, &mut self.ledger, &self.history, collective);
        }
        for unit in &joined {
            self.history.record(index, *unit);
        }
        for unit in &joined {
            self.pool.forget_unit(*unit);
        }
        if template.auto_team && group_size > 1 {
            collective.form_team(&joined);
        }
        tracing::info!("{} x{} joined the collective", template.name, group_size);

        if !template.persistent {
            self.pool.remove(id);
        } else {
            self.regenerate_persistent(id, index, collective, rng);
        }
        self.push_event(now, id, index, ImmigrationEventType::Joined { units: joined.clone() });
        joined
    }

    /// Rejects a rolled candidate; persistent candidates ignore this
    pub fn reject(&mut self, id: CandidateId) {
        self.pool.reject(id, &self.templates);
    }

    /// Must be called when a unit leaves the world or the collective
    pub fn on_unit_removed(&mut self, unit: UnitId) {
        self.ledger.release(unit);
        self.pool.forget_unit(unit);
    }

    fn push_event(&mut self, time: f64, candidate: CandidateId, template: usize, event_type: ImmigrationEventType) {
        self.events.push(ImmigrationEvent {
            time,
            candidate,
            template: self.templates[template].name.clone(),
            event_type,
        });
    }

    /// Takes the events buffered since the last call
    pub fn drain_events(&mut self) -> Vec<ImmigrationEvent> {
        std::mem::take(&mut self.events)
    }

    /// JSON snapshot of the whole immigration state
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let immigration: Self = serde_json::from_str(json)?;
        immigration.settings.validate()?;
        for template in &immigration.templates {
            template.validate()?;
        }
        Ok(immigration)
    }
}
