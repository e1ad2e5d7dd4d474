//! Pending immigration candidates
//!
//! A candidate is a generated group waiting for the keeper to accept or
//! reject it. Rolled candidates expire after the configured timeout;
//! persistent ones never expire and are regenerated in place once used.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collective::Collective;
use crate::core::types::{CandidateId, UnitId, UnitRef};
use crate::immigration::requirement::Group;
use crate::immigration::template::ImmigrantTemplate;

/// End time that expires a candidate on the next sweep
pub const FORCE_EXPIRE: f64 = -1.0;

/// Where the units of a candidate come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateUnits {
    /// Newly generated units owned by the candidate until accepted
    Fresh(Vec<UnitRef>),
    /// Existing units of another faction
    Recruits(Vec<UnitRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub units: CandidateUnits,
    /// Index of the originating template
    pub template: usize,
    /// `None` for persistent templates
    pub end_time: Option<f64>,
}

impl Candidate {
    /// Builds the unit set of a new candidate.
    ///
    /// Recruitment templates reference one spare unit of the ally; every
    /// other template gets `group.count` fresh units of the kind matching
    /// the template's generation count.
    pub fn generate<C>(
        template: &ImmigrantTemplate,
        group: Group,
        num_generated: usize,
        timeout: f64,
        collective: &mut C,
    ) -> Self
    where
        C: Collective + ?Sized,
    {
        let units = match template.recruitment() {
            Some(info) => CandidateUnits::Recruits(
                info.recruits(template.unit_kind(0), &*collective).into_iter().take(1).collect(),
            ),
            None => {
                let kind = template.unit_kind(num_generated);
                CandidateUnits::Fresh(
                    (0..group.count)
                        .map(|_| UnitRef { id: collective.allocate_unit_id(), kind: kind.clone() })
                        .collect(),
                )
            }
        };
        let end_time = if template.persistent {
            None
        } else {
            Some(collective.global_time() + timeout)
        };
        Self { units, template: group.template, end_time }
    }

    pub fn units(&self) -> &[UnitRef] {
        match &self.units {
            CandidateUnits::Fresh(units) | CandidateUnits::Recruits(units) => units,
        }
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units().iter().map(|u| u.id).collect()
    }

    pub fn group(&self) -> Group {
        Group::new(self.template, self.units().len() as u32)
    }

    pub fn is_recruitment(&self) -> bool {
        matches!(self.units, CandidateUnits::Recruits(_))
    }

    /// No units left, or past its end time
    pub fn is_unavailable(&self, now: f64) -> bool {
        self.units().is_empty() || self.end_time.is_some_and(|end| end < now)
    }

    fn forget_unit(&mut self, unit: UnitId) {
        match &mut self.units {
            CandidateUnits::Fresh(units) | CandidateUnits::Recruits(units) => units.retain(|u| u.id != unit),
        }
    }
}

/// All candidates of one collective, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePool {
    candidates: BTreeMap<CandidateId, Candidate>,
    id_counter: u32,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate under a fresh id
    pub fn insert(&mut self, candidate: Candidate) -> CandidateId {
        self.id_counter += 1;
        let id = CandidateId(self.id_counter);
        self.candidates.insert(id, candidate);
        id
    }

    /// Replaces the candidate at `id`, keeping the slot
    pub fn replace(&mut self, id: CandidateId, candidate: Candidate) {
        self.candidates.insert(id, candidate);
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(&id)
    }

    pub fn remove(&mut self, id: CandidateId) -> Option<Candidate> {
        self.candidates.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CandidateId, &Candidate)> {
        self.candidates.iter().map(|(id, c)| (*id, c))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Force-expires a rolled candidate. Persistent ones cannot be rejected.
    pub fn reject(&mut self, id: CandidateId, templates: &[ImmigrantTemplate]) {
        if let Some(candidate) = self.candidates.get_mut(&id) {
            if !templates[candidate.template].persistent {
                candidate.end_time = Some(FORCE_EXPIRE);
            }
        }
    }

    /// Removes unavailable rolled candidates and returns them.
    ///
    /// Persistent candidates are kept; the caller regenerates those that
    /// ran out of units (see `exhausted_persistent`).
    pub fn sweep(&mut self, now: f64, templates: &[ImmigrantTemplate]) -> Vec<(CandidateId, Candidate)> {
        let expired: Vec<CandidateId> = self
            .candidates
            .iter()
            .filter(|(_, c)| c.is_unavailable(now) && !templates[c.template].persistent)
            .map(|(id, _)| *id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.candidates.remove(&id).map(|c| (id, c)))
            .collect()
    }

    /// Persistent slots whose candidate has no units
    pub fn exhausted_persistent(&self, templates: &[ImmigrantTemplate]) -> Vec<(CandidateId, usize)> {
        self.candidates
            .iter()
            .filter(|(_, c)| templates[c.template].persistent && c.units().is_empty())
            .map(|(id, c)| (*id, c.template))
            .collect()
    }

    /// Weighted choice among groups; `None` when every weight is zero
    pub fn roll<R: Rng>(groups: &[(Group, f64)], rng: &mut R) -> Option<Group> {
        let weights: Vec<f64> = groups.iter().map(|(_, w)| *w).collect();
        let index = WeightedIndex::new(&weights).ok()?;
        Some(groups[index.sample(rng)].0)
    }

    /// Drops a unit that left the world or already joined from every pending candidate
    pub fn forget_unit(&mut self, unit: UnitId) {
        for candidate in self.candidates.values_mut() {
            candidate.forget_unit(unit);
        }
    }
}
