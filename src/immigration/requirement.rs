//! Requirement evaluation
//!
//! Every template carries a list of requirements of mixed kinds. They are
//! evaluated three ways:
//! - preliminary: a cheap yes/no over the template's preliminary list, used
//!   to gate generation and to hide offers whose conditions regressed
//! - blocking: every unmet requirement (full and preliminary lists) as a
//!   human-readable reason; empty means the group may join now
//! - commit: side effects paid per accepted unit (resources, attraction
//!   capacity, consumed pregnancies)
//!
//! The two lists are deliberately not unified. A kind listed only under
//! `requirements` never hides an offer, only blocks it.

use serde::{Deserialize, Serialize};

use crate::collective::{Collective, FactionDirectory};
use crate::core::types::{CostInfo, FactionId, MinionTrait, StructureKind, SunlightState, TechId, UnitId, UnitKind, UnitRef};
use crate::immigration::attraction::AttractionLedger;
use crate::immigration::cost::GeneratedHistory;
use crate::immigration::template::ImmigrantTemplate;

pub use crate::immigration::attraction::{AttractionInfo, AttractionKind};
pub use crate::immigration::cost::ExponentialCost;

fn default_recruit_trait() -> MinionTrait {
    MinionTrait::Fighter
}

/// Recruiting existing units away from another faction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruitmentInfo {
    pub faction: FactionId,
    /// Units the faction always keeps for itself
    #[serde(default)]
    pub min_population: u32,
    #[serde(default = "default_recruit_trait")]
    pub recruit_trait: MinionTrait,
}

impl RecruitmentInfo {
    /// Units of `kind` the faction can spare right now
    pub fn recruits<C>(&self, kind: &UnitKind, collective: &C) -> Vec<UnitRef>
    where
        C: FactionDirectory + ?Sized,
    {
        let mut ret: Vec<UnitRef> = collective
            .faction_units(&self.faction, self.recruit_trait)
            .into_iter()
            .filter(|unit| &unit.kind == kind)
            .collect();
        let spare = ret.len().saturating_sub(self.min_population as usize);
        ret.truncate(spare);
        ret
    }
}

/// One condition a template imposes on the collective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    Attraction(AttractionInfo),
    Technology { tech: TechId },
    Sunlight { state: SunlightState },
    Cost(CostInfo),
    ExponentialCost(ExponentialCost),
    Structure { structure: StructureKind },
    /// Some member must be pregnant; the pregnancy is consumed on commit
    Pregnancy,
    Recruitment(RecruitmentInfo),
}

impl Requirement {
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Requirement::Attraction(info) if info.types.is_empty() => {
                Err("attraction lists no kinds".into())
            }
            Requirement::Attraction(info) if info.amount_claimed == 0 => {
                Err("attraction claims nothing".into())
            }
            Requirement::ExponentialCost(cost) if cost.num_to_double_cost == 0 => {
                Err("exponential cost never doubles".into())
            }
            Requirement::Structure { structure } if structure.as_str().is_empty() => {
                Err("empty structure kind".into())
            }
            _ => Ok(()),
        }
    }
}

/// A template index plus a group size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub template: usize,
    pub count: u32,
}

impl Group {
    pub fn new(template: usize, count: u32) -> Self {
        Self { template, count }
    }
}

fn combine_with_or(names: Vec<String>) -> String {
    match names.len() {
        0 => String::new(),
        1 => names[0].clone(),
        n => format!("{} or {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

/// Read-only evaluation of requirements against a collective
pub struct RequirementEngine<'a> {
    pub templates: &'a [ImmigrantTemplate],
    pub ledger: &'a AttractionLedger,
    pub history: &'a GeneratedHistory,
}

impl<'a> RequirementEngine<'a> {
    pub fn new(
        templates: &'a [ImmigrantTemplate],
        ledger: &'a AttractionLedger,
        history: &'a GeneratedHistory,
    ) -> Self {
        Self { templates, ledger, history }
    }

    /// Reasons the group cannot join now; empty when it can
    pub fn missing_requirements<C>(&self, group: Group, collective: &C) -> Vec<String>
    where
        C: Collective + ?Sized,
    {
        let template = &self.templates[group.template];
        let mut ret = Vec::new();
        for requirement in template.all_requirements() {
            match requirement {
                Requirement::Attraction(attraction) => {
                    let (total, available) = self.ledger.availability(attraction, collective);
                    let required = attraction.amount_claimed * group.count;
                    if required > available {
                        let missing = required - available;
                        let extra = if total > 0 { "more " } else { "" };
                        let names = attraction.types.iter().map(|kind| kind.name(missing)).collect();
                        ret.push(format!("Requires {} {}{}", missing, extra, combine_with_or(names)));
                    }
                }
                Requirement::Technology { tech } => {
                    if !collective.has_technology(tech) {
                        ret.push(format!("Missing technology: {}", tech));
                    }
                }
                Requirement::Sunlight { state } => {
                    let current = collective.sunlight();
                    if *state != current {
                        ret.push(format!("Immigrant won't join during the {}", current.text()));
                    }
                }
                Requirement::Cost(cost) => {
                    if !collective.has_resource(&cost.times(group.count)) {
                        ret.push(format!("Not enough {}", cost.resource));
                    }
                }
                Requirement::ExponentialCost(cost) => {
                    let price = self.history.calculate_cost(group.template, cost, collective);
                    if !collective.has_resource(&price.times(group.count)) {
                        ret.push(format!("Not enough {}", cost.base.resource));
                    }
                }
                Requirement::Structure { structure } => {
                    if collective.built_count(structure) == 0 {
                        ret.push(format!("Requires {}", structure.as_str().replace('_', " ")));
                    }
                }
                Requirement::Pregnancy => {
                    if !has_pregnant_member(collective) {
                        ret.push("Requires a pregnant minion".to_string());
                    }
                }
                Requirement::Recruitment(info) => match collective.faction_name(&info.faction) {
                    None => {
                        ret.push("Ally doesn't exist.".to_string());
                        ret.push("Ally hasn't been discovered.".to_string());
                    }
                    Some(_) if !collective.is_faction_discovered(&info.faction) => {
                        ret.push("Ally hasn't been discovered.".to_string());
                    }
                    Some(name) => {
                        if info.recruits(template.unit_kind(0), collective).is_empty() {
                            ret.push(format!("{} don't have recruits available at this moment.", name));
                        }
                    }
                },
            }
        }
        ret
    }

    /// Cheap check over the template's preliminary requirements only
    pub fn preliminary_requirements_met<C>(&self, group: Group, collective: &C) -> bool
    where
        C: Collective + ?Sized,
    {
        let template = &self.templates[group.template];
        template.preliminary_requirements.iter().all(|requirement| match requirement {
            Requirement::Attraction(attraction) => self.ledger.availability(attraction, collective).1 > 0,
            Requirement::Technology { tech } => collective.has_technology(tech),
            Requirement::Sunlight { state } => *state == collective.sunlight(),
            Requirement::Structure { structure } => collective.built_count(structure) > 0,
            Requirement::Cost(cost) => collective.has_resource(&cost.times(group.count)),
            Requirement::ExponentialCost(cost) => {
                let price = self.history.calculate_cost(group.template, cost, collective);
                collective.has_resource(&price.times(group.count))
            }
            Requirement::Pregnancy => has_pregnant_member(collective),
            Requirement::Recruitment(info) => {
                collective.faction_name(&info.faction).is_some()
                    && collective.is_faction_discovered(&info.faction)
                    && !info.recruits(template.unit_kind(0), collective).is_empty()
            }
        })
    }

    /// Generation weight of a group: zero for persistent templates and
    /// failed preliminary checks
    pub fn immigrant_chance<C>(&self, group: Group, collective: &C) -> f64
    where
        C: Collective + ?Sized,
    {
        let template = &self.templates[group.template];
        if template.persistent || !self.preliminary_requirements_met(group, collective) {
            0.0
        } else {
            template.frequency
        }
    }

    /// Price of one unit, if the template charges anything
    pub fn unit_cost<C>(&self, template: usize, collective: &C) -> Option<CostInfo>
    where
        C: Collective + ?Sized,
    {
        let mut ret = None;
        for requirement in self.templates[template].all_requirements() {
            match requirement {
                Requirement::Cost(cost) => ret = Some(cost.clone()),
                Requirement::ExponentialCost(cost) => {
                    ret = Some(self.history.calculate_cost(template, cost, collective));
                }
                _ => {}
            }
        }
        ret
    }
}

fn has_pregnant_member<C>(collective: &C) -> bool
where
    C: Collective + ?Sized,
{
    collective.units().into_iter().any(|unit| collective.is_pregnant(unit))
}

/// Applies one accepted unit's requirement effects.
///
/// Technology, sunlight, structure and recruitment requirements have no
/// effect here.
pub fn commit_requirements<C>(
    template: &ImmigrantTemplate,
    template_index: usize,
    unit: UnitId,
    ledger: &mut AttractionLedger,
    history: &GeneratedHistory,
    collective: &mut C,
) where
    C: Collective + ?Sized,
{
    for requirement in template.all_requirements() {
        match requirement {
            Requirement::Attraction(attraction) => ledger.occupy(unit, attraction, &*collective),
            Requirement::Cost(cost) => collective.take_resource(cost),
            Requirement::ExponentialCost(cost) => {
                let price = history.calculate_cost(template_index, cost, &*collective);
                collective.take_resource(&price);
            }
            Requirement::Pregnancy => {
                let pregnant = collective.units().into_iter().find(|u| collective.is_pregnant(*u));
                if let Some(mother) = pregnant {
                    collective.end_pregnancy(mother);
                }
            }
            Requirement::Technology { .. }
            | Requirement::Sunlight { .. }
            | Requirement::Structure { .. }
            | Requirement::Recruitment(_) => {}
        }
    }
}
