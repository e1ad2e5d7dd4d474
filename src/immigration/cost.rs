//! Exponential immigration costs
//!
//! Cheap recruits become scarce: once a template has more living units than
//! its free allowance, each further unit doubles in price every
//! `num_to_double_cost` units. Only units still in the collective count.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::collective::Population;
use crate::core::types::{CostInfo, UnitId};

/// Price curve keyed on how many of a template's units are alive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentialCost {
    pub base: CostInfo,
    /// Living units below this count join for free
    pub num_free: u32,
    /// Units per doubling of the price
    pub num_to_double_cost: u32,
}

impl ExponentialCost {
    pub fn new(base: CostInfo, num_free: u32, num_to_double_cost: u32) -> Self {
        Self { base, num_free, num_to_double_cost }
    }

    /// Price given `num_type` living units generated from the template
    pub fn price(&self, num_type: u32) -> CostInfo {
        if num_type < self.num_free {
            return CostInfo::new(self.base.resource.clone(), 0);
        }
        let exponent = (num_type - self.num_free) as f64 / self.num_to_double_cost.max(1) as f64;
        let value = (self.base.value as f64 * 2f64.powf(exponent)).floor();
        CostInfo::new(self.base.resource.clone(), value.min(u32::MAX as f64) as u32)
    }
}

/// Units produced per template, in generation order.
///
/// Entries are never removed; membership in the population decides whether
/// they still count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedHistory {
    generated: Vec<Vec<UnitId>>,
}

impl GeneratedHistory {
    pub fn new(num_templates: usize) -> Self {
        Self { generated: vec![Vec::new(); num_templates] }
    }

    pub fn record(&mut self, template: usize, unit: UnitId) {
        if self.generated.len() <= template {
            self.generated.resize(template + 1, Vec::new());
        }
        self.generated[template].push(unit);
    }

    /// Total ever generated, dead or alive
    pub fn total(&self, template: usize) -> usize {
        self.generated.get(template).map_or(0, |units| units.len())
    }

    /// Generated units of a template still in the collective
    pub fn living<C>(&self, template: usize, collective: &C) -> u32
    where
        C: Population + ?Sized,
    {
        let Some(units) = self.generated.get(template) else {
            return 0;
        };
        let existing: AHashSet<UnitId> = collective.units().into_iter().collect();
        units.iter().filter(|unit| existing.contains(unit)).count() as u32
    }

    /// Current price of one unit of `template` under `cost`
    pub fn calculate_cost<C>(&self, template: usize, cost: &ExponentialCost, collective: &C) -> CostInfo
    where
        C: Population + ?Sized,
    {
        cost.price(self.living(template, collective))
    }
}
