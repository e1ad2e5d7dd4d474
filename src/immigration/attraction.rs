//! Attraction ledger - shared capacity claimed by minions
//!
//! Attractions are built structures or held item categories that draw
//! specific immigrants. Each minion that joined because of an attraction
//! keeps occupying its share. Occupation is recomputed from the current
//! population on every query, so a unit that leaves the collective stops
//! counting even before its entries are purged.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::collective::{ItemInventory, Population, StructureInventory};
use crate::core::types::{ItemKind, StructureKind, UnitId};

/// A single source of attraction capacity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractionKind {
    Structure(StructureKind),
    Item(ItemKind),
}

impl AttractionKind {
    pub fn structure(kind: &str) -> Self {
        AttractionKind::Structure(kind.into())
    }

    pub fn item(kind: &str) -> Self {
        AttractionKind::Item(kind.into())
    }

    /// Display name, pluralized for counts above one
    pub fn name(&self, count: u32) -> String {
        let base = match self {
            AttractionKind::Structure(kind) => kind.as_str().replace('_', " "),
            AttractionKind::Item(kind) => kind.as_str().replace('_', " "),
        };
        if count > 1 {
            format!("{}s", base)
        } else {
            base
        }
    }
}

/// Claim on a list of interchangeable attraction kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttractionInfo {
    /// Capacity each unit occupies
    pub amount_claimed: u32,
    /// Kinds that satisfy the claim, in allocation order
    pub types: Vec<AttractionKind>,
}

impl AttractionInfo {
    pub fn new(amount_claimed: u32, types: Vec<AttractionKind>) -> Self {
        Self { amount_claimed, types }
    }
}

/// Total capacity of an attraction kind, including upgraded structures
pub fn attraction_value<C>(kind: &AttractionKind, collective: &C) -> u32
where
    C: StructureInventory + ItemInventory + ?Sized,
{
    match kind {
        AttractionKind::Structure(structure) => {
            let mut ret = collective.built_count(structure);
            for upgrade in collective.upgrades_of(structure) {
                ret += collective.built_count(&upgrade);
            }
            ret
        }
        AttractionKind::Item(item) => collective.item_count(item),
    }
}

/// Per-unit record of occupied attraction capacity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttractionLedger {
    occupation: AHashMap<UnitId, Vec<(AttractionKind, u32)>>,
}

impl AttractionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of `kind` held by current members of the collective
    pub fn occupied_for<C>(&self, kind: &AttractionKind, collective: &C) -> u32
    where
        C: Population + ?Sized,
    {
        let members: AHashSet<UnitId> = collective.units().into_iter().collect();
        self.occupation
            .iter()
            .filter(|(unit, _)| members.contains(unit))
            .flat_map(|(_, held)| held.iter())
            .filter(|(held_kind, _)| held_kind == kind)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Capacity of `kind` still free for new claims
    pub fn available_for<C>(&self, kind: &AttractionKind, collective: &C) -> u32
    where
        C: Population + StructureInventory + ItemInventory + ?Sized,
    {
        attraction_value(kind, collective).saturating_sub(self.occupied_for(kind, collective))
    }

    /// Returns `(total, available)` summed over the interchangeable kinds
    pub fn availability<C>(&self, attraction: &AttractionInfo, collective: &C) -> (u32, u32)
    where
        C: Population + StructureInventory + ItemInventory + ?Sized,
    {
        let mut value = 0;
        let mut occupation = 0;
        for kind in &attraction.types {
            let this_value = attraction_value(kind, collective);
            value += this_value;
            occupation += this_value.min(self.occupied_for(kind, collective));
        }
        (value, value.saturating_sub(occupation))
    }

    /// Claims `amount_claimed` for `unit`, greedily in declared kind order.
    ///
    /// Panics if capacity runs out: callers verify sufficiency first.
    pub fn occupy<C>(&mut self, unit: UnitId, attraction: &AttractionInfo, collective: &C)
    where
        C: Population + StructureInventory + ItemInventory + ?Sized,
    {
        let mut to_occupy = attraction.amount_claimed;
        for kind in &attraction.types {
            if to_occupy == 0 {
                break;
            }
            let now_occupy = to_occupy.min(self.available_for(kind, collective));
            if now_occupy > 0 {
                to_occupy -= now_occupy;
                let held = self.occupation.entry(unit).or_default();
                match held.iter_mut().find(|(held_kind, _)| held_kind == kind) {
                    Some((_, amount)) => *amount += now_occupy,
                    None => held.push((kind.clone(), now_occupy)),
                }
            }
        }
        assert_eq!(
            to_occupy, 0,
            "attraction occupied without sufficient capacity for unit {}",
            unit
        );
    }

    /// Drop every entry held by `unit`
    pub fn release(&mut self, unit: UnitId) {
        self.occupation.remove(&unit);
    }

    /// What `unit` currently holds
    pub fn holdings(&self, unit: UnitId) -> &[(AttractionKind, u32)] {
        self.occupation.get(&unit).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn tracked_units(&self) -> usize {
        self.occupation.len()
    }
}
