//! Immigration events for notifications and history

use serde::{Deserialize, Serialize};

use crate::core::types::{CandidateId, UnitId};

/// Something that happened to a candidate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationEvent {
    pub time: f64,
    pub candidate: CandidateId,
    /// Name of the originating template
    pub template: String,
    pub event_type: ImmigrationEventType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ImmigrationEventType {
    /// A rolled candidate went on offer
    Offered { group_size: usize },
    /// An offer timed out or was rejected
    Expired,
    /// A group was accepted and is now part of the collective
    Joined { units: Vec<UnitId> },
}

impl ImmigrationEvent {
    /// Short line for message logs
    pub fn describe(&self) -> String {
        match &self.event_type {
            ImmigrationEventType::Offered { group_size } if *group_size > 1 => {
                format!("A group of {} {} wants to join", group_size, self.template)
            }
            ImmigrationEventType::Offered { .. } => format!("A {} wants to join", self.template),
            ImmigrationEventType::Expired => format!("The {} offer has lapsed", self.template),
            ImmigrationEventType::Joined { units } if units.len() > 1 => {
                format!("{} {} have joined", units.len(), self.template)
            }
            ImmigrationEventType::Joined { .. } => format!("A {} has joined", self.template),
        }
    }
}
