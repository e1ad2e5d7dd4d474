//! Immigration - candidates offered to a collective and the rules for accepting them
//!
//! Templates describe who may come and what they ask for. The controller
//! rolls candidates from templates, keeps them on offer until they expire,
//! and commits their costs when the keeper accepts them.

pub mod attraction;
pub mod candidate;
pub mod controller;
pub mod cost;
pub mod events;
pub mod placement;
pub mod requirement;
pub mod template;

pub use attraction::{AttractionInfo, AttractionKind, AttractionLedger};
pub use candidate::{Candidate, CandidatePool, CandidateUnits};
pub use controller::{CandidateView, Immigration};
pub use cost::{ExponentialCost, GeneratedHistory};
pub use events::{ImmigrationEvent, ImmigrationEventType};
pub use placement::PlacementResolver;
pub use requirement::{Group, RecruitmentInfo, Requirement, RequirementEngine};
pub use template::{GroupSize, ImmigrantTemplate, SpawnLocation};
