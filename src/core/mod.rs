pub mod config;
pub mod error;
pub mod types;

pub use config::{ImmigrationConfig, ImmigrationSettings};
pub use error::{ImmigrationError, Result};
