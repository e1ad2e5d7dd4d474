use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImmigrationError {
    #[error("Invalid immigrant template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("Invalid immigration settings: {0}")]
    InvalidSettings(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ImmigrationError {
    pub fn invalid_template(name: &str, reason: impl Into<String>) -> Self {
        ImmigrationError::InvalidTemplate {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImmigrationError>;
