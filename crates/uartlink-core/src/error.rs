use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid property {property}: {reason}")]
    InvalidProperty {
        property: &'static str,
        reason: String,
    },

    #[error("Malformed property document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a new invalid property error.
    pub fn invalid(property: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidProperty {
            property,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
