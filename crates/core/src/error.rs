//! Error types shared across Cinematch crates
//!
//! Missing-data conditions (unknown user, unknown genre, no neighbours) are
//! never errors: they surface as empty result lists. Everything in this enum
//! is either fatal at bootstrap or a guard rejecting an unreasonable request.

use std::path::PathBuf;

/// Result alias used throughout the workspace
pub type Result<T> = std::result::Result<T, CinematchError>;

#[derive(Debug, thiserror::Error)]
pub enum CinematchError {
    /// A required dataset file does not exist
    #[error("Dataset file not found: {}", path.display())]
    DatasetMissing { path: PathBuf },

    /// A dataset file exists but could not be read
    #[error("Failed to read dataset {}: {source}", path.display())]
    DatasetUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    /// The quadratic similarity build was refused for this catalog size
    #[error("Catalog too large for similarity rebuild: {items} items (limit {limit})")]
    CatalogTooLarge { items: usize, limit: usize },

    #[error("Logging initialization failed: {0}")]
    Logging(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CinematchError {
    /// Configuration error pointing at a specific key
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether the error should abort process bootstrap
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CatalogTooLarge { .. })
    }
}

impl From<config::ConfigError> for CinematchError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigurationError {
            message: err.to_string(),
            key: None,
        }
    }
}
