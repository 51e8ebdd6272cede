//! Shared configuration loading for Cinematch services
//!
//! Configuration is layered: struct defaults < optional config file <
//! environment variables. Environment variables use a service prefix and a
//! double underscore between nested keys, e.g.
//! `CINEMATCH__RECOMMENDATION__K_NEIGHBORS=50`.
//!
//! # Example
//!
//! ```no_run
//! use cinematch_core::config::{layered_source, load_dotenv};
//!
//! # fn example() -> cinematch_core::Result<()> {
//! load_dotenv();
//! let settings = layered_source("config/cinematch", "CINEMATCH")?;
//! let port: Option<u16> = settings.get("server.port").ok();
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use std::path::PathBuf;

/// Configuration loader trait
///
/// Implemented by every top-level service configuration.
pub trait ConfigLoader: Sized {
    /// Load configuration from the layered sources
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a source cannot be parsed or a
    /// value has the wrong type.
    fn load() -> Result<Self>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` naming the offending key.
    fn validate(&self) -> Result<()>;
}

/// Load a `.env` file from the working directory or its parents
///
/// Returns the path that was loaded. A missing file is not an error.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env file");
            Some(path)
        }
        Err(_) => None,
    }
}

/// Build a layered configuration from an optional file and prefixed env vars
///
/// `file` is passed to `config::File::with_name`, so the extension is
/// resolved automatically (`.toml`, `.yaml`, `.json`, ...).
pub fn layered_source(file: &str, env_prefix: &str) -> Result<config::Config> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings)
}
