//! # Cinematch Core
//!
//! Shared building blocks for the Cinematch services.
//!
//! ## Modules
//!
//! - `error`: Error type and `Result` alias
//! - `config`: Layered configuration loading and the `ConfigLoader` trait
//! - `observability`: Structured logging initialization

pub mod config;
pub mod error;
pub mod observability;

pub use config::{layered_source, load_dotenv, ConfigLoader};
pub use error::{CinematchError, Result};
pub use observability::{init_logging, LogConfig, LogFormat};
