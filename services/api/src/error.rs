//! services/api/src/error.rs
//!
//! Startup errors for the API binary. Request-level failures never reach this
//! type; handlers map them to status codes directly.

use crate::config::ConfigError;
use elearning_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The local key-value file could not be opened or parsed.
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),

    /// An outbound client (pipeline or image service) could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid CORS origin '{origin}': {reason}")]
    InvalidCorsOrigin { origin: String, reason: String },

    /// Binding or serving the listener failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
