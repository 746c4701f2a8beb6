//! services/api/src/config.rs
//!
//! Service settings: listener, pipeline credentials, image polling and the
//! location of the local store. Read once at startup from the process
//! environment, with a `.env` file honoured outside of tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: String,
    pub storage_path: PathBuf,
    pub airia_api_url: String,
    pub airia_api_key: String,
    pub airia_timeout: Duration,
    pub feedback_api_url: String,
    pub freepik_api_key: Option<String>,
    pub freepik_api_url: String,
    pub freepik_max_attempts: u32,
    pub freepik_poll_interval: Duration,
}

impl Config {
    /// Reads the process environment. `.env` is not consulted under `cfg(test)`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5001".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let storage_path = var("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/elearning_store.json"));

        // --- Content Pipeline ---
        let airia_api_url = var("AIRIA_API_URL")
            .ok_or_else(|| ConfigError::MissingVar("AIRIA_API_URL".to_string()))?;
        let airia_api_key = var("AIRIA_API_KEY")
            .ok_or_else(|| ConfigError::MissingVar("AIRIA_API_KEY".to_string()))?;
        let airia_timeout = Duration::from_secs(parse_number(&var, "AIRIA_TIMEOUT_SECS", 420)?);
        let feedback_api_url = var("FEEDBACK_API_URL").unwrap_or_else(|| airia_api_url.clone());

        // --- Image Generation (optional) ---
        let freepik_api_key = var("FREEPIK_API_KEY").filter(|k| !k.trim().is_empty());
        let freepik_api_url = var("FREEPIK_API_URL").unwrap_or_else(|| {
            "https://api.freepik.com/v1/ai/text-to-image/seedream-v4".to_string()
        });
        let freepik_max_attempts = parse_number(&var, "FREEPIK_MAX_ATTEMPTS", 60)?;
        let freepik_poll_interval =
            Duration::from_millis(parse_number(&var, "FREEPIK_POLL_INTERVAL_MS", 2000)?);

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            storage_path,
            airia_api_url,
            airia_api_key,
            airia_timeout,
            feedback_api_url,
            freepik_api_key,
            freepik_api_url,
            freepik_max_attempts,
            freepik_poll_interval,
        })
    }
}

fn parse_number<F, T>(var: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
