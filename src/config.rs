//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Redis URL for the rate cache; absent selects the in-process backend
    pub redis_url: Option<String>,

    /// Base URL of the external exchange-rate source
    pub rate_source_url: String,

    /// Outbound queue URL for large-transfer events
    pub events_queue_url: String,

    /// Deadline applied to each ledger operation
    pub operation_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        let rate_source_url =
            env::var("RATE_SOURCE_URL").map_err(|_| ConfigError::MissingEnv("RATE_SOURCE_URL"))?;

        let events_queue_url = env::var("EVENTS_QUEUE_URL")
            .map_err(|_| ConfigError::MissingEnv("EVENTS_QUEUE_URL"))?;

        let operation_timeout_ms: u64 = env::var("OPERATION_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("OPERATION_TIMEOUT_MS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            redis_url,
            rate_source_url,
            events_queue_url,
            operation_timeout: Duration::from_millis(operation_timeout_ms),
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
