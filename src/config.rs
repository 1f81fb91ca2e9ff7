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

    /// Deadline for each ledger unit of work
    pub operation_timeout: Duration,

    /// Period of the idempotency key maintenance job
    pub maintenance_interval: Duration,

    /// Apply bundled migrations at startup
    pub run_migrations: bool,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format (text, json)
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let operation_timeout_ms: u64 = env::var("LEDGER_OPERATION_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LEDGER_OPERATION_TIMEOUT_MS"))?;
        if operation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("LEDGER_OPERATION_TIMEOUT_MS"));
        }

        let maintenance_interval_secs: u64 = env::var("IDEMPOTENCY_MAINTENANCE_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("IDEMPOTENCY_MAINTENANCE_INTERVAL_SECS"))?;
        if maintenance_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("IDEMPOTENCY_MAINTENANCE_INTERVAL_SECS"));
        }

        let run_migrations = env::var("RUN_MIGRATIONS")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RUN_MIGRATIONS"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("text") | Err(_) => LogFormat::Text,
            Ok(_) => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            operation_timeout: Duration::from_millis(operation_timeout_ms),
            maintenance_interval: Duration::from_secs(maintenance_interval_secs),
            run_migrations,
            environment,
            log_format,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
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
