//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;

use tally_core::money::Money;
use tally_core::reconciliation::DEFAULT_VARIANCE_THRESHOLD;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// HS256 secret shared with the token issuer
    pub jwt_secret: String,

    /// Absolute variance at which a reconciliation raises an alert
    pub variance_threshold: Money,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (environment, test map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: lookup("HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "./tally.db".to_string()),

            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,

            jwt_secret: lookup("JWT_SECRET")
                // In production this MUST be set via environment variable
                .unwrap_or_else(|| "tally-dev-secret-change-in-production".to_string()),

            variance_threshold: match lookup("VARIANCE_THRESHOLD") {
                Some(raw) => Money::parse_decimal(&raw)
                    .map_err(|_| ConfigError::InvalidValue("VARIANCE_THRESHOLD".to_string()))?,
                None => DEFAULT_VARIANCE_THRESHOLD,
            },
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.variance_threshold.is_negative() {
            return Err(ConfigError::InvalidValue("VARIANCE_THRESHOLD".to_string()));
        }
        if config.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
