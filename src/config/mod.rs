//! Engine configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `DISCOUNT_ENGINE` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use discount_engine::config::EngineConfig;
//!
//! let config = EngineConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod ledger;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ledger::LedgerConfig;

use serde::Deserialize;

/// Root engine configuration
///
/// Load using [`EngineConfig::load()`] which reads from environment
/// variables.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Usage ledger configuration (retry budget)
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `DISCOUNT_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `DISCOUNT_ENGINE__DATABASE__URL=...` -> `database.url = ...`
    /// - `DISCOUNT_ENGINE__LEDGER__RESERVE_ATTEMPTS=5` ->
    ///   `ledger.reserve_attempts = 5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DISCOUNT_ENGINE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.ledger.validate()?;
        Ok(())
    }
}
