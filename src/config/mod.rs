//! Application configuration module
//!
//! Configuration is loaded from environment variables with the
//! `RIDE_DISPATCH` prefix; nested values use double underscores.
//!
//! # Example
//!
//! ```no_run
//! use ride_dispatch::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod auth;
mod database;
mod dispatch;
mod error;
mod server;

pub use auth::{AuthConfig, MIN_PRODUCTION_SECRET_LEN};
pub use database::DatabaseConfig;
pub use dispatch::DispatchConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; in-memory adapters are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    pub auth: AuthConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `RIDE_DISPATCH` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `RIDE_DISPATCH__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `RIDE_DISPATCH__DISPATCH__URGENT_WINDOW_SECS=45` -> `dispatch.urgent_window_secs = 45`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("RIDE_DISPATCH")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.auth.validate(&self.server.environment)?;
        self.dispatch.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
