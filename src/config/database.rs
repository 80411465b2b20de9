//! PostgreSQL settings for the trip store and offer audit log.
//!
//! The section is optional: when `RIDE_DISPATCH__DATABASE__URL` is absent the
//! service runs on in-memory adapters.

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound on the pool; assignment writes are short single-row updates.
const MAX_POOL_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long an assignment write may wait for a connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Apply `migrations/` at startup.
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("database.url"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections == 0 || self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::InvalidPoolSize(MAX_POOL_SIZE));
        }
        if self.acquire_timeout_secs == 0 {
            return Err(ValidationError::MissingRequired("database.acquire_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            run_migrations: false,
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_acquire_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rides_db() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgresql://dispatch@localhost:5432/rides".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_validate_once_url_is_set() {
        assert!(DatabaseConfig::default().validate().is_err());
        assert!(rides_db().validate().is_ok());
        assert!(!rides_db().run_migrations);
    }

    #[test]
    fn rejects_non_postgres_url() {
        let config = DatabaseConfig {
            url: "mysql://localhost/rides".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn pool_size_is_bounded() {
        for size in [0, MAX_POOL_SIZE + 1] {
            let config = DatabaseConfig {
                max_connections: size,
                ..rides_db()
            };
            assert!(matches!(
                config.validate(),
                Err(ValidationError::InvalidPoolSize(_))
            ));
        }
    }
}
