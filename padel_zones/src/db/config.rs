//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Database configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseConfigError {
    #[error("DATABASE_URL must be set")]
    MissingUrl,

    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

fn env_number<T: FromStr>(name: &'static str, default: T) -> Result<T, DatabaseConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| DatabaseConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is not set or a number does not parse
    pub fn from_env() -> Result<Self, DatabaseConfigError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| DatabaseConfigError::MissingUrl)?,
            max_connections: env_number("DB_MAX_CONNECTIONS", 10)?,
            min_connections: env_number("DB_MIN_CONNECTIONS", 2)?,
            connection_timeout_secs: env_number("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: env_number("DB_IDLE_TIMEOUT", 600)?,
            max_lifetime_secs: env_number("DB_MAX_LIFETIME", 1800)?,
        })
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/padel_zones` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/padel_zones".to_string(),
            max_connections: 10,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
