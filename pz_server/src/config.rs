//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::str::FromStr;

use padel_zones::db::{DatabaseConfig, DatabaseConfigError};
use padel_zones::scoring::MatchFormat;
use padel_zones::tournament::models::{MAX_MATCH_MINUTES, MAX_ZONE_SIZE};

/// Where category snapshots are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend {other:?}, expected postgres or memory"),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address, metrics disabled when `None`
    pub metrics_bind: Option<SocketAddr>,
    pub storage: StorageBackend,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Defaults for tournaments configured without explicit venue settings
    pub tournament_defaults: TournamentDefaults,
}

/// Venue defaults applied to new tournaments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentDefaults {
    /// Minutes reserved for every match
    pub match_duration_minutes: u32,
    /// Courts available at the venue
    pub courts: u8,
    pub match_format: MatchFormat,
    /// Maximum entrants in a zone
    pub max_zone_size: usize,
}

impl Default for TournamentDefaults {
    fn default() -> Self {
        Self {
            match_duration_minutes: 60,
            courts: 3,
            match_format: MatchFormat::BestOfThree,
            max_zone_size: MAX_ZONE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `storage_override` - Optional storage backend override (from CLI args)
    /// * `metrics_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
        metrics_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 6969))),
        };

        let metrics_bind = match metrics_override {
            Some(addr) => Some(addr),
            None => parse_env("METRICS_BIND")?,
        };

        let storage = match storage_override {
            Some(storage) => storage,
            None => parse_env("STORAGE_BACKEND")?.unwrap_or(StorageBackend::Postgres),
        };

        let mut database = match DatabaseConfig::from_env() {
            Ok(config) => config,
            Err(DatabaseConfigError::MissingUrl) => DatabaseConfig::development(),
            Err(e) => {
                return Err(ConfigError::Invalid {
                    var: "DATABASE".to_string(),
                    reason: e.to_string(),
                });
            }
        };
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let fallback = TournamentDefaults::default();
        let tournament_defaults = TournamentDefaults {
            match_duration_minutes: parse_env("DEFAULT_MATCH_MINUTES")?
                .unwrap_or(fallback.match_duration_minutes),
            courts: parse_env("DEFAULT_COURTS")?.unwrap_or(fallback.courts),
            match_format: fallback.match_format,
            max_zone_size: parse_env("DEFAULT_MAX_ZONE_SIZE")?.unwrap_or(fallback.max_zone_size),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            storage,
            database,
            tournament_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let defaults = &self.tournament_defaults;

        if !(1..=MAX_MATCH_MINUTES).contains(&defaults.match_duration_minutes) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_MATCH_MINUTES".to_string(),
                reason: format!("Must be between 1 and {MAX_MATCH_MINUTES}"),
            });
        }

        if defaults.courts == 0 {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_COURTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !(3..=MAX_ZONE_SIZE).contains(&defaults.max_zone_size) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_MAX_ZONE_SIZE".to_string(),
                reason: format!("Must be between 3 and {MAX_ZONE_SIZE}"),
            });
        }

        if self.storage == StorageBackend::Postgres && self.database.database_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a PostgreSQL URL or run with --storage memory".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from the server bind address".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional environment variable, rejecting values that do not parse
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Cannot parse {value:?}"),
        }),
        Err(_) => Ok(None),
    }
}
