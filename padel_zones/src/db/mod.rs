//! Category snapshot storage.
//!
//! `Database` owns the Postgres pool the server hands to
//! [`PgTournamentRepository`]; [`InMemoryTournamentRepository`] backs tests
//! and the `memory` storage mode.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::{DatabaseConfig, DatabaseConfigError};
pub use memory::InMemoryTournamentRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

/// Postgres pool holding category snapshots
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
}

impl Database {
    /// Connect to `config.database_url`
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = pool_options(config).connect(&config.database_url).await?;
        Ok(Self { pool })
    }

    /// Create the tournament and category snapshot tables when missing
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
