//! Padel tournament server.
//!
//! Serves the zone and bracket engine over HTTP, backed by PostgreSQL or an
//! in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use padel_zones::TournamentManager;
use padel_zones::bracket::validate_all;
use padel_zones::db::{
    Database, InMemoryTournamentRepository, PgTournamentRepository, TournamentRepository,
};
use pico_args::Arguments;
use pz_server::api::{self, AppState};
use pz_server::config::{ServerConfig, StorageBackend};
use pz_server::{logging, metrics};

const HELP: &str = "\
Run the padel tournament zone and bracket server

USAGE:
  pz_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/padel_zones]
  --storage    BACKEND     postgres or memory          [default: env STORAGE_BACKEND or postgres]
  --metrics    IP:PORT     Prometheus scrape address   [default: env METRICS_BIND, disabled when unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  DEFAULT_MATCH_MINUTES    Match slot length for new tournaments [default: 60]
  DEFAULT_COURTS           Courts for new tournaments [default: 3]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let storage: Option<StorageBackend> = pargs.opt_value_from_str("--storage")?;
    let metrics_bind: Option<SocketAddr> = pargs.opt_value_from_str("--metrics")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, storage, metrics_bind)?;
    config.validate()?;

    // Every supported entrant count must have a consistent bracket layout
    validate_all().map_err(|e| anyhow::anyhow!("Bracket layout table is invalid: {}", e))?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exposed at http://{}/metrics", addr);
    }

    let repo: Arc<dyn TournamentRepository> = match config.storage {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected and migrated");
            Arc::new(PgTournamentRepository::new(db.pool().clone()))
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage, tournaments are lost on restart");
            Arc::new(InMemoryTournamentRepository::new())
        }
    };

    let state = AppState::new(TournamentManager::new(repo), config.tournament_defaults);
    let app = api::create_router(state);

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
