//! HTTP API for the tournament server.
//!
//! Every endpoint is a thin JSON wrapper around one
//! [`TournamentManager`] operation. Engine rejections are mapped onto status
//! codes by error class (see [`error::status_for`]).
//!
//! # Modules
//!
//! - [`tournaments`]: Tournament configuration, entrant registration, zone and bracket generation
//! - [`zones`]: Zone views, results, roster changes, closing and tie-breaks
//! - [`brackets`]: Bracket results
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                                - Health check
//! PUT  /api/v1/tournaments/{tournament_id}                    - Configure tournament
//! GET  /api/v1/tournaments/{tournament_id}                    - Get configuration
//! PUT  /api/v1/tournaments/{tid}/categories/{cid}/entrants    - Register entrants
//! GET  /api/v1/tournaments/{tid}/categories/{cid}/entrants    - List entrants
//! POST /api/v1/tournaments/{tid}/categories/{cid}/zones       - Generate zones
//! GET  /api/v1/tournaments/{tid}/categories/{cid}/zones       - List zones
//! POST /api/v1/tournaments/{tid}/categories/{cid}/bracket     - Generate bracket
//! GET  /api/v1/tournaments/{tid}/categories/{cid}/bracket     - Get bracket
//! GET  /api/v1/zones/{zone_id}                                - Zone with matches and standings
//! GET  /api/v1/zones/{zone_id}/standings                      - Zone standings
//! POST /api/v1/zones/{zone_id}/close                          - Close zone
//! POST /api/v1/zones/{zone_id}/tie-break                      - Resolve triple tie
//! POST /api/v1/zones/{zone_id}/move                           - Move or swap entrant
//! POST /api/v1/zones/{zone_id}/withdraw                       - Withdraw entrant
//! POST /api/v1/zone-matches/{match_id}/result                 - Record zone result
//! POST /api/v1/bracket-matches/{match_id}/result              - Record bracket result
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod error;
pub mod request_id;
pub mod tournaments;
pub mod zones;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use padel_zones::TournamentManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::TournamentDefaults;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    /// Venue settings used when a configure request leaves them out
    pub defaults: TournamentDefaults,
}

impl AppState {
    pub fn new(manager: TournamentManager, defaults: TournamentDefaults) -> Self {
        Self {
            manager: Arc::new(manager),
            defaults,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use pz_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let tournament_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}",
            put(tournaments::configure_tournament).get(tournaments::get_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/categories/{category_id}/entrants",
            put(tournaments::register_entrants).get(tournaments::list_entrants),
        )
        .route(
            "/tournaments/{tournament_id}/categories/{category_id}/zones",
            post(tournaments::generate_zones).get(tournaments::list_zones),
        )
        .route(
            "/tournaments/{tournament_id}/categories/{category_id}/bracket",
            post(tournaments::generate_bracket).get(tournaments::get_bracket),
        );

    let zone_routes = Router::new()
        .route("/zones/{zone_id}", get(zones::get_zone))
        .route("/zones/{zone_id}/standings", get(zones::get_standings))
        .route("/zones/{zone_id}/close", post(zones::close_zone))
        .route("/zones/{zone_id}/tie-break", post(zones::resolve_tie))
        .route("/zones/{zone_id}/move", post(zones::move_entrant))
        .route("/zones/{zone_id}/withdraw", post(zones::withdraw_entrant))
        .route("/zone-matches/{match_id}/result", post(zones::record_result));

    let bracket_routes = Router::new().route(
        "/bracket-matches/{match_id}/result",
        post(brackets::record_result),
    );

    Router::new()
        .merge(tournament_routes)
        .merge(zone_routes)
        .merge(bracket_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the storage backend answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":true,"version":"0.4.0","timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
