//! Tournament and category API handlers.
//!
//! # Examples
//!
//! Configure a weekend tournament:
//! ```bash
//! curl -X PUT http://localhost:6969/api/v1/tournaments/1 \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Club Open", "days": [{"date": "2026-11-07", "start": "14:00:00"}, {"date": "2026-11-08", "start": "09:00:00"}]}'
//! ```
//!
//! Register entrants and generate zones:
//! ```bash
//! curl -X PUT http://localhost:6969/api/v1/tournaments/1/categories/3/entrants \
//!   -H "Content-Type: application/json" \
//!   -d '{"entrants": [{"id": 1, "name": "Ruiz / Soto", "is_seed": true}]}'
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/categories/3/zones
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use padel_zones::bracket::BracketMatch;
use padel_zones::scoring::MatchFormat;
use padel_zones::tournament::{
    CategoryId, CategoryKey, PlayDay, TournamentConfig, TournamentId, ZoneView,
};
use padel_zones::zone::Entrant;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiResult;
use crate::metrics;

/// Tournament configuration request, venue settings default from the server config
#[derive(Debug, Deserialize)]
pub struct ConfigureTournamentRequest {
    pub name: String,
    pub days: Vec<PlayDay>,
    pub match_duration_minutes: Option<u32>,
    pub courts: Option<u8>,
    pub match_format: Option<MatchFormat>,
    pub max_zone_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterEntrantsRequest {
    pub entrants: Vec<Entrant>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterEntrantsResponse {
    pub registered: usize,
}

/// Create or replace a tournament's configuration.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid configuration (no days, zero courts, ...)
pub async fn configure_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<ConfigureTournamentRequest>,
) -> ApiResult<TournamentConfig> {
    let defaults = state.defaults;
    let config = TournamentConfig {
        name: request.name,
        match_duration_minutes: request
            .match_duration_minutes
            .unwrap_or(defaults.match_duration_minutes),
        courts: request.courts.unwrap_or(defaults.courts),
        days: request.days,
        match_format: request.match_format.unwrap_or(defaults.match_format),
        max_zone_size: request.max_zone_size.unwrap_or(defaults.max_zone_size),
    };

    state
        .manager
        .configure_tournament(tournament_id, config.clone())
        .await?;
    Ok(Json(config))
}

/// Get a tournament's configuration.
///
/// # Errors
///
/// - `404 Not Found`: Tournament was never configured
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<TournamentConfig> {
    Ok(Json(state.manager.tournament_config(tournament_id).await?))
}

/// Register a category's entrants, replacing earlier registrations.
///
/// # Errors
///
/// - `400 Bad Request`: Duplicate entrant ids
/// - `404 Not Found`: Tournament was never configured
/// - `409 Conflict`: Zones already have results, or the bracket exists
pub async fn register_entrants(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
    Json(request): Json<RegisterEntrantsRequest>,
) -> ApiResult<RegisterEntrantsResponse> {
    let key = CategoryKey::new(tournament_id, category_id);
    let registered = state.manager.register_entrants(key, request.entrants).await?;
    Ok(Json(RegisterEntrantsResponse { registered }))
}

pub async fn list_entrants(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
) -> ApiResult<Vec<Entrant>> {
    let key = CategoryKey::new(tournament_id, category_id);
    Ok(Json(state.manager.entrants(key).await?))
}

/// Partition the category into zones and schedule their matches.
///
/// # Errors
///
/// - `400 Bad Request`: Entrant count outside 6..=35
/// - `409 Conflict`: Zones already have results
pub async fn generate_zones(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
) -> ApiResult<Vec<ZoneView>> {
    let key = CategoryKey::new(tournament_id, category_id);
    let zones = state.manager.generate_zones(key).await?;
    metrics::zones_generated_total(zones.len());
    Ok(Json(zones))
}

pub async fn list_zones(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
) -> ApiResult<Vec<ZoneView>> {
    let key = CategoryKey::new(tournament_id, category_id);
    Ok(Json(state.manager.list_zones(key).await?))
}

/// Build the elimination bracket from closed zones.
///
/// # Errors
///
/// - `409 Conflict`: A zone is still open, or the bracket already exists
pub async fn generate_bracket(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
) -> ApiResult<Vec<BracketMatch>> {
    let key = CategoryKey::new(tournament_id, category_id);
    Ok(Json(state.manager.generate_bracket(key).await?))
}

pub async fn get_bracket(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
) -> ApiResult<Vec<BracketMatch>> {
    let key = CategoryKey::new(tournament_id, category_id);
    Ok(Json(state.manager.bracket(key).await?))
}
