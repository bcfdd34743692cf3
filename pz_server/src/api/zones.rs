//! Zone API handlers: results, roster changes, closing and tie-breaks.

use axum::{
    Json,
    extract::{Path, State},
};
use padel_zones::scoring::MatchScore;
use padel_zones::tournament::{EntrantId, ZoneView};
use padel_zones::zone::{
    CloseOutcome, MatchId, Standing, TieBreakMethod, WithdrawPolicy, ZoneId, ZoneMatchUpdate,
};
use serde::Deserialize;

use super::AppState;
use super::error::ApiResult;
use crate::metrics;

/// Move `entrant_id` out of the path zone, optionally swapping with a member of `to_zone`
#[derive(Debug, Deserialize)]
pub struct MoveEntrantRequest {
    pub entrant_id: EntrantId,
    pub to_zone: ZoneId,
    #[serde(default)]
    pub swap_with: Option<EntrantId>,
}

/// Withdraw `entrant_id`, a policy is required when the zone has three entrants
#[derive(Debug, Deserialize)]
pub struct WithdrawEntrantRequest {
    pub entrant_id: EntrantId,
    #[serde(default)]
    pub policy: Option<WithdrawPolicy>,
}

pub async fn get_zone(
    State(state): State<AppState>,
    Path(zone_id): Path<ZoneId>,
) -> ApiResult<ZoneView> {
    Ok(Json(state.manager.zone(zone_id).await?))
}

pub async fn get_standings(
    State(state): State<AppState>,
    Path(zone_id): Path<ZoneId>,
) -> ApiResult<Vec<Standing>> {
    Ok(Json(state.manager.zone_standings(zone_id).await?))
}

/// Close a zone.
///
/// Returns `{"outcome": "tie_detected", ...}` instead of closing when three
/// entrants are level; resolve the tie and close again.
pub async fn close_zone(
    State(state): State<AppState>,
    Path(zone_id): Path<ZoneId>,
) -> ApiResult<CloseOutcome> {
    Ok(Json(state.manager.close_zone(zone_id).await?))
}

/// Settle a triple tie by draw or mini-match points.
///
/// # Errors
///
/// - `400 Bad Request`: Mini-match points do not cover exactly the tied entrants
/// - `409 Conflict`: The zone has no triple tie
pub async fn resolve_tie(
    State(state): State<AppState>,
    Path(zone_id): Path<ZoneId>,
    Json(method): Json<TieBreakMethod>,
) -> ApiResult<Vec<Standing>> {
    Ok(Json(state.manager.resolve_tie(zone_id, method).await?))
}

/// Move or swap an entrant between zones.
///
/// # Errors
///
/// - `404 Not Found`: The entrant is not in the zone
/// - `409 Conflict`: The destination is full, or a decided match would be lost
pub async fn move_entrant(
    State(state): State<AppState>,
    Path(zone_id): Path<ZoneId>,
    Json(request): Json<MoveEntrantRequest>,
) -> ApiResult<()> {
    state
        .manager
        .move_entrant(request.entrant_id, zone_id, request.to_zone, request.swap_with)
        .await?;
    metrics::roster_changes_total("move");
    Ok(Json(()))
}

/// Withdraw an entrant from its zone.
///
/// # Errors
///
/// - `400 Bad Request`: A 3-entrant zone needs a policy
/// - `422 Unprocessable Entity`: The policy cannot be applied (no donor zone, missing destination)
pub async fn withdraw_entrant(
    State(state): State<AppState>,
    Path(zone_id): Path<ZoneId>,
    Json(request): Json<WithdrawEntrantRequest>,
) -> ApiResult<()> {
    state
        .manager
        .withdraw_entrant(request.entrant_id, zone_id, request.policy)
        .await?;
    metrics::roster_changes_total("withdraw");
    Ok(Json(()))
}

/// Record a full or partial score on a zone match.
///
/// # Errors
///
/// - `409 Conflict`: Match already decided, waiting for a previous result, or zone closed
pub async fn record_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(score): Json<MatchScore>,
) -> ApiResult<ZoneMatchUpdate> {
    let update = state
        .manager
        .record_zone_match_result(match_id, score)
        .await?;
    metrics::results_recorded_total("zone");
    Ok(Json(update))
}
