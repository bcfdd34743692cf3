//! Bracket API handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use padel_zones::bracket::BracketUpdate;
use padel_zones::scoring::MatchScore;
use padel_zones::zone::MatchId;

use super::AppState;
use super::error::ApiResult;
use crate::metrics;

/// Record a bracket result and advance the winner.
///
/// The response carries the champion once the final is decided.
///
/// # Errors
///
/// - `409 Conflict`: Bye match, match already decided, or an opponent still unknown
pub async fn record_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(score): Json<MatchScore>,
) -> ApiResult<BracketUpdate> {
    let update = state.manager.record_bracket_result(match_id, score).await?;
    metrics::results_recorded_total("bracket");
    if let Some(champion) = update.champion {
        tracing::info!(match_id = %match_id, champion = champion, "Bracket final decided");
    }
    Ok(Json(update))
}
