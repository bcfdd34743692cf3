//! Score entry for zone matches.

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{TournamentError, TournamentResult};
use crate::scoring::{MatchFormat, MatchScore, evaluate};
use crate::tournament::models::CategoryState;
use crate::zone::models::{MatchId, ZoneMatch};
use crate::zone::template::propagate;

/// A recorded zone result and the placeholder slots it filled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneMatchUpdate {
    pub updated: ZoneMatch,
    /// Dependent matches whose slots were written by this result
    pub cascaded: Vec<ZoneMatch>,
}

/// Record a score on a zone match
///
/// An undecided score is stored and the match stays pending. A deciding score
/// finalizes the match and fills the slots of dependent matches.
///
/// # Errors
///
/// Returns an error if the zone is closed, the match is already decided, one
/// of its slots is still waiting on a previous result, or the score is invalid.
pub fn record_result(
    state: &mut CategoryState,
    format: MatchFormat,
    match_id: MatchId,
    score: MatchScore,
) -> TournamentResult<ZoneMatchUpdate> {
    let (zone_id, index) = {
        let index = state
            .matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        (state.matches[index].zone_id, index)
    };
    state.open_zone(zone_id)?;

    let current = &state.matches[index];
    if current.is_finalized() {
        return Err(TournamentError::MatchAlreadyDecided(match_id));
    }
    if !current.has_both_slots() {
        return Err(TournamentError::MatchAwaitingPrerequisites(match_id));
    }

    let outcome = evaluate(format, &score)?;

    let target = &mut state.matches[index];
    target.score = Some(score);
    target.winner = outcome.winner;

    let cascaded = if outcome.is_decided() {
        info!(
            "Zone match {} ({}) decided, winner {:?}",
            match_id,
            state.matches[index].kind.as_str(),
            state.matches[index].winner_id()
        );
        let filled = propagate(&mut state.matches, zone_id);
        state
            .matches
            .iter()
            .filter(|m| filled.contains(&m.id))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    Ok(ZoneMatchUpdate {
        updated: state.matches[index].clone(),
        cascaded,
    })
}
