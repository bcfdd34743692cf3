//! Bracket generation from closed zones, and winner advancement.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::bracket::layout::{SlotRef, first_round_for_zones, layout_for};
use crate::bracket::models::{BracketMatch, BracketRound};
use crate::errors::{TournamentError, TournamentResult};
use crate::scoring::{MatchFormat, MatchScore, Side, evaluate};
use crate::tournament::models::{CategoryState, EntrantId};
use crate::zone::models::{MatchId, zone_letter};
use crate::zone::standings::compute_standings;

/// A recorded bracket result and its consequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketUpdate {
    pub updated: BracketMatch,
    /// Next-round match the winner advanced into
    pub advanced: Option<BracketMatch>,
    /// Set once the final is decided
    pub champion: Option<EntrantId>,
}

/// Place the winner of `bracket[index]` into its next-round match
fn advance(bracket: &mut [BracketMatch], index: usize) -> Option<usize> {
    let source = &bracket[index];
    let winner = source.winner_id()?;
    let next_round = source.round.next()?;
    let (position, side) = source.feeds();

    let target = bracket
        .iter()
        .position(|m| m.round == next_round && m.position == position)?;
    match side {
        Side::One => bracket[target].slot1 = Some(winner),
        Side::Two => bracket[target].slot2 = Some(winner),
    }
    Some(target)
}

/// Build the elimination bracket once every zone is closed
///
/// Skeleton letters refer to zones in creation order ("A" is the first zone
/// still in the category). Byes are decided on creation and their entrant is
/// already placed in the second round.
///
/// # Errors
///
/// Rejects a category with open zones, an existing bracket, or a zone count
/// no skeleton covers.
pub fn generate_bracket(
    state: &mut CategoryState,
    format: MatchFormat,
) -> TournamentResult<Vec<BracketMatch>> {
    if !state.bracket.is_empty() {
        return Err(TournamentError::BracketAlreadyGenerated(state.key));
    }
    let zones = state.zones_in_order();
    if zones.is_empty() {
        return Err(TournamentError::InvalidRequest(
            "category has no zones".to_string(),
        ));
    }
    let open = zones.iter().filter(|z| z.is_open()).count();
    if open > 0 {
        return Err(TournamentError::ZonesStillOpen { open });
    }

    let entrants = state.zoned_entrant_count();
    let expected = layout_for(entrants).map(|l| l.zone_count()).ok();
    if expected.is_some_and(|z| z != zones.len()) {
        warn!(
            "Category {} has {} zones after roster changes, {} entrants normally make {:?}",
            state.key,
            zones.len(),
            entrants,
            expected
        );
    }
    let first_round = first_round_for_zones(zones.len()).ok_or(TournamentError::LayoutMismatch {
        expected: expected.unwrap_or(0),
        actual: zones.len(),
    })?;

    // Skeleton letters follow zone order; references carry the zone's real name
    let mut standings: HashMap<String, (&str, Vec<EntrantId>)> = HashMap::new();
    for (index, zone) in zones.iter().enumerate() {
        let table = compute_standings(zone, &state.zone_matches(zone.id), format);
        standings.insert(
            zone_letter(index),
            (
                zone.name.as_str(),
                table.into_iter().map(|s| s.entrant_id).collect(),
            ),
        );
    }
    let resolve = |raw: &str| -> TournamentResult<(String, EntrantId)> {
        let slot = SlotRef::parse(raw).ok_or_else(|| TournamentError::InvalidLayout {
            entrants,
            reason: format!("malformed slot reference {raw:?}"),
        })?;
        let (name, table) = standings.get(&slot.zone).ok_or_else(|| TournamentError::InvalidLayout {
            entrants,
            reason: format!("no zone for {slot}"),
        })?;
        let entrant = table
            .get(usize::from(slot.place) - 1)
            .copied()
            .ok_or_else(|| TournamentError::InvalidLayout {
                entrants,
                reason: format!("no entrant at {slot}"),
            })?;
        Ok((format!("{}{}", slot.place, name), entrant))
    };

    let size = first_round.len() * 2;
    let first = BracketRound::for_slots(size).ok_or_else(|| TournamentError::InvalidLayout {
        entrants,
        reason: format!("no round for {size} slots"),
    })?;

    let mut bracket = Vec::new();
    for (i, &(a, b)) in first_round.iter().enumerate() {
        let mut m = BracketMatch::new(first, (i + 1) as u32);
        let (slot_ref, entrant) = resolve(a)?;
        m.slot1_ref = Some(slot_ref);
        m.slot1 = Some(entrant);
        match b {
            Some(b) => {
                let (slot_ref, entrant) = resolve(b)?;
                m.slot2_ref = Some(slot_ref);
                m.slot2 = Some(entrant);
            }
            None => {
                m.bye = true;
                m.winner = Some(Side::One);
            }
        }
        bracket.push(m);
    }

    let mut round = first.next();
    while let Some(r) = round {
        for position in 1..=(r.slots() / 2) {
            bracket.push(BracketMatch::new(r, position as u32));
        }
        round = r.next();
    }

    for index in 0..first_round.len() {
        if bracket[index].bye {
            advance(&mut bracket, index);
        }
    }

    info!(
        "Generated {} bracket for category {}: {} matches, {} byes",
        first.as_str(),
        state.key,
        bracket.len(),
        bracket.iter().filter(|m| m.bye).count()
    );
    state.bracket = bracket.clone();
    Ok(bracket)
}

/// Record a score on a bracket match and advance its winner
///
/// # Errors
///
/// Byes take no score, decided matches are immutable, and a match waits until
/// both of its entrants are known.
pub fn record_bracket_result(
    state: &mut CategoryState,
    format: MatchFormat,
    match_id: MatchId,
    score: MatchScore,
) -> TournamentResult<BracketUpdate> {
    let index = state
        .bracket
        .iter()
        .position(|m| m.id == match_id)
        .ok_or(TournamentError::MatchNotFound(match_id))?;

    let current = &state.bracket[index];
    if current.bye {
        return Err(TournamentError::ByeMatch(match_id));
    }
    if current.is_finalized() {
        return Err(TournamentError::MatchAlreadyDecided(match_id));
    }
    if current.slot1.is_none() || current.slot2.is_none() {
        return Err(TournamentError::MatchAwaitingPrerequisites(match_id));
    }

    let outcome = evaluate(format, &score)?;
    let target = &mut state.bracket[index];
    target.score = Some(score);
    target.winner = outcome.winner;

    let mut advanced = None;
    let mut champion = None;
    if outcome.is_decided() {
        let updated = &state.bracket[index];
        if updated.round == BracketRound::Final {
            champion = updated.winner_id();
            info!("Category {} champion: {:?}", state.key, champion);
        } else if let Some(next) = advance(&mut state.bracket, index) {
            advanced = Some(state.bracket[next].clone());
        }
    }

    Ok(BracketUpdate {
        updated: state.bracket[index].clone(),
        advanced,
        champion,
    })
}

/// Winner of the decided final, if any
pub fn champion(bracket: &[BracketMatch]) -> Option<EntrantId> {
    bracket
        .iter()
        .find(|m| m.round == BracketRound::Final)
        .and_then(|m| m.winner_id())
}
