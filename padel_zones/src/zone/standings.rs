//! Zone standings, triple-tie detection and zone closing.
//!
//! Standings are derived from finalized matches every time they are needed;
//! nothing here is incremental.

use std::collections::HashMap;

use log::info;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::errors::{TournamentError, TournamentResult};
use crate::scoring::{MatchFormat, Side};
use crate::tournament::models::{CategoryState, EntrantId};
use crate::zone::models::{Zone, ZoneId, ZoneMatch, ZoneStatus};

/// One entrant's row in a zone table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub entrant_id: EntrantId,
    /// 1-based place
    pub position: u8,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
}

impl Standing {
    fn new(entrant_id: EntrantId) -> Self {
        Self {
            entrant_id,
            position: 0,
            played: 0,
            wins: 0,
            losses: 0,
            sets_won: 0,
            sets_lost: 0,
            games_won: 0,
            games_lost: 0,
        }
    }

    pub fn set_diff(&self) -> i64 {
        i64::from(self.sets_won) - i64::from(self.sets_lost)
    }

    pub fn game_diff(&self) -> i64 {
        i64::from(self.games_won) - i64::from(self.games_lost)
    }

    fn ranking_key(&self) -> (u32, i64, u32, i64) {
        (self.wins, self.set_diff(), self.sets_won, self.game_diff())
    }

    fn tie_key(&self) -> (u32, i64, i64) {
        (self.wins, self.set_diff(), self.game_diff())
    }
}

fn aggregate(zone: &Zone, matches: &[&ZoneMatch], format: MatchFormat) -> Vec<Standing> {
    let mut rows: Vec<Standing> = zone.members.iter().map(|&id| Standing::new(id)).collect();
    let index: HashMap<EntrantId, usize> = zone
        .members
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    for m in matches.iter().filter(|m| m.is_finalized()) {
        let (Some(one), Some(two)) = (m.slot1, m.slot2) else {
            continue;
        };
        let (Some(&i1), Some(&i2)) = (index.get(&one), index.get(&two)) else {
            continue;
        };

        rows[i1].played += 1;
        rows[i2].played += 1;
        match m.winner {
            Some(Side::One) => {
                rows[i1].wins += 1;
                rows[i2].losses += 1;
            }
            Some(Side::Two) => {
                rows[i2].wins += 1;
                rows[i1].losses += 1;
            }
            None => {}
        }

        let Some(score) = &m.score else {
            continue;
        };
        for (set_index, set) in score.sets.iter().enumerate() {
            match format.set_winner(set_index, *set) {
                Some(Side::One) => {
                    rows[i1].sets_won += 1;
                    rows[i2].sets_lost += 1;
                }
                Some(Side::Two) => {
                    rows[i2].sets_won += 1;
                    rows[i1].sets_lost += 1;
                }
                None => {}
            }
            let (g1, g2) = format.credited_games(set_index, *set);
            rows[i1].games_won += g1;
            rows[i1].games_lost += g2;
            rows[i2].games_won += g2;
            rows[i2].games_lost += g1;
        }
    }

    rows
}

fn triple_tied(zone: &Zone, matches: &[&ZoneMatch], rows: &[Standing]) -> bool {
    zone.size() == 3
        && rows.len() == 3
        && !matches.is_empty()
        && matches.iter().all(|m| m.is_finalized())
        && rows.windows(2).all(|w| w[0].tie_key() == w[1].tie_key())
}

/// Whether a 3-entrant zone finished with all three entrants level
pub fn is_triple_tied(zone: &Zone, matches: &[&ZoneMatch], format: MatchFormat) -> bool {
    triple_tied(zone, matches, &aggregate(zone, matches, format))
}

fn head_to_head(matches: &[&ZoneMatch], a: EntrantId, b: EntrantId) -> Option<EntrantId> {
    matches
        .iter()
        .filter(|m| m.is_finalized() && m.involves(a) && m.involves(b))
        .find_map(|m| m.winner_id())
}

/// Compute the ordered table of a zone
///
/// Entrants rank by wins, then set difference, then sets won, then game
/// difference. Two entrants level on all of those are split by their direct
/// match. A resolved triple tie uses the stored tie-break order.
pub fn compute_standings(zone: &Zone, matches: &[&ZoneMatch], format: MatchFormat) -> Vec<Standing> {
    let mut rows = aggregate(zone, matches, format);

    if triple_tied(zone, matches, &rows)
        && let Some(order) = &zone.tie_break
    {
        rows.sort_by_key(|r| order.iter().position(|&id| id == r.entrant_id));
    } else {
        // stable: members keep template order on full ties
        rows.sort_by(|a, b| b.ranking_key().cmp(&a.ranking_key()));

        let mut i = 0;
        while i < rows.len() {
            let mut j = i + 1;
            while j < rows.len() && rows[j].ranking_key() == rows[i].ranking_key() {
                j += 1;
            }
            if j - i == 2
                && let Some(winner) = head_to_head(matches, rows[i].entrant_id, rows[i + 1].entrant_id)
                && winner == rows[i + 1].entrant_id
            {
                rows.swap(i, i + 1);
            }
            i = j;
        }
    }

    for (i, row) in rows.iter_mut().enumerate() {
        row.position = (i + 1) as u8;
    }
    rows
}

/// How a triple tie is settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TieBreakMethod {
    /// Random draw
    Draw,
    /// Points each entrant scored in a supplementary mini-match
    MiniMatch { points: Vec<(EntrantId, u32)> },
}

/// Order the tied entrants according to `method`
///
/// # Errors
///
/// A mini-match must report points for exactly the tied entrants, with no two
/// entrants on the same points.
pub fn tie_break_order<R: Rng + ?Sized>(
    members: &[EntrantId],
    method: &TieBreakMethod,
    rng: &mut R,
) -> TournamentResult<Vec<EntrantId>> {
    match method {
        TieBreakMethod::Draw => {
            let mut order = members.to_vec();
            order.shuffle(rng);
            Ok(order)
        }
        TieBreakMethod::MiniMatch { points } => {
            let mut reported: Vec<EntrantId> = points.iter().map(|(id, _)| *id).collect();
            reported.sort_unstable();
            let mut expected = members.to_vec();
            expected.sort_unstable();
            if reported != expected {
                return Err(TournamentError::InvalidRequest(
                    "mini-match points must cover exactly the tied entrants".to_string(),
                ));
            }

            let mut ranked = points.clone();
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            if ranked.windows(2).any(|w| w[0].1 == w[1].1) {
                return Err(TournamentError::InvalidRequest(
                    "mini-match points must not be level".to_string(),
                ));
            }
            Ok(ranked.into_iter().map(|(id, _)| id).collect())
        }
    }
}

/// Result of trying to close a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CloseOutcome {
    Closed { standings: Vec<Standing> },
    /// Closing is blocked until the tie is resolved
    TieDetected { entrants: Vec<EntrantId> },
}

/// Standings of one zone of the snapshot
pub fn zone_standings(
    state: &CategoryState,
    format: MatchFormat,
    zone_id: ZoneId,
) -> TournamentResult<Vec<Standing>> {
    let zone = state.zone(zone_id)?;
    Ok(compute_standings(zone, &state.zone_matches(zone_id), format))
}

/// Close a zone whose matches are all decided
///
/// # Errors
///
/// Returns `ZoneIncomplete` while any match is undecided and `ZoneClosed` if
/// the zone is already closed.
pub fn close_zone(
    state: &mut CategoryState,
    format: MatchFormat,
    zone_id: ZoneId,
) -> TournamentResult<CloseOutcome> {
    let zone = state.open_zone(zone_id)?;
    let matches = state.zone_matches(zone_id);

    let pending = matches.iter().filter(|m| !m.is_finalized()).count();
    if pending > 0 {
        return Err(TournamentError::ZoneIncomplete {
            zone: zone_id,
            pending,
        });
    }

    if zone.tie_break.is_none() && is_triple_tied(zone, &matches, format) {
        info!("Zone {} has a triple tie, closing blocked", zone.name);
        return Ok(CloseOutcome::TieDetected {
            entrants: zone.members.clone(),
        });
    }

    let standings = compute_standings(zone, &matches, format);
    state.zone_mut(zone_id)?.status = ZoneStatus::Closed;
    info!("Zone {} closed", zone_id);
    Ok(CloseOutcome::Closed { standings })
}

/// Settle a detected triple tie and return the resulting standings
///
/// # Errors
///
/// Returns `NoTieToResolve` unless the zone is open and triple-tied.
pub fn resolve_tie<R: Rng + ?Sized>(
    state: &mut CategoryState,
    format: MatchFormat,
    zone_id: ZoneId,
    method: &TieBreakMethod,
    rng: &mut R,
) -> TournamentResult<Vec<Standing>> {
    let zone = state.open_zone(zone_id)?;
    let matches = state.zone_matches(zone_id);
    if !is_triple_tied(zone, &matches, format) {
        return Err(TournamentError::NoTieToResolve(zone_id));
    }

    let order = tie_break_order(&zone.members, method, rng)?;
    info!("Zone {} triple tie resolved as {:?}", zone.name, order);
    state.zone_mut(zone_id)?.tie_break = Some(order);

    zone_standings(state, format, zone_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::MatchScore;
    use crate::zone::models::MatchKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn played(zone: &Zone, a: EntrantId, b: EntrantId, sets: &[(u8, u8)], winner: Side) -> ZoneMatch {
        let mut m = ZoneMatch::new(zone.id, MatchKind::RoundRobin, 1, Some(a), Some(b));
        m.score = Some(MatchScore::from_pairs(sets));
        m.winner = Some(winner);
        m
    }

    fn cyclic_zone() -> (Zone, Vec<ZoneMatch>) {
        let zone = Zone::new("A".to_string(), 1, 0, vec![1, 2, 3]);
        let matches = vec![
            played(&zone, 1, 2, &[(6, 4), (6, 4)], Side::One),
            played(&zone, 2, 3, &[(6, 4), (6, 4)], Side::One),
            played(&zone, 3, 1, &[(6, 4), (6, 4)], Side::One),
        ];
        (zone, matches)
    }

    #[test]
    fn test_ranking_by_wins_then_sets() {
        let zone = Zone::new("B".to_string(), 1, 0, vec![1, 2, 3]);
        let matches = [
            played(&zone, 1, 2, &[(6, 0), (6, 0)], Side::One),
            played(&zone, 2, 3, &[(6, 4), (4, 6), (6, 3)], Side::One),
            played(&zone, 1, 3, &[(6, 1), (6, 1)], Side::One),
        ];
        let refs: Vec<&ZoneMatch> = matches.iter().collect();
        let table = compute_standings(&zone, &refs, MatchFormat::BestOfThree);

        assert_eq!(table.iter().map(|s| s.entrant_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(table[0].wins, 2);
        assert_eq!(table[1].set_diff(), -1);
        assert_eq!(table[2].games_won, 4 + 6 + 3 + 2);
        assert_eq!(table[2].position, 3);
    }

    #[test]
    fn test_head_to_head_splits_two_level_entrants() {
        let zone = Zone::new("C".to_string(), 1, 0, vec![1, 2, 3, 4]);
        let matches = [
            played(&zone, 1, 2, &[(4, 6), (4, 6)], Side::Two),
            played(&zone, 1, 3, &[(6, 4), (6, 4)], Side::One),
            played(&zone, 2, 4, &[(4, 6), (4, 6)], Side::Two),
        ];
        let refs: Vec<&ZoneMatch> = matches.iter().collect();
        let table = compute_standings(&zone, &refs, MatchFormat::BestOfThree);
        // 1 and 2 are level on every stat; 2 beat 1
        let ids: Vec<EntrantId> = table.iter().map(|s| s.entrant_id).collect();
        let pos1 = ids.iter().position(|&id| id == 1).unwrap();
        let pos2 = ids.iter().position(|&id| id == 2).unwrap();
        assert!(pos2 < pos1);
    }

    #[test]
    fn test_triple_tie_detection() {
        let (zone, matches) = cyclic_zone();
        let refs: Vec<&ZoneMatch> = matches.iter().collect();
        assert!(is_triple_tied(&zone, &refs, MatchFormat::BestOfThree));

        let partial: Vec<&ZoneMatch> = matches.iter().take(2).collect();
        assert!(!is_triple_tied(&zone, &partial, MatchFormat::BestOfThree));
    }

    #[test]
    fn test_stored_tie_break_orders_triple_tie() {
        let (mut zone, matches) = cyclic_zone();
        zone.tie_break = Some(vec![3, 1, 2]);
        let refs: Vec<&ZoneMatch> = matches.iter().collect();
        let table = compute_standings(&zone, &refs, MatchFormat::BestOfThree);
        assert_eq!(table.iter().map(|s| s.entrant_id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }

    #[test]
    fn test_standings_are_idempotent() {
        let (zone, matches) = cyclic_zone();
        let refs: Vec<&ZoneMatch> = matches.iter().collect();
        let first = compute_standings(&zone, &refs, MatchFormat::BestOfThree);
        let second = compute_standings(&zone, &refs, MatchFormat::BestOfThree);
        assert_eq!(first, second);
    }

    #[test]
    fn test_draw_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = tie_break_order(&[1, 2, 3], &TieBreakMethod::Draw, &mut rng).unwrap();
        order.sort_unstable();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_mini_match_orders_by_points() {
        let mut rng = StdRng::seed_from_u64(0);
        let method = TieBreakMethod::MiniMatch {
            points: vec![(1, 4), (2, 9), (3, 6)],
        };
        let order = tie_break_order(&[1, 2, 3], &method, &mut rng).unwrap();
        assert_eq!(order, vec![2, 3, 1]);

        let level = TieBreakMethod::MiniMatch {
            points: vec![(1, 4), (2, 4), (3, 6)],
        };
        assert!(tie_break_order(&[1, 2, 3], &level, &mut rng).is_err());

        let stranger = TieBreakMethod::MiniMatch {
            points: vec![(1, 4), (2, 5), (9, 6)],
        };
        assert!(tie_break_order(&[1, 2, 3], &stranger, &mut rng).is_err());
    }

    #[test]
    fn test_close_zone_blocks_on_tie_until_resolved() {
        use crate::tournament::models::CategoryKey;
        let (zone, matches) = cyclic_zone();
        let zone_id = zone.id;
        let mut state = CategoryState::new(CategoryKey::new(1, 1), Vec::new());
        state.zones.push(zone);
        state.matches = matches;

        let outcome = close_zone(&mut state, MatchFormat::BestOfThree, zone_id).unwrap();
        assert!(matches!(outcome, CloseOutcome::TieDetected { .. }));
        assert!(state.zones[0].is_open());

        let mut rng = StdRng::seed_from_u64(3);
        let table = resolve_tie(
            &mut state,
            MatchFormat::BestOfThree,
            zone_id,
            &TieBreakMethod::Draw,
            &mut rng,
        )
        .unwrap();
        assert_eq!(table.len(), 3);

        let outcome = close_zone(&mut state, MatchFormat::BestOfThree, zone_id).unwrap();
        assert!(matches!(outcome, CloseOutcome::Closed { .. }));
        assert!(!state.zones[0].is_open());
    }

    #[test]
    fn test_close_zone_rejects_pending_matches() {
        use crate::tournament::models::CategoryKey;
        let zone = Zone::new("D".to_string(), 1, 0, vec![1, 2]);
        let zone_id = zone.id;
        let mut state = CategoryState::new(CategoryKey::new(1, 1), Vec::new());
        state.matches = vec![ZoneMatch::new(zone_id, MatchKind::Final, 1, Some(1), Some(2))];
        state.zones.push(zone);

        let err = close_zone(&mut state, MatchFormat::BestOfThree, zone_id).unwrap_err();
        assert!(matches!(err, TournamentError::ZoneIncomplete { pending: 1, .. }));
    }

    #[test]
    fn test_resolve_without_tie_rejected() {
        use crate::tournament::models::CategoryKey;
        let zone = Zone::new("E".to_string(), 1, 0, vec![1, 2, 3]);
        let zone_id = zone.id;
        let mut state = CategoryState::new(CategoryKey::new(1, 1), Vec::new());
        state.zones.push(zone);
        let mut rng = StdRng::seed_from_u64(1);
        let err = resolve_tie(
            &mut state,
            MatchFormat::BestOfThree,
            zone_id,
            &TieBreakMethod::Draw,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, TournamentError::NoTieToResolve(_)));
    }
}
