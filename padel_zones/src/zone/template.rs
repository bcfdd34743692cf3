//! Zone match templates and placeholder resolution.
//!
//! Templates are small dependency graphs: a placeholder slot names the match
//! whose winner or loser fills it. Slots are written once, when every
//! prerequisite of the dependent match has a decided result.

use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::EntrantId;
use crate::zone::models::{MatchId, MatchKind, ZoneFormat, ZoneId, ZoneMatch};

/// Source of a placeholder slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    WinnerOf(MatchKind),
    LoserOf(MatchKind),
}

impl Feed {
    fn source(self) -> MatchKind {
        match self {
            Feed::WinnerOf(kind) | Feed::LoserOf(kind) => kind,
        }
    }
}

impl MatchKind {
    /// Where each slot (slot1, slot2) takes its entrant from, if it is a placeholder
    pub fn feeds(self) -> [Option<Feed>; 2] {
        match self {
            MatchKind::LoserVsThird => [Some(Feed::LoserOf(MatchKind::Initial)), None],
            MatchKind::WinnerVsThird => [Some(Feed::WinnerOf(MatchKind::Initial)), None],
            MatchKind::Losers => [
                Some(Feed::LoserOf(MatchKind::Initial1)),
                Some(Feed::LoserOf(MatchKind::Initial2)),
            ],
            MatchKind::Winners => [
                Some(Feed::WinnerOf(MatchKind::Initial1)),
                Some(Feed::WinnerOf(MatchKind::Initial2)),
            ],
            _ => [None, None],
        }
    }

    /// Matches that must finish before this one may start
    pub fn timing_predecessors(self) -> &'static [MatchKind] {
        match self {
            MatchKind::LoserVsThird => &[MatchKind::Initial],
            // shares the third entrant with loser-vs-third
            MatchKind::WinnerVsThird => &[MatchKind::LoserVsThird],
            MatchKind::Losers | MatchKind::Winners => &[MatchKind::Initial1, MatchKind::Initial2],
            _ => &[],
        }
    }

    /// Matches whose results must all be decided before placeholders are filled
    pub fn prerequisites(self) -> Vec<MatchKind> {
        let mut kinds: Vec<MatchKind> = self.feeds().iter().flatten().map(|f| f.source()).collect();
        kinds.dedup();
        kinds
    }
}

/// A template match before ids and bookings are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDraft {
    pub kind: MatchKind,
    pub order: u32,
    pub slot1: Option<EntrantId>,
    pub slot2: Option<EntrantId>,
}

impl MatchDraft {
    fn new(kind: MatchKind, order: u32, slot1: Option<EntrantId>, slot2: Option<EntrantId>) -> Self {
        Self {
            kind,
            order,
            slot1,
            slot2,
        }
    }
}

fn expect_size(format: ZoneFormat, entrants: &[EntrantId], size: usize) -> TournamentResult<()> {
    if entrants.len() != size {
        return Err(TournamentError::InvalidRequest(format!(
            "{} template needs {} entrants, got {}",
            format.as_str(),
            size,
            entrants.len()
        )));
    }
    Ok(())
}

/// Emit the template of `format` for entrants in template order
pub fn drafts_for(format: ZoneFormat, entrants: &[EntrantId]) -> TournamentResult<Vec<MatchDraft>> {
    match format {
        ZoneFormat::Three => {
            expect_size(format, entrants, 3)?;
            let (a, b, c) = (entrants[0], entrants[1], entrants[2]);
            Ok(vec![
                MatchDraft::new(MatchKind::Initial, 1, Some(a), Some(b)),
                MatchDraft::new(MatchKind::LoserVsThird, 2, None, Some(c)),
                MatchDraft::new(MatchKind::WinnerVsThird, 3, None, Some(c)),
            ])
        }
        ZoneFormat::Four => {
            expect_size(format, entrants, 4)?;
            let (a, b, c, d) = (entrants[0], entrants[1], entrants[2], entrants[3]);
            Ok(vec![
                MatchDraft::new(MatchKind::Initial1, 1, Some(a), Some(b)),
                MatchDraft::new(MatchKind::Initial2, 2, Some(c), Some(d)),
                MatchDraft::new(MatchKind::Losers, 3, None, None),
                MatchDraft::new(MatchKind::Winners, 4, None, None),
            ])
        }
        ZoneFormat::FinalOnly => {
            expect_size(format, entrants, 2)?;
            Ok(vec![MatchDraft::new(
                MatchKind::Final,
                1,
                Some(entrants[0]),
                Some(entrants[1]),
            )])
        }
        ZoneFormat::RoundRobin => {
            if entrants.len() < 2 {
                return Err(TournamentError::InvalidRequest(
                    "round robin needs at least 2 entrants".to_string(),
                ));
            }
            Ok(round_robin_pairs(entrants)
                .into_iter()
                .enumerate()
                .map(|(i, (a, b))| {
                    MatchDraft::new(MatchKind::RoundRobin, (i + 1) as u32, Some(a), Some(b))
                })
                .collect())
        }
    }
}

/// Every pair exactly once, ordered by rounds so no entrant plays twice in a row
/// when it can be avoided (circle method)
pub fn round_robin_pairs(entrants: &[EntrantId]) -> Vec<(EntrantId, EntrantId)> {
    let mut ring: Vec<Option<EntrantId>> = entrants.iter().copied().map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();
    let mut pairs = Vec::with_capacity(entrants.len() * entrants.len().saturating_sub(1) / 2);

    for _ in 0..n.saturating_sub(1) {
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) {
                pairs.push((a, b));
            }
        }
        // keep the first position fixed and rotate the rest
        let last = ring.remove(n - 1);
        ring.insert(1, last);
    }
    pairs
}

/// Attach ids to drafts
pub fn build_matches(zone_id: ZoneId, drafts: Vec<MatchDraft>) -> Vec<ZoneMatch> {
    drafts
        .into_iter()
        .map(|d| ZoneMatch::new(zone_id, d.kind, d.order, d.slot1, d.slot2))
        .collect()
}

/// Fill placeholder slots of `zone_id` whose prerequisites are all decided
///
/// Returns the ids of matches whose slots were written.
pub fn propagate(matches: &mut [ZoneMatch], zone_id: ZoneId) -> Vec<MatchId> {
    let mut filled = Vec::new();

    for i in 0..matches.len() {
        if matches[i].zone_id != zone_id || matches[i].is_finalized() {
            continue;
        }
        let kind = matches[i].kind;
        let prerequisites = kind.prerequisites();
        if prerequisites.is_empty() {
            continue;
        }

        let decided = |source: MatchKind| {
            matches
                .iter()
                .find(|m| m.zone_id == zone_id && m.kind == source && m.is_finalized())
        };
        if !prerequisites.iter().all(|k| decided(*k).is_some()) {
            continue;
        }

        let resolved: Vec<Option<EntrantId>> = kind
            .feeds()
            .iter()
            .map(|feed| {
                feed.and_then(|feed| match feed {
                    Feed::WinnerOf(source) => decided(source).and_then(|m| m.winner_id()),
                    Feed::LoserOf(source) => decided(source).and_then(|m| m.loser_id()),
                })
            })
            .collect();

        let target = &mut matches[i];
        let mut changed = false;
        for (slot, value) in [&mut target.slot1, &mut target.slot2]
            .into_iter()
            .zip(resolved)
        {
            if slot.is_none() && value.is_some() {
                *slot = value;
                changed = true;
            }
        }
        if changed {
            filled.push(target.id);
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Side;
    use uuid::Uuid;

    fn finalize(matches: &mut [ZoneMatch], kind: MatchKind, winner: Side) {
        let m = matches.iter_mut().find(|m| m.kind == kind).unwrap();
        m.winner = Some(winner);
    }

    #[test]
    fn test_three_template() {
        let drafts = drafts_for(ZoneFormat::Three, &[1, 2, 3]).unwrap();
        let kinds: Vec<MatchKind> = drafts.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![MatchKind::Initial, MatchKind::LoserVsThird, MatchKind::WinnerVsThird]
        );
        assert_eq!((drafts[0].slot1, drafts[0].slot2), (Some(1), Some(2)));
        assert_eq!((drafts[1].slot1, drafts[1].slot2), (None, Some(3)));
        assert_eq!((drafts[2].slot1, drafts[2].slot2), (None, Some(3)));
    }

    #[test]
    fn test_three_template_is_structurally_order_independent() {
        let a = drafts_for(ZoneFormat::Three, &[1, 2, 3]).unwrap();
        let b = drafts_for(ZoneFormat::Three, &[3, 1, 2]).unwrap();
        let shape = |d: &[MatchDraft]| {
            d.iter()
                .map(|m| (m.kind, m.order, m.slot1.is_some(), m.slot2.is_some()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&a), shape(&b));
        assert_ne!(a[0].slot1, b[0].slot1);
    }

    #[test]
    fn test_four_template() {
        let drafts = drafts_for(ZoneFormat::Four, &[1, 2, 3, 4]).unwrap();
        assert_eq!(drafts.len(), 4);
        assert_eq!((drafts[1].slot1, drafts[1].slot2), (Some(3), Some(4)));
        assert!(drafts[2].slot1.is_none() && drafts[3].slot2.is_none());
    }

    #[test]
    fn test_wrong_size_rejected() {
        assert!(drafts_for(ZoneFormat::Three, &[1, 2]).is_err());
        assert!(drafts_for(ZoneFormat::Four, &[1, 2, 3]).is_err());
        assert!(drafts_for(ZoneFormat::RoundRobin, &[1]).is_err());
    }

    #[test]
    fn test_round_robin_pairs_each_once() {
        let pairs = round_robin_pairs(&[1, 2, 3, 4, 5]);
        assert_eq!(pairs.len(), 10);
        for a in 1..=5 {
            for b in (a + 1)..=5 {
                let count = pairs
                    .iter()
                    .filter(|&&(x, y)| (x, y) == (a, b) || (x, y) == (b, a))
                    .count();
                assert_eq!(count, 1, "pair {a}-{b}");
            }
        }
    }

    #[test]
    fn test_three_propagation() {
        let zone = Uuid::new_v4();
        let mut matches = build_matches(zone, drafts_for(ZoneFormat::Three, &[1, 2, 3]).unwrap());
        assert!(propagate(&mut matches, zone).is_empty());

        finalize(&mut matches, MatchKind::Initial, Side::Two);
        let filled = propagate(&mut matches, zone);
        assert_eq!(filled.len(), 2);

        let loser = matches.iter().find(|m| m.kind == MatchKind::LoserVsThird).unwrap();
        let winner = matches.iter().find(|m| m.kind == MatchKind::WinnerVsThird).unwrap();
        assert_eq!(loser.slot1, Some(1));
        assert_eq!(winner.slot1, Some(2));

        // written once
        assert!(propagate(&mut matches, zone).is_empty());
    }

    #[test]
    fn test_four_propagation_waits_for_both_initials() {
        let zone = Uuid::new_v4();
        let mut matches = build_matches(zone, drafts_for(ZoneFormat::Four, &[1, 2, 3, 4]).unwrap());

        finalize(&mut matches, MatchKind::Initial1, Side::One);
        assert!(propagate(&mut matches, zone).is_empty());
        let losers = matches.iter().find(|m| m.kind == MatchKind::Losers).unwrap();
        assert_eq!(losers.slot1, None);

        finalize(&mut matches, MatchKind::Initial2, Side::Two);
        assert_eq!(propagate(&mut matches, zone).len(), 2);
        let losers = matches.iter().find(|m| m.kind == MatchKind::Losers).unwrap();
        let winners = matches.iter().find(|m| m.kind == MatchKind::Winners).unwrap();
        assert_eq!(losers.pairing(), Some((2, 3)));
        assert_eq!(winners.pairing(), Some((1, 4)));
    }
}
