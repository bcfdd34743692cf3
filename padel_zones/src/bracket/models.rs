//! Single-elimination bracket data models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{MatchScore, Side};
use crate::tournament::models::EntrantId;
use crate::zone::models::MatchId;

/// Bracket round, earliest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketRound {
    RoundOf32,
    RoundOf16,
    QuarterFinal,
    SemiFinal,
    Final,
}

impl BracketRound {
    /// Round played by `entrants` remaining slots
    pub fn for_slots(entrants: usize) -> Option<Self> {
        match entrants {
            32 => Some(BracketRound::RoundOf32),
            16 => Some(BracketRound::RoundOf16),
            8 => Some(BracketRound::QuarterFinal),
            4 => Some(BracketRound::SemiFinal),
            2 => Some(BracketRound::Final),
            _ => None,
        }
    }

    /// Slots the round starts with
    pub fn slots(self) -> usize {
        match self {
            BracketRound::RoundOf32 => 32,
            BracketRound::RoundOf16 => 16,
            BracketRound::QuarterFinal => 8,
            BracketRound::SemiFinal => 4,
            BracketRound::Final => 2,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            BracketRound::RoundOf32 => Some(BracketRound::RoundOf16),
            BracketRound::RoundOf16 => Some(BracketRound::QuarterFinal),
            BracketRound::QuarterFinal => Some(BracketRound::SemiFinal),
            BracketRound::SemiFinal => Some(BracketRound::Final),
            BracketRound::Final => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BracketRound::RoundOf32 => "round_of_32",
            BracketRound::RoundOf16 => "round_of_16",
            BracketRound::QuarterFinal => "quarter_final",
            BracketRound::SemiFinal => "semi_final",
            BracketRound::Final => "final",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            BracketRound::RoundOf32,
            BracketRound::RoundOf16,
            BracketRound::QuarterFinal,
            BracketRound::SemiFinal,
            BracketRound::Final,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
    }
}

/// A match of the elimination bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketMatch {
    pub id: MatchId,
    pub round: BracketRound,
    /// 1-based position within the round
    pub position: u32,
    /// Zone-standing reference the slot was filled from, first round only
    pub slot1_ref: Option<String>,
    pub slot2_ref: Option<String>,
    pub slot1: Option<EntrantId>,
    pub slot2: Option<EntrantId>,
    pub score: Option<MatchScore>,
    pub winner: Option<Side>,
    /// One side has no opponent and advances without a score
    pub bye: bool,
}

impl BracketMatch {
    pub fn new(round: BracketRound, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            round,
            position,
            slot1_ref: None,
            slot2_ref: None,
            slot1: None,
            slot2: None,
            score: None,
            winner: None,
            bye: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.winner.is_some()
    }

    pub fn entrant(&self, side: Side) -> Option<EntrantId> {
        match side {
            Side::One => self.slot1,
            Side::Two => self.slot2,
        }
    }

    pub fn winner_id(&self) -> Option<EntrantId> {
        self.winner.and_then(|side| self.entrant(side))
    }

    /// Next-round position this match feeds, and the side it fills there
    pub fn feeds(&self) -> (u32, Side) {
        let side = if self.position % 2 == 1 { Side::One } else { Side::Two };
        (self.position.div_ceil(2), side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_progression() {
        assert_eq!(BracketRound::for_slots(16), Some(BracketRound::RoundOf16));
        assert_eq!(BracketRound::QuarterFinal.next(), Some(BracketRound::SemiFinal));
        assert_eq!(BracketRound::Final.next(), None);
        assert!(BracketRound::SemiFinal < BracketRound::Final);
    }

    #[test]
    fn test_feeds_alternate_slots() {
        assert_eq!(BracketMatch::new(BracketRound::QuarterFinal, 1).feeds(), (1, Side::One));
        assert_eq!(BracketMatch::new(BracketRound::QuarterFinal, 2).feeds(), (1, Side::Two));
        assert_eq!(BracketMatch::new(BracketRound::QuarterFinal, 3).feeds(), (2, Side::One));
    }
}
