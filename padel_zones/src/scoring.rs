//! Set and match outcome evaluation.
//!
//! A set ends 6-0 to 6-4, 7-5, or 7-6 after a tie-break; any other finished
//! shape (9-0, 7-3) is rejected. Best-of-three matches are decided by the
//! first side to win two sets; a third set after a 2-0 is rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    One,
    Two,
}

impl Side {
    /// The opposing side
    pub fn other(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Numeric form used in storage (1 or 2)
    pub fn number(self) -> i16 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }

    /// Parse the storage form
    pub fn from_number(n: i16) -> Option<Self> {
        match n {
            1 => Some(Side::One),
            2 => Some(Side::Two),
            _ => None,
        }
    }
}

/// Games won by each side in one set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub side1: u8,
    pub side2: u8,
}

impl SetScore {
    pub const fn new(side1: u8, side2: u8) -> Self {
        Self { side1, side2 }
    }

    /// Same set seen from the other side
    pub fn swapped(self) -> Self {
        Self::new(self.side2, self.side1)
    }

    /// Games won by `side`
    pub fn games(self, side: Side) -> u8 {
        match side {
            Side::One => self.side1,
            Side::Two => self.side2,
        }
    }

    fn leader(self) -> Option<(Side, u8, u8)> {
        if self.side1 > self.side2 {
            Some((Side::One, self.side1, self.side2))
        } else if self.side2 > self.side1 {
            Some((Side::Two, self.side2, self.side1))
        } else {
            None
        }
    }
}

/// Where a set stands given its games
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetState {
    Open,
    Won(Side),
    Impossible,
}

/// Games set played to `target`: won at `target` by two, or one game later
fn games_set(target: u8, side: Side, high: u8, low: u8) -> SetState {
    let (target, high, low) = (u16::from(target), u16::from(high), u16::from(low));
    if high < target || (high == target && low + 2 > high) {
        SetState::Open
    } else if high == target || (high == target + 1 && low + 2 >= high) {
        SetState::Won(side)
    } else {
        SetState::Impossible
    }
}

/// Match tie-break to 10 points, won by two
fn tiebreak_set(side: Side, high: u8, low: u8) -> SetState {
    if high < 10 || high - low < 2 {
        SetState::Open
    } else if high == 10 || high - low == 2 {
        SetState::Won(side)
    } else {
        SetState::Impossible
    }
}

/// Scoring format of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchFormat {
    /// Best of three regular sets
    #[default]
    BestOfThree,
    /// Two regular sets, third set is a match tie-break to 10
    SuperTiebreak,
    /// Americano: a single set played to `target` games
    SingleSet { target: u8 },
}

impl MatchFormat {
    /// Maximum number of sets a score may carry
    pub fn max_sets(self) -> usize {
        match self {
            MatchFormat::BestOfThree | MatchFormat::SuperTiebreak => 3,
            MatchFormat::SingleSet { .. } => 1,
        }
    }

    /// Sets needed to win the match
    pub fn sets_to_win(self) -> u8 {
        match self {
            MatchFormat::BestOfThree | MatchFormat::SuperTiebreak => 2,
            MatchFormat::SingleSet { .. } => 1,
        }
    }

    /// Whether set number `index` (0-based) is a match tie-break
    pub fn is_tiebreak_set(self, index: usize) -> bool {
        matches!(self, MatchFormat::SuperTiebreak) && index == 2
    }

    fn set_state(self, index: usize, set: SetScore) -> SetState {
        let Some((side, high, low)) = set.leader() else {
            return if !self.is_tiebreak_set(index) && set.side1 > self.games_target() {
                SetState::Impossible
            } else {
                SetState::Open
            };
        };
        if self.is_tiebreak_set(index) {
            tiebreak_set(side, high, low)
        } else {
            games_set(self.games_target(), side, high, low)
        }
    }

    fn games_target(self) -> u8 {
        match self {
            MatchFormat::SingleSet { target } => target,
            _ => 6,
        }
    }

    /// Winner of set number `index` (0-based), if the set is finished
    pub fn set_winner(self, index: usize, set: SetScore) -> Option<Side> {
        match self.set_state(index, set) {
            SetState::Won(side) => Some(side),
            SetState::Open | SetState::Impossible => None,
        }
    }

    /// Games credited to each side for standings purposes
    ///
    /// A match tie-break counts as a single game for its winner.
    pub fn credited_games(self, index: usize, set: SetScore) -> (u32, u32) {
        if self.is_tiebreak_set(index) {
            return match self.set_winner(index, set) {
                Some(Side::One) => (1, 0),
                Some(Side::Two) => (0, 1),
                None => (0, 0),
            };
        }
        (u32::from(set.side1), u32::from(set.side2))
    }
}

/// Result submitted for a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub sets: Vec<SetScore>,
}

impl MatchScore {
    pub fn new(sets: Vec<SetScore>) -> Self {
        Self { sets }
    }

    /// Build from `(side1, side2)` game pairs
    pub fn from_pairs(pairs: &[(u8, u8)]) -> Self {
        Self::new(pairs.iter().map(|&(a, b)| SetScore::new(a, b)).collect())
    }

    /// Same score seen from the other side
    pub fn swapped(&self) -> Self {
        Self::new(self.sets.iter().map(|s| s.swapped()).collect())
    }
}

/// Evaluated result of a score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Winner of each submitted set, `None` while unfinished
    pub set_winners: Vec<Option<Side>>,
    /// Match winner, `None` while undecided
    pub winner: Option<Side>,
}

impl Outcome {
    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// Sets won by `side`
    pub fn sets_won(&self, side: Side) -> u8 {
        self.set_winners.iter().filter(|w| **w == Some(side)).count() as u8
    }
}

/// Score validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("No sets were submitted")]
    Empty,

    #[error("At most {max} sets can be submitted, got {got}")]
    TooManySets { max: usize, got: usize },

    #[error("Set {set} was submitted after the match was already decided")]
    DecidedEarly { set: usize },

    #[error("Set {set} ({side1}-{side2}) is unfinished but later sets were submitted")]
    UnfinishedSet { set: usize, side1: u8, side2: u8 },

    #[error("Set {set} ({side1}-{side2}) is not a possible set score")]
    ImpossibleSet { set: usize, side1: u8, side2: u8 },
}

/// Evaluate a score under `format`
///
/// Undecided scores (e.g. one set each and no decider yet) are valid and
/// return an outcome without a winner.
pub fn evaluate(format: MatchFormat, score: &MatchScore) -> Result<Outcome, ScoreError> {
    if score.sets.is_empty() {
        return Err(ScoreError::Empty);
    }
    if score.sets.len() > format.max_sets() {
        return Err(ScoreError::TooManySets {
            max: format.max_sets(),
            got: score.sets.len(),
        });
    }

    let mut set_winners = Vec::with_capacity(score.sets.len());
    let mut won = [0u8; 2];
    let mut winner = None;

    for (index, set) in score.sets.iter().enumerate() {
        if winner.is_some() {
            return Err(ScoreError::DecidedEarly { set: index + 1 });
        }

        let set_winner = match format.set_state(index, *set) {
            SetState::Won(side) => Some(side),
            SetState::Open => None,
            SetState::Impossible => {
                return Err(ScoreError::ImpossibleSet {
                    set: index + 1,
                    side1: set.side1,
                    side2: set.side2,
                });
            }
        };
        if set_winner.is_none() && index + 1 < score.sets.len() {
            return Err(ScoreError::UnfinishedSet {
                set: index + 1,
                side1: set.side1,
                side2: set.side2,
            });
        }

        if let Some(side) = set_winner {
            let slot = &mut won[(side.number() - 1) as usize];
            *slot += 1;
            if *slot == format.sets_to_win() {
                winner = Some(side);
            }
        }
        set_winners.push(set_winner);
    }

    Ok(Outcome {
        set_winners,
        winner,
    })
}
