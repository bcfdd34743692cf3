//! Error types shared by every engine operation.

use thiserror::Error;

use crate::scoring::ScoreError;
use crate::tournament::models::{CategoryKey, EntrantId, TournamentId};
use crate::zone::models::{MatchId, ZoneId};

/// Broad classes of failure, used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or unsupported setup, rejected before any state change
    Configuration,
    /// Referenced entity does not exist
    NotFound,
    /// Operation would break a zone, match or bracket invariant
    Invariant,
    /// Requested reshaping has no valid result
    Structural,
    /// Concurrent write detected, safe to retry
    Conflict,
    /// Persistence layer failure
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Invariant => write!(f, "invariant"),
            ErrorKind::Structural => write!(f, "structural"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Tournament engine errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Unsupported entrant count {count}: zones need between {min} and {max} entrants")]
    UnsupportedEntrantCount { count: usize, min: usize, max: usize },

    #[error("Invalid tournament configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid bracket layout for {entrants} entrants: {reason}")]
    InvalidLayout { entrants: usize, reason: String },

    #[error("Withdrawing from 3-entrant zone {0} requires a policy")]
    WithdrawPolicyRequired(ZoneId),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryKey),

    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Entrant {entrant} is not a member of zone {zone}")]
    EntrantNotInZone { entrant: EntrantId, zone: ZoneId },

    #[error("Invalid score: {0}")]
    Score(#[from] ScoreError),

    #[error("Match {0} already has a decided result")]
    MatchAlreadyDecided(MatchId),

    #[error("Match {0} is still waiting for a previous result")]
    MatchAwaitingPrerequisites(MatchId),

    #[error("Match {0} is a bye and takes no score")]
    ByeMatch(MatchId),

    #[error("Entrant {entrant} already has finalized matches in zone {zone}")]
    FinalizedMatches { entrant: EntrantId, zone: ZoneId },

    #[error("Zone {0} is closed")]
    ZoneClosed(ZoneId),

    #[error("Zone {zone} cannot hold more than {capacity} entrants")]
    ZoneCapacity { zone: ZoneId, capacity: usize },

    #[error("Zone {zone} still has {pending} unfinished matches")]
    ZoneIncomplete { zone: ZoneId, pending: usize },

    #[error("Zone {0} has no triple tie to resolve")]
    NoTieToResolve(ZoneId),

    #[error("{open} zones of the category are still open")]
    ZonesStillOpen { open: usize },

    #[error("Zones of category {0} already have finalized results")]
    ZonesAlreadyPlayed(CategoryKey),

    #[error("Bracket of category {0} was already generated")]
    BracketAlreadyGenerated(CategoryKey),

    #[error("No zone can donate an entrant to zone {0}")]
    NoDonorZone(ZoneId),

    #[error("No destination zone given for entrant {0}")]
    MissingDestination(EntrantId),

    #[error("Zone {0} would be left with a single entrant")]
    SingleEntrantZone(ZoneId),

    #[error("Zone {zone} cannot be re-templated: {reason}")]
    IncompatibleResults { zone: ZoneId, reason: String },

    #[error("Matches of day {day} run past the end of the schedule")]
    ScheduleOverflow { day: u8 },

    #[error("Bracket expects {expected} zones, category has {actual}")]
    LayoutMismatch { expected: usize, actual: usize },

    #[error("Concurrent update on category {key}: expected version {expected}")]
    Conflict { key: CategoryKey, expected: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::UnsupportedEntrantCount { .. }
            | TournamentError::InvalidConfig(_)
            | TournamentError::InvalidRequest(_)
            | TournamentError::InvalidLayout { .. }
            | TournamentError::WithdrawPolicyRequired(_) => ErrorKind::Configuration,

            TournamentError::TournamentNotFound(_)
            | TournamentError::CategoryNotFound(_)
            | TournamentError::ZoneNotFound(_)
            | TournamentError::MatchNotFound(_)
            | TournamentError::EntrantNotInZone { .. } => ErrorKind::NotFound,

            TournamentError::Score(_)
            | TournamentError::MatchAlreadyDecided(_)
            | TournamentError::MatchAwaitingPrerequisites(_)
            | TournamentError::ByeMatch(_)
            | TournamentError::FinalizedMatches { .. }
            | TournamentError::ZoneClosed(_)
            | TournamentError::ZoneCapacity { .. }
            | TournamentError::ZoneIncomplete { .. }
            | TournamentError::NoTieToResolve(_)
            | TournamentError::ZonesStillOpen { .. }
            | TournamentError::ZonesAlreadyPlayed(_)
            | TournamentError::BracketAlreadyGenerated(_) => ErrorKind::Invariant,

            TournamentError::NoDonorZone(_)
            | TournamentError::MissingDestination(_)
            | TournamentError::SingleEntrantZone(_)
            | TournamentError::IncompatibleResults { .. }
            | TournamentError::LayoutMismatch { .. }
            | TournamentError::ScheduleOverflow { .. } => ErrorKind::Structural,

            TournamentError::Conflict { .. } => ErrorKind::Conflict,

            TournamentError::Database(e) => {
                // serialization_failure / deadlock_detected
                let code = e
                    .as_database_error()
                    .and_then(|db| db.code())
                    .map(|c| c.into_owned());
                match code.as_deref() {
                    Some("40001") | Some("40P01") => ErrorKind::Conflict,
                    _ => ErrorKind::Storage,
                }
            }
            TournamentError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) if self.kind() == ErrorKind::Conflict => {
                "Concurrent update, please retry".to_string()
            }
            TournamentError::Database(_) | TournamentError::Serialization(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
