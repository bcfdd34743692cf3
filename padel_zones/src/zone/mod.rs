//! Zones: round-robin groups of a category.
//!
//! - [`partition`] distributes entrants into zones and books their matches
//! - [`template`] emits each zone's match dependency graph
//! - [`results`] records scores and fills dependent slots
//! - [`standings`] derives tables, detects triple ties and closes zones
//! - [`mutation`] handles moves, swaps and withdrawals while a zone is in play

pub mod models;
pub mod mutation;
pub mod partition;
pub mod results;
pub mod standings;
pub mod template;

pub use models::{
    DayPreference, Entrant, MatchId, MatchKind, Zone, ZoneFormat, ZoneId, ZoneMatch, ZoneStatus,
};
pub use mutation::{Relocation, WithdrawPolicy};
pub use results::ZoneMatchUpdate;
pub use standings::{CloseOutcome, Standing, TieBreakMethod};
