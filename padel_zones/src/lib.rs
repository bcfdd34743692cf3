//! # Padel Zones
//!
//! Zone and bracket scheduling engine for amateur padel tournaments.
//!
//! A category's registered pairs are split into zones of three or four, each
//! zone plays a fixed match template whose later matches wait on the results
//! of earlier ones, and the top two of every zone enter a single-elimination
//! bracket drawn from a static lookup table.
//!
//! ## Core Modules
//!
//! - [`scoring`]: set and match outcome evaluation
//! - [`schedule`]: court and start-time assignment
//! - [`zone`]: partitioning, match templates, standings and roster changes
//! - [`bracket`]: lookup table, bracket generation and advancement
//! - [`tournament`]: configuration, category snapshots and the [`TournamentManager`]
//! - [`db`]: repository trait with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use padel_zones::scoring::{MatchFormat, MatchScore, Side, evaluate};
//!
//! let score = MatchScore::from_pairs(&[(6, 3), (4, 6), (7, 5)]);
//! let outcome = evaluate(MatchFormat::BestOfThree, &score).unwrap();
//! assert_eq!(outcome.winner, Some(Side::One));
//! ```

pub mod bracket;
pub mod db;
pub mod errors;
pub mod schedule;
pub mod scoring;
pub mod tournament;
pub mod zone;

pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use scoring::{MatchFormat, MatchScore, SetScore, Side};
pub use tournament::{CategoryKey, CategoryState, TournamentConfig, TournamentManager};
