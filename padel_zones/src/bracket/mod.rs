//! Single-elimination bracket built from zone standings.

pub mod layout;
pub mod models;
pub mod resolve;

pub use layout::{BracketLayout, MAX_ENTRANTS, MIN_ENTRANTS, layout_for, validate_all};
pub use models::{BracketMatch, BracketRound};
pub use resolve::BracketUpdate;
