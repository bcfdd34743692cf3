//! Tournament configuration, category snapshots and the operation facade.
//!
//! [`TournamentManager`] loads a category snapshot from a
//! [`TournamentRepository`](crate::db::TournamentRepository), applies one
//! engine operation to a copy and commits the copy as a whole.
//!
//! ## Example
//!
//! ```no_run
//! use padel_zones::db::InMemoryTournamentRepository;
//! use padel_zones::tournament::{CategoryKey, TournamentConfig, TournamentManager};
//! use padel_zones::zone::Entrant;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(InMemoryTournamentRepository::new()));
//!
//!     let saturday = NaiveDate::from_ymd_opt(2026, 5, 9).unwrap();
//!     manager
//!         .configure_tournament(1, TournamentConfig::weekend("Fecha 4".to_string(), saturday))
//!         .await?;
//!
//!     let key = CategoryKey::new(1, 7);
//!     let entrants = (1..=9).map(|i| Entrant::new(i, format!("Pair {i}"))).collect();
//!     manager.register_entrants(key, entrants).await?;
//!
//!     let zones = manager.generate_zones(key).await?;
//!     println!("Generated {} zones", zones.len());
//!
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::TournamentManager;
pub use models::{
    CategoryId, CategoryKey, CategoryState, EntrantId, PlayDay, TournamentConfig, TournamentId,
    ZoneView,
};
