//! Tournament manager: the operation facade over a category repository.

use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};

use super::models::{CategoryKey, CategoryState, TournamentConfig, TournamentId, ZoneView};
use crate::bracket::models::BracketMatch;
use crate::bracket::resolve::{self, BracketUpdate};
use crate::db::repository::TournamentRepository;
use crate::errors::{TournamentError, TournamentResult};
use crate::scoring::{MatchFormat, MatchScore};
use crate::tournament::models::EntrantId;
use crate::zone::models::{Entrant, MatchId, ZoneId};
use crate::zone::mutation::{self, WithdrawPolicy};
use crate::zone::partition::build_zones;
use crate::zone::results::{ZoneMatchUpdate, record_result};
use crate::zone::standings::{self, CloseOutcome, Standing, TieBreakMethod, compute_standings};

fn zone_view(state: &CategoryState, format: MatchFormat, zone_id: ZoneId) -> TournamentResult<ZoneView> {
    let zone = state.zone(zone_id)?;
    let matches = state.zone_matches(zone_id);
    Ok(ZoneView {
        zone: zone.clone(),
        standings: compute_standings(zone, &matches, format),
        matches: matches.into_iter().cloned().collect(),
    })
}

fn zone_views(state: &CategoryState, format: MatchFormat) -> TournamentResult<Vec<ZoneView>> {
    state
        .zones_in_order()
        .into_iter()
        .map(|z| zone_view(state, format, z.id))
        .collect()
}

/// Tournament manager
///
/// Every mutating operation loads the category snapshot, applies one engine
/// operation to it and commits the whole snapshot. A failed operation writes
/// nothing; a commit that races another one fails with `Conflict`.
#[derive(Clone)]
pub struct TournamentManager {
    repo: Arc<dyn TournamentRepository>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(repo: Arc<dyn TournamentRepository>) -> Self {
        Self { repo }
    }

    /// Repository this manager commits to
    pub fn repository(&self) -> &Arc<dyn TournamentRepository> {
        &self.repo
    }

    async fn load(&self, key: CategoryKey) -> TournamentResult<CategoryState> {
        self.repo
            .load_category(key)
            .await?
            .ok_or(TournamentError::CategoryNotFound(key))
    }

    /// Run `op` on the current snapshot of `key` and commit the result
    async fn apply<T, F>(&self, key: CategoryKey, operation: &'static str, op: F) -> TournamentResult<T>
    where
        F: FnOnce(&mut CategoryState, &TournamentConfig) -> TournamentResult<T>,
    {
        let config = self.repo.tournament_config(key.tournament_id).await?;
        let mut state = self.load(key).await?;

        let output = match op(&mut state, &config) {
            Ok(output) => output,
            Err(e) => {
                warn!("{} rejected for category {}: {}", operation, key, e);
                return Err(e);
            }
        };

        let version = self.repo.save_category(&state).await?;
        info!("{} committed for category {} (version {})", operation, key, version);
        Ok(output)
    }

    /// Create or replace a tournament's configuration
    pub async fn configure_tournament(
        &self,
        tournament_id: TournamentId,
        config: TournamentConfig,
    ) -> TournamentResult<()> {
        config.validate()?;
        self.repo.save_tournament_config(tournament_id, &config).await?;
        info!("Tournament {} configured: {}", tournament_id, config.name);
        Ok(())
    }

    pub async fn tournament_config(&self, tournament_id: TournamentId) -> TournamentResult<TournamentConfig> {
        self.repo.tournament_config(tournament_id).await
    }

    /// Register the entrants of a category, replacing any earlier registration
    ///
    /// Zones generated before are discarded and must be generated again.
    ///
    /// # Errors
    ///
    /// Rejects duplicate entrant ids, and categories whose zones already have
    /// results or whose bracket exists.
    pub async fn register_entrants(
        &self,
        key: CategoryKey,
        entrants: Vec<Entrant>,
    ) -> TournamentResult<usize> {
        let mut seen = HashSet::with_capacity(entrants.len());
        if let Some(duplicate) = entrants.iter().find(|e| !seen.insert(e.id)) {
            return Err(TournamentError::InvalidRequest(format!(
                "entrant {} is registered twice",
                duplicate.id
            )));
        }
        let count = entrants.len();

        // Fails with TournamentNotFound before anything is written
        self.repo.tournament_config(key.tournament_id).await?;

        let state = match self.repo.load_category(key).await? {
            None => CategoryState::new(key, entrants),
            Some(mut state) => {
                if !state.bracket.is_empty() {
                    return Err(TournamentError::BracketAlreadyGenerated(key));
                }
                if state.matches.iter().any(|m| m.is_finalized()) {
                    return Err(TournamentError::ZonesAlreadyPlayed(key));
                }
                state.entrants = entrants;
                state.zones.clear();
                state.matches.clear();
                state
            }
        };

        self.repo.save_category(&state).await?;
        info!("Registered {} entrants in category {}", count, key);
        Ok(count)
    }

    /// Registered entrants of a category
    pub async fn entrants(&self, key: CategoryKey) -> TournamentResult<Vec<Entrant>> {
        Ok(self.load(key).await?.entrants)
    }

    /// Partition the category's entrants into zones and schedule their matches
    pub async fn generate_zones(&self, key: CategoryKey) -> TournamentResult<Vec<ZoneView>> {
        self.apply(key, "generate zones", |state, config| {
            build_zones(state, config)?;
            zone_views(state, config.match_format)
        })
        .await
    }

    /// Record a (possibly partial) score on a zone match
    pub async fn record_zone_match_result(
        &self,
        match_id: MatchId,
        score: MatchScore,
    ) -> TournamentResult<ZoneMatchUpdate> {
        let key = self.repo.locate_match(match_id).await?;
        self.apply(key, "record zone result", |state, config| {
            record_result(state, config.match_format, match_id, score)
        })
        .await
    }

    /// Move an entrant to another zone, or swap it with `swap_with`
    pub async fn move_entrant(
        &self,
        entrant_id: EntrantId,
        from_zone: ZoneId,
        to_zone: ZoneId,
        swap_with: Option<EntrantId>,
    ) -> TournamentResult<()> {
        let key = self.repo.locate_zone(from_zone).await?;
        self.apply(key, "move entrant", |state, config| {
            mutation::move_entrant(state, config, entrant_id, from_zone, to_zone, swap_with)
        })
        .await
    }

    /// Withdraw an entrant from its zone
    pub async fn withdraw_entrant(
        &self,
        entrant_id: EntrantId,
        zone_id: ZoneId,
        policy: Option<WithdrawPolicy>,
    ) -> TournamentResult<()> {
        let key = self.repo.locate_zone(zone_id).await?;
        self.apply(key, "withdraw entrant", |state, config| {
            mutation::withdraw_entrant(state, config, entrant_id, zone_id, policy.as_ref())
        })
        .await
    }

    /// Close a zone, or report the triple tie blocking it
    pub async fn close_zone(&self, zone_id: ZoneId) -> TournamentResult<CloseOutcome> {
        let key = self.repo.locate_zone(zone_id).await?;
        self.apply(key, "close zone", |state, config| {
            standings::close_zone(state, config.match_format, zone_id)
        })
        .await
    }

    /// Settle a zone's triple tie and return its standings
    pub async fn resolve_tie(
        &self,
        zone_id: ZoneId,
        method: TieBreakMethod,
    ) -> TournamentResult<Vec<Standing>> {
        let key = self.repo.locate_zone(zone_id).await?;
        self.apply(key, "resolve tie", |state, config| {
            standings::resolve_tie(state, config.match_format, zone_id, &method, &mut rand::rng())
        })
        .await
    }

    /// Build the bracket once every zone of the category is closed
    pub async fn generate_bracket(&self, key: CategoryKey) -> TournamentResult<Vec<BracketMatch>> {
        self.apply(key, "generate bracket", |state, config| {
            resolve::generate_bracket(state, config.match_format)
        })
        .await
    }

    /// Record a score on a bracket match and advance its winner
    pub async fn record_bracket_result(
        &self,
        match_id: MatchId,
        score: MatchScore,
    ) -> TournamentResult<BracketUpdate> {
        let key = self.repo.locate_match(match_id).await?;
        self.apply(key, "record bracket result", |state, config| {
            resolve::record_bracket_result(state, config.match_format, match_id, score)
        })
        .await
    }

    pub async fn zone_standings(&self, zone_id: ZoneId) -> TournamentResult<Vec<Standing>> {
        let key = self.repo.locate_zone(zone_id).await?;
        let config = self.repo.tournament_config(key.tournament_id).await?;
        let state = self.load(key).await?;
        standings::zone_standings(&state, config.match_format, zone_id)
    }

    pub async fn zone(&self, zone_id: ZoneId) -> TournamentResult<ZoneView> {
        let key = self.repo.locate_zone(zone_id).await?;
        let config = self.repo.tournament_config(key.tournament_id).await?;
        let state = self.load(key).await?;
        zone_view(&state, config.match_format, zone_id)
    }

    /// Every zone of a category with matches and standings, in creation order
    pub async fn list_zones(&self, key: CategoryKey) -> TournamentResult<Vec<ZoneView>> {
        let config = self.repo.tournament_config(key.tournament_id).await?;
        let state = self.load(key).await?;
        zone_views(&state, config.match_format)
    }

    /// Bracket of a category, earliest round first
    pub async fn bracket(&self, key: CategoryKey) -> TournamentResult<Vec<BracketMatch>> {
        let mut bracket = self.load(key).await?.bracket;
        bracket.sort_by_key(|m| (m.round, m.position));
        Ok(bracket)
    }

    /// Check the repository is reachable
    pub async fn health_check(&self) -> TournamentResult<()> {
        self.repo.health_check().await
    }
}
