//! In-memory repository for tests, demos and the server's `memory` backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::repository::TournamentRepository;
use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{CategoryKey, CategoryState, TournamentConfig, TournamentId};
use crate::zone::models::{MatchId, ZoneId};

#[derive(Default)]
struct Store {
    tournaments: HashMap<TournamentId, TournamentConfig>,
    categories: HashMap<CategoryKey, CategoryState>,
}

/// Repository keeping every snapshot in a shared map
#[derive(Clone, Default)]
pub struct InMemoryTournamentRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        // A panic while holding the lock cannot leave a half-written snapshot
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn tournament_config(&self, tournament_id: TournamentId) -> TournamentResult<TournamentConfig> {
        self.store()
            .tournaments
            .get(&tournament_id)
            .cloned()
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    async fn save_tournament_config(
        &self,
        tournament_id: TournamentId,
        config: &TournamentConfig,
    ) -> TournamentResult<()> {
        self.store().tournaments.insert(tournament_id, config.clone());
        Ok(())
    }

    async fn load_category(&self, key: CategoryKey) -> TournamentResult<Option<CategoryState>> {
        Ok(self.store().categories.get(&key).cloned())
    }

    async fn save_category(&self, state: &CategoryState) -> TournamentResult<i64> {
        let mut store = self.store();
        if !store.tournaments.contains_key(&state.key.tournament_id) {
            return Err(TournamentError::TournamentNotFound(state.key.tournament_id));
        }

        let current = store.categories.get(&state.key).map_or(0, |s| s.version);
        if current != state.version {
            return Err(TournamentError::Conflict {
                key: state.key,
                expected: state.version,
            });
        }

        let mut committed = state.clone();
        committed.version = current + 1;
        store.categories.insert(state.key, committed);
        Ok(current + 1)
    }

    async fn locate_zone(&self, zone_id: ZoneId) -> TournamentResult<CategoryKey> {
        self.store()
            .categories
            .values()
            .find(|s| s.zones.iter().any(|z| z.id == zone_id))
            .map(|s| s.key)
            .ok_or(TournamentError::ZoneNotFound(zone_id))
    }

    async fn locate_match(&self, match_id: MatchId) -> TournamentResult<CategoryKey> {
        self.store()
            .categories
            .values()
            .find(|s| {
                s.matches.iter().any(|m| m.id == match_id)
                    || s.bracket.iter().any(|m| m.id == match_id)
            })
            .map(|s| s.key)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }
}
