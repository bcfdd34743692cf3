//! Repository trait and PostgreSQL implementation for category snapshots.
//!
//! A category is always written as a whole: inside one transaction the stored
//! version is locked and compared, every row of the category is replaced, and
//! the version is bumped. A moved version means another request committed in
//! between and the write is rejected with `Conflict`.

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::bracket::models::{BracketMatch, BracketRound};
use crate::errors::{TournamentError, TournamentResult};
use crate::schedule::Booking;
use crate::scoring::{MatchScore, Side};
use crate::tournament::models::{CategoryKey, CategoryState, TournamentConfig, TournamentId};
use crate::zone::models::{
    DayPreference, Entrant, MatchId, MatchKind, Zone, ZoneFormat, ZoneId, ZoneMatch, ZoneStatus,
};

/// Persistence collaborator of the engine
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Configuration of a tournament
    async fn tournament_config(&self, tournament_id: TournamentId) -> TournamentResult<TournamentConfig>;

    /// Create or replace a tournament's configuration
    async fn save_tournament_config(
        &self,
        tournament_id: TournamentId,
        config: &TournamentConfig,
    ) -> TournamentResult<()>;

    /// Load a category snapshot, `None` if the category was never saved
    async fn load_category(&self, key: CategoryKey) -> TournamentResult<Option<CategoryState>>;

    /// Commit a snapshot loaded at `state.version`, returning the new version
    ///
    /// A snapshot with version 0 creates the category.
    async fn save_category(&self, state: &CategoryState) -> TournamentResult<i64>;

    /// Category a zone belongs to
    async fn locate_zone(&self, zone_id: ZoneId) -> TournamentResult<CategoryKey>;

    /// Category a zone or bracket match belongs to
    async fn locate_match(&self, match_id: MatchId) -> TournamentResult<CategoryKey>;

    /// Check the backing store is reachable
    async fn health_check(&self) -> TournamentResult<()>;
}

fn decode_error(message: String) -> TournamentError {
    TournamentError::Database(sqlx::Error::Decode(message.into()))
}

fn small(value: i16, column: &str) -> TournamentResult<u8> {
    u8::try_from(value).map_err(|_| decode_error(format!("{column} out of range: {value}")))
}

fn unsigned(value: i32, column: &str) -> TournamentResult<u32> {
    u32::try_from(value).map_err(|_| decode_error(format!("{column} out of range: {value}")))
}

fn side(value: Option<i16>) -> TournamentResult<Option<Side>> {
    value
        .map(|n| Side::from_number(n).ok_or_else(|| decode_error(format!("invalid winner {n}"))))
        .transpose()
}

fn score(value: Option<serde_json::Value>) -> TournamentResult<Option<MatchScore>> {
    Ok(value.map(serde_json::from_value).transpose()?)
}

fn score_json(score: &Option<MatchScore>) -> TournamentResult<Option<serde_json::Value>> {
    Ok(score.as_ref().map(serde_json::to_value).transpose()?)
}

fn entrant_from_row(row: &PgRow) -> TournamentResult<Entrant> {
    let preferred: Option<i16> = row.try_get("preferred_day")?;
    Ok(Entrant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_seed: row.try_get("is_seed")?,
        preferred_day: DayPreference::from_day(
            preferred.map(|d| small(d, "preferred_day")).transpose()?,
        ),
        earliest_time: row.try_get::<Option<NaiveTime>, _>("earliest_time")?,
    })
}

fn zone_from_row(row: &PgRow) -> TournamentResult<Zone> {
    let format: String = row.try_get("format")?;
    let status: String = row.try_get("status")?;
    Ok(Zone {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        day: small(row.try_get("day")?, "day")?,
        position: unsigned(row.try_get("position")?, "position")?,
        format: ZoneFormat::parse(&format)
            .ok_or_else(|| decode_error(format!("unknown zone format {format:?}")))?,
        status: match status.as_str() {
            "open" => ZoneStatus::Open,
            "closed" => ZoneStatus::Closed,
            other => return Err(decode_error(format!("unknown zone status {other:?}"))),
        },
        members: row.try_get("members")?,
        tie_break: row.try_get("tie_break")?,
    })
}

fn zone_match_from_row(row: &PgRow) -> TournamentResult<ZoneMatch> {
    let kind: String = row.try_get("kind")?;
    let day: Option<i16> = row.try_get("day")?;
    let court: Option<i16> = row.try_get("court")?;
    let start: Option<i32> = row.try_get("start_minute")?;
    let booking = match (day, court, start) {
        (Some(day), Some(court), Some(start)) => Some(Booking {
            day: small(day, "day")?,
            court: small(court, "court")?,
            start_minute: unsigned(start, "start_minute")?,
        }),
        _ => None,
    };

    Ok(ZoneMatch {
        id: row.try_get("id")?,
        zone_id: row.try_get("zone_id")?,
        kind: MatchKind::parse(&kind)
            .ok_or_else(|| decode_error(format!("unknown match kind {kind:?}")))?,
        order: unsigned(row.try_get("match_order")?, "match_order")?,
        slot1: row.try_get("slot1")?,
        slot2: row.try_get("slot2")?,
        score: score(row.try_get("score")?)?,
        winner: side(row.try_get("winner")?)?,
        booking,
    })
}

fn bracket_match_from_row(row: &PgRow) -> TournamentResult<BracketMatch> {
    let round: String = row.try_get("round")?;
    Ok(BracketMatch {
        id: row.try_get("id")?,
        round: BracketRound::parse(&round)
            .ok_or_else(|| decode_error(format!("unknown bracket round {round:?}")))?,
        position: unsigned(row.try_get("position")?, "position")?,
        slot1_ref: row.try_get("slot1_ref")?,
        slot2_ref: row.try_get("slot2_ref")?,
        slot1: row.try_get("slot1")?,
        slot2: row.try_get("slot2")?,
        score: score(row.try_get("score")?)?,
        winner: side(row.try_get("winner")?)?,
        bye: row.try_get("bye")?,
    })
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replace_rows(
        tx: &mut Transaction<'_, Postgres>,
        state: &CategoryState,
    ) -> TournamentResult<()> {
        let key = state.key;

        sqlx::query("DELETE FROM bracket_matches WHERE tournament_id = $1 AND category_id = $2")
            .bind(key.tournament_id)
            .bind(key.category_id)
            .execute(&mut **tx)
            .await?;
        // zone_matches cascade with their zone
        sqlx::query("DELETE FROM zones WHERE tournament_id = $1 AND category_id = $2")
            .bind(key.tournament_id)
            .bind(key.category_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM entrants WHERE tournament_id = $1 AND category_id = $2")
            .bind(key.tournament_id)
            .bind(key.category_id)
            .execute(&mut **tx)
            .await?;

        for (order, entrant) in state.entrants.iter().enumerate() {
            sqlx::query(
                "INSERT INTO entrants (tournament_id, category_id, id, name, is_seed, preferred_day, earliest_time, registration_order)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(key.tournament_id)
            .bind(key.category_id)
            .bind(entrant.id)
            .bind(&entrant.name)
            .bind(entrant.is_seed)
            .bind(entrant.preferred_day.as_day().map(i16::from))
            .bind(entrant.earliest_time)
            .bind(order as i32)
            .execute(&mut **tx)
            .await?;
        }

        for zone in &state.zones {
            sqlx::query(
                "INSERT INTO zones (id, tournament_id, category_id, name, day, position, format, status, members, tie_break)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(zone.id)
            .bind(key.tournament_id)
            .bind(key.category_id)
            .bind(&zone.name)
            .bind(i16::from(zone.day))
            .bind(zone.position as i32)
            .bind(zone.format.as_str())
            .bind(if zone.is_open() { "open" } else { "closed" })
            .bind(&zone.members)
            .bind(&zone.tie_break)
            .execute(&mut **tx)
            .await?;
        }

        for m in &state.matches {
            sqlx::query(
                "INSERT INTO zone_matches (id, zone_id, kind, match_order, slot1, slot2, score, winner, day, court, start_minute)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(m.id)
            .bind(m.zone_id)
            .bind(m.kind.as_str())
            .bind(m.order as i32)
            .bind(m.slot1)
            .bind(m.slot2)
            .bind(score_json(&m.score)?)
            .bind(m.winner.map(Side::number))
            .bind(m.booking.map(|b| i16::from(b.day)))
            .bind(m.booking.map(|b| i16::from(b.court)))
            .bind(m.booking.map(|b| b.start_minute as i32))
            .execute(&mut **tx)
            .await?;
        }

        for m in &state.bracket {
            sqlx::query(
                "INSERT INTO bracket_matches (id, tournament_id, category_id, round, position, slot1_ref, slot2_ref, slot1, slot2, score, winner, bye)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(m.id)
            .bind(key.tournament_id)
            .bind(key.category_id)
            .bind(m.round.as_str())
            .bind(m.position as i32)
            .bind(&m.slot1_ref)
            .bind(&m.slot2_ref)
            .bind(m.slot1)
            .bind(m.slot2)
            .bind(score_json(&m.score)?)
            .bind(m.winner.map(Side::number))
            .bind(m.bye)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn tournament_config(&self, tournament_id: TournamentId) -> TournamentResult<TournamentConfig> {
        let row = sqlx::query("SELECT config FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))?;

        let config: serde_json::Value = row.try_get("config")?;
        Ok(serde_json::from_value(config)?)
    }

    async fn save_tournament_config(
        &self,
        tournament_id: TournamentId,
        config: &TournamentConfig,
    ) -> TournamentResult<()> {
        let config_json = serde_json::to_value(config)?;

        sqlx::query(
            r#"
            INSERT INTO tournaments (id, name, config)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, config = EXCLUDED.config, updated_at = NOW()
            "#,
        )
        .bind(tournament_id)
        .bind(&config.name)
        .bind(config_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_category(&self, key: CategoryKey) -> TournamentResult<Option<CategoryState>> {
        let Some(header) = sqlx::query(
            "SELECT version FROM categories WHERE tournament_id = $1 AND category_id = $2",
        )
        .bind(key.tournament_id)
        .bind(key.category_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let entrants = sqlx::query(
            "SELECT id, name, is_seed, preferred_day, earliest_time FROM entrants
             WHERE tournament_id = $1 AND category_id = $2
             ORDER BY registration_order",
        )
        .bind(key.tournament_id)
        .bind(key.category_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(entrant_from_row)
        .collect::<TournamentResult<Vec<_>>>()?;

        let zones = sqlx::query(
            "SELECT id, name, day, position, format, status, members, tie_break FROM zones
             WHERE tournament_id = $1 AND category_id = $2
             ORDER BY position",
        )
        .bind(key.tournament_id)
        .bind(key.category_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(zone_from_row)
        .collect::<TournamentResult<Vec<_>>>()?;

        let matches = sqlx::query(
            "SELECT m.id, m.zone_id, m.kind, m.match_order, m.slot1, m.slot2, m.score, m.winner,
                    m.day, m.court, m.start_minute
             FROM zone_matches m
             JOIN zones z ON z.id = m.zone_id
             WHERE z.tournament_id = $1 AND z.category_id = $2
             ORDER BY z.position, m.match_order",
        )
        .bind(key.tournament_id)
        .bind(key.category_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(zone_match_from_row)
        .collect::<TournamentResult<Vec<_>>>()?;

        let mut bracket = sqlx::query(
            "SELECT id, round, position, slot1_ref, slot2_ref, slot1, slot2, score, winner, bye
             FROM bracket_matches
             WHERE tournament_id = $1 AND category_id = $2",
        )
        .bind(key.tournament_id)
        .bind(key.category_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(bracket_match_from_row)
        .collect::<TournamentResult<Vec<_>>>()?;
        bracket.sort_by_key(|m| (m.round, m.position));

        Ok(Some(CategoryState {
            key,
            version: header.try_get("version")?,
            entrants,
            zones,
            matches,
            bracket,
        }))
    }

    async fn save_category(&self, state: &CategoryState) -> TournamentResult<i64> {
        let key = state.key;
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 AS one FROM tournaments WHERE id = $1")
            .bind(key.tournament_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(TournamentError::TournamentNotFound(key.tournament_id));
        }

        // Lock the header row so concurrent commits serialize on it
        let current: Option<i64> = sqlx::query(
            "SELECT version FROM categories WHERE tournament_id = $1 AND category_id = $2 FOR UPDATE",
        )
        .bind(key.tournament_id)
        .bind(key.category_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| row.try_get("version"))
        .transpose()?;

        let conflict = TournamentError::Conflict {
            key,
            expected: state.version,
        };
        let new_version = match current {
            None if state.version == 0 => {
                let inserted = sqlx::query(
                    "INSERT INTO categories (tournament_id, category_id, version) VALUES ($1, $2, 1)
                     ON CONFLICT DO NOTHING",
                )
                .bind(key.tournament_id)
                .bind(key.category_id)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 0 {
                    return Err(conflict);
                }
                1
            }
            Some(version) if version == state.version => {
                sqlx::query(
                    "UPDATE categories SET version = version + 1, updated_at = NOW()
                     WHERE tournament_id = $1 AND category_id = $2",
                )
                .bind(key.tournament_id)
                .bind(key.category_id)
                .execute(&mut *tx)
                .await?;
                version + 1
            }
            _ => return Err(conflict),
        };

        Self::replace_rows(&mut tx, state).await?;
        tx.commit().await?;

        Ok(new_version)
    }

    async fn locate_zone(&self, zone_id: ZoneId) -> TournamentResult<CategoryKey> {
        let row = sqlx::query("SELECT tournament_id, category_id FROM zones WHERE id = $1")
            .bind(zone_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TournamentError::ZoneNotFound(zone_id))?;

        Ok(CategoryKey::new(
            row.try_get("tournament_id")?,
            row.try_get("category_id")?,
        ))
    }

    async fn locate_match(&self, match_id: MatchId) -> TournamentResult<CategoryKey> {
        let row = sqlx::query(
            r#"
            SELECT z.tournament_id, z.category_id
            FROM zone_matches m JOIN zones z ON z.id = m.zone_id
            WHERE m.id = $1
            UNION ALL
            SELECT tournament_id, category_id FROM bracket_matches WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TournamentError::MatchNotFound(match_id))?;

        Ok(CategoryKey::new(
            row.try_get("tournament_id")?,
            row.try_get("category_id")?,
        ))
    }

    async fn health_check(&self) -> TournamentResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
