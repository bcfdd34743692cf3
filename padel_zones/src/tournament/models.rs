//! Tournament configuration and the per-category snapshot every operation works on.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::bracket::models::BracketMatch;
use crate::errors::{TournamentError, TournamentResult};
use crate::scoring::MatchFormat;
use crate::zone::models::{Entrant, MatchId, Zone, ZoneId, ZoneMatch};
use crate::zone::standings::Standing;

/// Tournament ID type
pub type TournamentId = i64;

/// Category ID type
pub type CategoryId = i64;

/// Entrant (pair) ID type
pub type EntrantId = i64;

/// Largest zone the templates support
pub const MAX_ZONE_SIZE: usize = 4;

/// Longest court slot a match may take
pub const MAX_MATCH_MINUTES: u32 = 24 * 60;

/// A category within a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryKey {
    pub tournament_id: TournamentId,
    pub category_id: CategoryId,
}

impl CategoryKey {
    pub const fn new(tournament_id: TournamentId, category_id: CategoryId) -> Self {
        Self {
            tournament_id,
            category_id,
        }
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tournament_id, self.category_id)
    }
}

/// A playable day of the tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayDay {
    /// Calendar date
    pub date: NaiveDate,
    /// First match start on this day
    pub start: NaiveTime,
}

impl PlayDay {
    pub fn new(date: NaiveDate, start: NaiveTime) -> Self {
        Self { date, start }
    }

    /// Start time as minutes after midnight
    pub fn start_minute(&self) -> u32 {
        self.start.hour() * 60 + self.start.minute()
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Minutes reserved for every match
    pub match_duration_minutes: u32,
    /// Courts available at the venue
    pub courts: u8,
    /// Playable days, day 1 first
    pub days: Vec<PlayDay>,
    /// Scoring format for zone and bracket matches
    pub match_format: MatchFormat,
    /// Maximum entrants in a zone
    pub max_zone_size: usize,
}

impl TournamentConfig {
    /// Create a standard two-day weekend configuration
    ///
    /// Saturday play starts at 14:00, Sunday play at 09:00, 60-minute slots on
    /// three courts, best of three sets.
    pub fn weekend(name: String, saturday: NaiveDate) -> Self {
        let sunday = saturday.succ_opt().unwrap_or(saturday);
        Self {
            name,
            match_duration_minutes: 60,
            courts: 3,
            days: vec![
                PlayDay::new(saturday, NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default()),
                PlayDay::new(sunday, NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()),
            ],
            match_format: MatchFormat::BestOfThree,
            max_zone_size: MAX_ZONE_SIZE,
        }
    }

    /// Create a single-day configuration
    pub fn single_day(name: String, date: NaiveDate, start: NaiveTime, courts: u8) -> Self {
        Self {
            name,
            match_duration_minutes: 60,
            courts,
            days: vec![PlayDay::new(date, start)],
            match_format: MatchFormat::BestOfThree,
            max_zone_size: MAX_ZONE_SIZE,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> TournamentResult<()> {
        if self.match_duration_minutes == 0 {
            return Err(TournamentError::InvalidConfig(
                "Match duration must be greater than 0".to_string(),
            ));
        }

        if self.match_duration_minutes > MAX_MATCH_MINUTES {
            return Err(TournamentError::InvalidConfig(format!(
                "Match duration cannot exceed {MAX_MATCH_MINUTES} minutes"
            )));
        }

        if self.courts == 0 {
            return Err(TournamentError::InvalidConfig(
                "At least one court is required".to_string(),
            ));
        }

        if self.days.is_empty() {
            return Err(TournamentError::InvalidConfig(
                "At least one playable day is required".to_string(),
            ));
        }

        if self.days.windows(2).any(|w| w[1].date <= w[0].date) {
            return Err(TournamentError::InvalidConfig(
                "Playable days must be in chronological order".to_string(),
            ));
        }

        if !(3..=MAX_ZONE_SIZE).contains(&self.max_zone_size) {
            return Err(TournamentError::InvalidConfig(format!(
                "Max zone size must be between 3 and {MAX_ZONE_SIZE}"
            )));
        }

        if let MatchFormat::SingleSet { target } = self.match_format
            && target == 0
        {
            return Err(TournamentError::InvalidConfig(
                "Single-set target must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Number of playable days
    pub fn playable_days(&self) -> u8 {
        self.days.len().min(u8::MAX as usize) as u8
    }

    /// (day number, start minute) for every playable day, 1-based
    pub fn day_starts(&self) -> Vec<(u8, u32)> {
        self.days
            .iter()
            .enumerate()
            .map(|(i, d)| ((i + 1) as u8, d.start_minute()))
            .collect()
    }
}

/// Everything the engine knows about one category of one tournament
///
/// Loaded and committed as a unit so that every operation either applies
/// completely or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryState {
    pub key: CategoryKey,
    /// Optimistic concurrency version, bumped on every commit
    pub version: i64,
    pub entrants: Vec<Entrant>,
    pub zones: Vec<Zone>,
    pub matches: Vec<ZoneMatch>,
    pub bracket: Vec<BracketMatch>,
}

impl CategoryState {
    /// Fresh category with registered entrants and nothing generated yet
    pub fn new(key: CategoryKey, entrants: Vec<Entrant>) -> Self {
        Self {
            key,
            version: 0,
            entrants,
            zones: Vec::new(),
            matches: Vec::new(),
            bracket: Vec::new(),
        }
    }

    pub fn zone(&self, zone_id: ZoneId) -> TournamentResult<&Zone> {
        self.zones
            .iter()
            .find(|z| z.id == zone_id)
            .ok_or(TournamentError::ZoneNotFound(zone_id))
    }

    pub fn zone_mut(&mut self, zone_id: ZoneId) -> TournamentResult<&mut Zone> {
        self.zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or(TournamentError::ZoneNotFound(zone_id))
    }

    /// Zone that must still accept changes
    pub fn open_zone(&self, zone_id: ZoneId) -> TournamentResult<&Zone> {
        let zone = self.zone(zone_id)?;
        if !zone.is_open() {
            return Err(TournamentError::ZoneClosed(zone_id));
        }
        Ok(zone)
    }

    /// Matches of a zone, in schedule order
    pub fn zone_matches(&self, zone_id: ZoneId) -> Vec<&ZoneMatch> {
        let mut matches: Vec<&ZoneMatch> =
            self.matches.iter().filter(|m| m.zone_id == zone_id).collect();
        matches.sort_by_key(|m| m.order);
        matches
    }

    pub fn zone_match(&self, match_id: MatchId) -> TournamentResult<&ZoneMatch> {
        self.matches
            .iter()
            .find(|m| m.id == match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    pub fn entrant(&self, entrant_id: EntrantId) -> Option<&Entrant> {
        self.entrants.iter().find(|e| e.id == entrant_id)
    }

    /// Whether `entrant_id` has a decided match in `zone_id`
    pub fn has_finalized(&self, entrant_id: EntrantId, zone_id: ZoneId) -> bool {
        self.matches
            .iter()
            .any(|m| m.zone_id == zone_id && m.is_finalized() && m.involves(entrant_id))
    }

    /// Zones ordered by creation position
    pub fn zones_in_order(&self) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self.zones.iter().collect();
        zones.sort_by_key(|z| z.position);
        zones
    }

    /// Entrants currently placed in a zone
    pub fn zoned_entrant_count(&self) -> usize {
        self.zones.iter().map(|z| z.members.len()).sum()
    }
}

/// A zone together with its matches and current standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneView {
    pub zone: Zone,
    pub matches: Vec<ZoneMatch>,
    pub standings: Vec<Standing>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn test_weekend_config() {
        let config = TournamentConfig::weekend("Fecha 3".to_string(), saturday());
        assert!(config.validate().is_ok());
        assert_eq!(config.playable_days(), 2);
        assert_eq!(config.day_starts(), vec![(1, 14 * 60), (2, 9 * 60)]);
    }

    #[test]
    fn test_validate_rejects_zero_courts() {
        let mut config = TournamentConfig::weekend("Fecha".to_string(), saturday());
        config.courts = 0;
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unordered_days() {
        let mut config = TournamentConfig::weekend("Fecha".to_string(), saturday());
        config.days.reverse();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let mut config = TournamentConfig::single_day(
            "Night".to_string(),
            saturday(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            2,
        );
        assert!(config.validate().is_ok());
        config.match_duration_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_duration() {
        let mut config = TournamentConfig::weekend("Marathon".to_string(), saturday());
        config.match_duration_minutes = MAX_MATCH_MINUTES;
        assert!(config.validate().is_ok());

        config.match_duration_minutes = u32::MAX - 100;
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_category_key_display() {
        assert_eq!(CategoryKey::new(12, 3).to_string(), "12/3");
    }
}
