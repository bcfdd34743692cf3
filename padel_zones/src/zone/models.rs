//! Zone, entrant and zone-match data models.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::Booking;
use crate::scoring::{MatchScore, Side};
use crate::tournament::models::EntrantId;

/// Zone ID type
pub type ZoneId = Uuid;

/// Match ID type (zone and bracket matches)
pub type MatchId = Uuid;

/// Day an entrant asked to play on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DayPreference {
    #[default]
    None,
    /// 1-based day number
    Day(u8),
}

impl DayPreference {
    /// Storage form, `None` for no preference
    pub fn as_day(self) -> Option<u8> {
        match self {
            DayPreference::None => None,
            DayPreference::Day(d) => Some(d),
        }
    }

    pub fn from_day(day: Option<u8>) -> Self {
        day.map_or(DayPreference::None, DayPreference::Day)
    }
}

/// A registered pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    /// Display name of the pair
    pub name: String,
    /// Top seed, isolated one per zone
    #[serde(default)]
    pub is_seed: bool,
    #[serde(default)]
    pub preferred_day: DayPreference,
    /// Cannot play before this time of day
    #[serde(default)]
    pub earliest_time: Option<NaiveTime>,
}

impl Entrant {
    pub fn new(id: EntrantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_seed: false,
            preferred_day: DayPreference::None,
            earliest_time: None,
        }
    }

    /// Mark as top seed
    pub fn seeded(mut self) -> Self {
        self.is_seed = true;
        self
    }

    /// Prefer playing on `day` (1-based)
    pub fn prefers_day(mut self, day: u8) -> Self {
        self.preferred_day = DayPreference::Day(day);
        self
    }

    /// Cannot play before `time`
    pub fn not_before(mut self, time: NaiveTime) -> Self {
        self.earliest_time = Some(time);
        self
    }

    /// Earliest start as minutes after midnight
    pub fn earliest_minute(&self) -> Option<u32> {
        self.earliest_time.map(|t| t.hour() * 60 + t.minute())
    }
}

/// Zone lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    Open,
    Closed,
}

/// Match template a zone is played with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneFormat {
    /// 3 entrants: initial, loser vs third, winner vs third
    Three,
    /// 4 entrants: two initial matches, then losers and winners
    Four,
    /// Everyone plays everyone once
    RoundRobin,
    /// 2 entrants: a single decisive match
    FinalOnly,
}

impl ZoneFormat {
    /// Template used for a freshly formed zone of `size` entrants
    pub fn for_size(size: usize) -> Self {
        match size {
            2 => ZoneFormat::FinalOnly,
            3 => ZoneFormat::Three,
            4 => ZoneFormat::Four,
            _ => ZoneFormat::RoundRobin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneFormat::Three => "three",
            ZoneFormat::Four => "four",
            ZoneFormat::RoundRobin => "round_robin",
            ZoneFormat::FinalOnly => "final_only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "three" => Some(ZoneFormat::Three),
            "four" => Some(ZoneFormat::Four),
            "round_robin" => Some(ZoneFormat::RoundRobin),
            "final_only" => Some(ZoneFormat::FinalOnly),
            _ => None,
        }
    }
}

/// A round-robin group of a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    /// Letter used by bracket slot references ("A", "B", ...)
    pub name: String,
    /// Playable day (1-based)
    pub day: u8,
    /// Creation order within the category
    pub position: u32,
    pub format: ZoneFormat,
    pub status: ZoneStatus,
    /// Members in template order
    pub members: Vec<EntrantId>,
    /// Order chosen to settle a triple tie
    pub tie_break: Option<Vec<EntrantId>>,
}

impl Zone {
    pub fn new(name: String, day: u8, position: u32, members: Vec<EntrantId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            day,
            position,
            format: ZoneFormat::for_size(members.len()),
            status: ZoneStatus::Open,
            members,
            tie_break: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ZoneStatus::Open
    }

    pub fn contains(&self, entrant_id: EntrantId) -> bool {
        self.members.contains(&entrant_id)
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Zone letter for the zone at `position` (0 -> "A")
pub fn zone_letter(position: usize) -> String {
    let mut n = position;
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Role of a match inside its zone template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    #[serde(rename = "initial")]
    Initial,
    #[serde(rename = "loser-vs-third")]
    LoserVsThird,
    #[serde(rename = "winner-vs-third")]
    WinnerVsThird,
    #[serde(rename = "initial-1")]
    Initial1,
    #[serde(rename = "initial-2")]
    Initial2,
    #[serde(rename = "losers")]
    Losers,
    #[serde(rename = "winners")]
    Winners,
    #[serde(rename = "round-robin")]
    RoundRobin,
    #[serde(rename = "final")]
    Final,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Initial => "initial",
            MatchKind::LoserVsThird => "loser-vs-third",
            MatchKind::WinnerVsThird => "winner-vs-third",
            MatchKind::Initial1 => "initial-1",
            MatchKind::Initial2 => "initial-2",
            MatchKind::Losers => "losers",
            MatchKind::Winners => "winners",
            MatchKind::RoundRobin => "round-robin",
            MatchKind::Final => "final",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            MatchKind::Initial,
            MatchKind::LoserVsThird,
            MatchKind::WinnerVsThird,
            MatchKind::Initial1,
            MatchKind::Initial2,
            MatchKind::Losers,
            MatchKind::Winners,
            MatchKind::RoundRobin,
            MatchKind::Final,
        ]
        .into_iter()
        .find(|k| k.as_str() == s)
    }
}

/// A match inside a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMatch {
    pub id: MatchId,
    pub zone_id: ZoneId,
    pub kind: MatchKind,
    /// Schedule precedence within the zone (1-based)
    pub order: u32,
    /// `None` while waiting on a previous match
    pub slot1: Option<EntrantId>,
    pub slot2: Option<EntrantId>,
    pub score: Option<MatchScore>,
    /// Set once the score decides the match
    pub winner: Option<Side>,
    pub booking: Option<Booking>,
}

impl ZoneMatch {
    pub fn new(
        zone_id: ZoneId,
        kind: MatchKind,
        order: u32,
        slot1: Option<EntrantId>,
        slot2: Option<EntrantId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            zone_id,
            kind,
            order,
            slot1,
            slot2,
            score: None,
            winner: None,
            booking: None,
        }
    }

    /// Has a decided result; immutable from here on
    pub fn is_finalized(&self) -> bool {
        self.winner.is_some()
    }

    pub fn involves(&self, entrant_id: EntrantId) -> bool {
        self.slot1 == Some(entrant_id) || self.slot2 == Some(entrant_id)
    }

    pub fn has_both_slots(&self) -> bool {
        self.slot1.is_some() && self.slot2.is_some()
    }

    pub fn entrant(&self, side: Side) -> Option<EntrantId> {
        match side {
            Side::One => self.slot1,
            Side::Two => self.slot2,
        }
    }

    pub fn winner_id(&self) -> Option<EntrantId> {
        self.winner.and_then(|side| self.entrant(side))
    }

    pub fn loser_id(&self) -> Option<EntrantId> {
        self.winner.and_then(|side| self.entrant(side.other()))
    }

    /// Both entrants, when known
    pub fn pairing(&self) -> Option<(EntrantId, EntrantId)> {
        Some((self.slot1?, self.slot2?))
    }

    /// Swap an entrant id for another in both slots
    pub fn replace_entrant(&mut self, from: EntrantId, to: EntrantId) {
        for slot in [&mut self.slot1, &mut self.slot2] {
            if *slot == Some(from) {
                *slot = Some(to);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_letters() {
        assert_eq!(zone_letter(0), "A");
        assert_eq!(zone_letter(10), "K");
        assert_eq!(zone_letter(25), "Z");
        assert_eq!(zone_letter(26), "AA");
    }

    #[test]
    fn test_format_for_size() {
        assert_eq!(ZoneFormat::for_size(2), ZoneFormat::FinalOnly);
        assert_eq!(ZoneFormat::for_size(3), ZoneFormat::Three);
        assert_eq!(ZoneFormat::for_size(4), ZoneFormat::Four);
        assert_eq!(ZoneFormat::for_size(5), ZoneFormat::RoundRobin);
    }

    #[test]
    fn test_match_kind_vocabulary() {
        for kind in ["initial", "loser-vs-third", "winner-vs-third", "initial-1", "final"] {
            let parsed = MatchKind::parse(kind).unwrap();
            assert_eq!(parsed.as_str(), kind);
        }
        assert_eq!(
            serde_json::to_string(&MatchKind::Initial2).unwrap(),
            "\"initial-2\""
        );
        assert!(MatchKind::parse("semi").is_none());
    }

    #[test]
    fn test_winner_and_loser_ids() {
        let mut m = ZoneMatch::new(Uuid::nil(), MatchKind::Initial, 1, Some(10), Some(20));
        assert_eq!(m.winner_id(), None);
        m.winner = Some(Side::Two);
        assert_eq!(m.winner_id(), Some(20));
        assert_eq!(m.loser_id(), Some(10));
    }

    #[test]
    fn test_replace_entrant() {
        let mut m = ZoneMatch::new(Uuid::nil(), MatchKind::LoserVsThird, 2, None, Some(3));
        m.replace_entrant(3, 7);
        assert_eq!(m.slot2, Some(7));
        assert_eq!(m.slot1, None);
    }
}
