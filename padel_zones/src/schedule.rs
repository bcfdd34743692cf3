//! Court and time-slot allocation.
//!
//! The scheduler keeps, for every (day, court), the next free minute. It lives
//! for a single generation or rescheduling pass and is never persisted.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{EntrantId, TournamentConfig};
use crate::zone::models::{Entrant, Zone, ZoneId, ZoneMatch};

/// Day, court and start time assigned to a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Playable day (1-based)
    pub day: u8,
    /// Court number (1-based)
    pub court: u8,
    /// Minutes after midnight
    pub start_minute: u32,
}

impl Booking {
    pub fn end_minute(&self, duration: u32) -> u32 {
        self.start_minute.saturating_add(duration)
    }

    /// Start as a time of day, `None` if it runs past midnight
    pub fn start_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_num_seconds_from_midnight_opt(self.start_minute * 60, 0)
    }

    /// Whether two bookings share a court at the same time
    pub fn overlaps(&self, other: &Booking, duration: u32) -> bool {
        self.day == other.day
            && self.court == other.court
            && self.start_minute < other.end_minute(duration)
            && other.start_minute < self.end_minute(duration)
    }
}

/// Earliest-free-slot allocator over N courts
#[derive(Debug, Clone)]
pub struct CourtScheduler {
    duration: u32,
    courts: u8,
    day_starts: HashMap<u8, u32>,
    next_free: BTreeMap<(u8, u8), u32>,
}

impl CourtScheduler {
    /// Create a scheduler
    ///
    /// # Arguments
    ///
    /// * `duration` - Minutes every match occupies a court
    /// * `courts` - Number of courts (at least one is always used)
    /// * `day_starts` - (day, first start minute) pairs
    pub fn new(duration: u32, courts: u8, day_starts: impl IntoIterator<Item = (u8, u32)>) -> Self {
        Self {
            duration,
            courts: courts.max(1),
            day_starts: day_starts.into_iter().collect(),
            next_free: BTreeMap::new(),
        }
    }

    /// Create a scheduler for a tournament's venue
    pub fn for_config(config: &TournamentConfig) -> Self {
        Self::new(config.match_duration_minutes, config.courts, config.day_starts())
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    fn free_at(&self, day: u8, court: u8) -> u32 {
        self.next_free
            .get(&(day, court))
            .copied()
            .unwrap_or_else(|| self.day_starts.get(&day).copied().unwrap_or(0))
    }

    /// Book the earliest slot on any court of `day` starting no earlier than `minimum_start`
    ///
    /// Picks the court where `max(next_free, minimum_start)` is smallest, lowest
    /// court number on ties, and advances that court's clock by one match.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleOverflow` when the match would end past the last
    /// representable minute of the day's clock.
    pub fn book(&mut self, day: u8, minimum_start: u32) -> TournamentResult<Booking> {
        let (court, start) = (1..=self.courts)
            .map(|court| (court, self.free_at(day, court).max(minimum_start)))
            .min_by_key(|&(court, start)| (start, court))
            .unwrap_or((1, minimum_start));

        let end = start
            .checked_add(self.duration)
            .ok_or(TournamentError::ScheduleOverflow { day })?;
        self.next_free.insert((day, court), end);

        Ok(Booking {
            day,
            court,
            start_minute: start,
        })
    }

    /// Mark an existing booking as taken so later bookings never overlap it
    pub fn reserve(&mut self, booking: &Booking) -> TournamentResult<()> {
        let end = booking
            .start_minute
            .checked_add(self.duration)
            .ok_or(TournamentError::ScheduleOverflow { day: booking.day })?;
        let current = self.free_at(booking.day, booking.court);
        self.next_free
            .insert((booking.day, booking.court), current.max(end));
        Ok(())
    }
}

/// Book every unbooked match of `zones`, in ascending match order
///
/// Existing bookings of `matches` are reserved first. A match starts no earlier
/// than the end of its timing predecessors, the earliest time of its known
/// entrants, and the end of those entrants' previous booking in this pass.
///
/// # Errors
///
/// Fails with `ScheduleOverflow` if a booking cannot fit on the clock; the
/// caller discards the partially booked snapshot.
pub fn schedule_matches(
    scheduler: &mut CourtScheduler,
    zones: &[&Zone],
    matches: &mut [ZoneMatch],
    entrants: &[Entrant],
) -> TournamentResult<()> {
    let duration = scheduler.duration();
    let zone_info: HashMap<ZoneId, (u8, u32)> =
        zones.iter().map(|z| (z.id, (z.day, z.position))).collect();
    let earliest: HashMap<EntrantId, u32> = entrants
        .iter()
        .filter_map(|e| e.earliest_minute().map(|m| (e.id, m)))
        .collect();

    let mut busy_until: HashMap<(EntrantId, u8), u32> = HashMap::new();
    for m in matches.iter() {
        if let Some(booking) = m.booking {
            scheduler.reserve(&booking)?;
            for entrant in [m.slot1, m.slot2].into_iter().flatten() {
                let end = busy_until.entry((entrant, booking.day)).or_insert(0);
                *end = (*end).max(booking.end_minute(duration));
            }
        }
    }

    let mut pending: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| m.booking.is_none() && zone_info.contains_key(&m.zone_id))
        .map(|(i, _)| i)
        .collect();
    pending.sort_by_key(|&i| (matches[i].order, zone_info[&matches[i].zone_id].1));

    for i in pending {
        let zone_id = matches[i].zone_id;
        let (day, _) = zone_info[&zone_id];
        let kind = matches[i].kind;

        let mut minimum_start = 0;
        for predecessor in kind.timing_predecessors() {
            let end = matches
                .iter()
                .filter(|m| m.zone_id == zone_id && m.kind == *predecessor)
                .filter_map(|m| m.booking)
                .map(|b| b.end_minute(duration))
                .max();
            if let Some(end) = end {
                minimum_start = minimum_start.max(end);
            }
        }

        let known: Vec<EntrantId> = [matches[i].slot1, matches[i].slot2]
            .into_iter()
            .flatten()
            .collect();
        for entrant in &known {
            if let Some(&m) = earliest.get(entrant) {
                minimum_start = minimum_start.max(m);
            }
            if let Some(&end) = busy_until.get(&(*entrant, day)) {
                minimum_start = minimum_start.max(end);
            }
        }

        let booking = scheduler.book(day, minimum_start)?;
        debug!(
            "Booked {} match {} on day {} court {} at minute {}",
            kind.as_str(),
            matches[i].id,
            booking.day,
            booking.court,
            booking.start_minute
        );
        for entrant in known {
            busy_until.insert((entrant, day), booking.end_minute(duration));
        }
        matches[i].booking = Some(booking);
    }
    Ok(())
}
