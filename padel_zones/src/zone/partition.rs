//! Distribution of a category's entrants into zones.

use log::{debug, info};

use crate::bracket::layout::layout_for;
use crate::errors::{TournamentError, TournamentResult};
use crate::schedule::{CourtScheduler, schedule_matches};
use crate::tournament::models::{CategoryState, EntrantId, TournamentConfig};
use crate::zone::models::{DayPreference, Entrant, Zone, ZoneMatch, zone_letter};
use crate::zone::template::{build_matches, drafts_for};

/// Entrants and day of one zone, before ids and matches exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonePlan {
    /// Playable day (1-based)
    pub day: u8,
    /// Members in template order
    pub entrants: Vec<EntrantId>,
}

/// Number of trailing zones played on day 2
///
/// The smallest count whose capacity holds every day-2 preferrer, keeping at
/// least one zone on day 1.
pub fn day_two_zone_count(sizes: &[usize], day_two_preferrers: usize, playable_days: u8) -> usize {
    if playable_days < 2 || day_two_preferrers == 0 || sizes.len() < 2 {
        return 0;
    }
    let mut capacity = 0;
    let mut count = 0;
    for size in sizes.iter().rev() {
        if capacity >= day_two_preferrers || count == sizes.len() - 1 {
            break;
        }
        capacity += size;
        count += 1;
    }
    count
}

struct Slot {
    day: u8,
    capacity: usize,
    seeded: bool,
    members: Vec<EntrantId>,
}

impl Slot {
    fn has_room(&self) -> bool {
        self.members.len() < self.capacity
    }
}

fn preferred(entrant: &Entrant, playable_days: u8) -> Option<u8> {
    match entrant.preferred_day {
        DayPreference::Day(d @ (1 | 2)) if d <= playable_days => Some(d),
        _ => None,
    }
}

/// Least-filled zone of `day` with room, lowest index on ties
fn least_filled(slots: &[Slot], day: u8) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, s)| s.day == day && s.has_room())
        .min_by_key(|(i, s)| (s.members.len(), *i))
        .map(|(i, _)| i)
}

/// Distribute `entrants` into zones of `sizes`
///
/// Seeds go first, one per zone, on their preferred day when possible; extra
/// seeds are treated as unseeded. Day preferrers then fill zones of their day,
/// spilling over into the no-preference pool, which is dealt across the
/// remaining room in serpentine order. Each zone is finally ordered by earliest
/// time, unconstrained entrants first.
pub fn partition(entrants: &[Entrant], sizes: &[usize], playable_days: u8) -> Vec<ZonePlan> {
    let day_two_preferrers = entrants
        .iter()
        .filter(|e| preferred(e, playable_days) == Some(2))
        .count();
    let day_two = day_two_zone_count(sizes, day_two_preferrers, playable_days);
    let first_day_two = sizes.len() - day_two;

    let mut slots: Vec<Slot> = sizes
        .iter()
        .enumerate()
        .map(|(i, &capacity)| Slot {
            day: if i >= first_day_two { 2 } else { 1 },
            capacity,
            seeded: false,
            members: Vec::with_capacity(capacity),
        })
        .collect();

    let mut by_day: [Vec<&Entrant>; 2] = [Vec::new(), Vec::new()];
    let mut pool: Vec<&Entrant> = Vec::new();

    for entrant in entrants {
        let day = preferred(entrant, playable_days);
        if entrant.is_seed {
            let free = |wanted: Option<u8>| {
                slots
                    .iter()
                    .position(|s| !s.seeded && wanted.is_none_or(|d| s.day == d))
            };
            if let Some(i) = day.and_then(|d| free(Some(d))).or_else(|| free(None)) {
                slots[i].seeded = true;
                slots[i].members.push(entrant.id);
                continue;
            }
            debug!("Seed {} spills over, no unseeded zone left", entrant.id);
        }
        match day {
            Some(d) => by_day[usize::from(d - 1)].push(entrant),
            None => pool.push(entrant),
        }
    }

    for (index, preferrers) in by_day.into_iter().enumerate() {
        let day = (index + 1) as u8;
        for entrant in preferrers {
            match least_filled(&slots, day) {
                Some(i) => slots[i].members.push(entrant.id),
                None => pool.push(entrant),
            }
        }
    }

    // back and forth over the zones: 0, 1, .., n-1, n-1, .., 0, 0, 1, ..
    let n = slots.len();
    let serpentine = (0..n).chain((0..n).rev()).cycle();
    let mut remaining = pool.into_iter();
    let mut current = remaining.next();
    for i in serpentine.take(2 * n * entrants.len().max(1)) {
        let Some(entrant) = current else {
            break;
        };
        if slots[i].has_room() {
            slots[i].members.push(entrant.id);
            current = remaining.next();
        }
    }

    let earliest = |id: &EntrantId| {
        entrants
            .iter()
            .find(|e| e.id == *id)
            .and_then(|e| e.earliest_time)
    };
    slots
        .into_iter()
        .map(|mut slot| {
            // None sorts before Some
            slot.members.sort_by_key(|id| earliest(id));
            ZonePlan {
                day: slot.day,
                entrants: slot.members,
            }
        })
        .collect()
}

/// Create the zones, template matches and schedule of a category
///
/// Replaces any zones and matches generated before.
///
/// # Errors
///
/// Returns an error for unsupported entrant counts, invalid configuration, a
/// category whose bracket already exists, or zones that already have results.
pub fn build_zones(state: &mut CategoryState, config: &TournamentConfig) -> TournamentResult<()> {
    config.validate()?;
    if !state.bracket.is_empty() {
        return Err(TournamentError::BracketAlreadyGenerated(state.key));
    }
    if state.matches.iter().any(|m| m.is_finalized()) {
        return Err(TournamentError::ZonesAlreadyPlayed(state.key));
    }

    let layout = layout_for(state.entrants.len())?;
    if layout.zone_sizes.iter().any(|&s| s > config.max_zone_size) {
        return Err(TournamentError::InvalidConfig(format!(
            "{} entrants need zones of {} but the maximum zone size is {}",
            layout.entrants,
            layout.zone_sizes.iter().max().copied().unwrap_or_default(),
            config.max_zone_size
        )));
    }

    let plans = partition(&state.entrants, layout.zone_sizes, config.playable_days());

    let mut zones = Vec::with_capacity(plans.len());
    let mut matches: Vec<ZoneMatch> = Vec::new();
    for (position, plan) in plans.into_iter().enumerate() {
        let zone = Zone::new(zone_letter(position), plan.day, position as u32, plan.entrants);
        matches.extend(build_matches(zone.id, drafts_for(zone.format, &zone.members)?));
        zones.push(zone);
    }

    let mut scheduler = CourtScheduler::for_config(config);
    let zone_refs: Vec<&Zone> = zones.iter().collect();
    schedule_matches(&mut scheduler, &zone_refs, &mut matches, &state.entrants)?;

    info!(
        "Generated {} zones with {} matches for category {}",
        zones.len(),
        matches.len(),
        state.key
    );
    state.zones = zones;
    state.matches = matches;
    Ok(())
}
