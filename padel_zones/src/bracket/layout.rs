//! Static lookup table: entrant count to zone sizes and bracket skeleton.
//!
//! Every zone sends its top two to the bracket. The skeleton lists the first
//! round pairings by position as zone-standing references ("1A" is the winner
//! of zone A); a missing opponent is a bye.

use std::fmt;

use crate::errors::{TournamentError, TournamentResult};
use crate::zone::models::zone_letter;

/// Fewest entrants a category can be zoned with
pub const MIN_ENTRANTS: usize = 6;

/// Most entrants the lookup table covers
pub const MAX_ENTRANTS: usize = 35;

/// Places of every zone that qualify for the bracket
pub const QUALIFYING_PLACES: u8 = 2;

/// First-round pairing: slot reference and opponent, `None` for a bye
pub type Pairing = (&'static str, Option<&'static str>);

static ZONE_SIZES: &[(usize, &[usize])] = &[
    (6, &[3, 3]),
    (7, &[4, 3]),
    (8, &[4, 4]),
    (9, &[3, 3, 3]),
    (10, &[4, 3, 3]),
    (11, &[4, 4, 3]),
    (12, &[3, 3, 3, 3]),
    (13, &[4, 3, 3, 3]),
    (14, &[4, 4, 3, 3]),
    (15, &[3, 3, 3, 3, 3]),
    (16, &[4, 3, 3, 3, 3]),
    (17, &[4, 4, 3, 3, 3]),
    (18, &[3, 3, 3, 3, 3, 3]),
    (19, &[4, 3, 3, 3, 3, 3]),
    (20, &[4, 4, 3, 3, 3, 3]),
    (21, &[3, 3, 3, 3, 3, 3, 3]),
    (22, &[4, 3, 3, 3, 3, 3, 3]),
    (23, &[4, 4, 3, 3, 3, 3, 3]),
    (24, &[3, 3, 3, 3, 3, 3, 3, 3]),
    (25, &[4, 3, 3, 3, 3, 3, 3, 3]),
    (26, &[4, 4, 3, 3, 3, 3, 3, 3]),
    (27, &[3, 3, 3, 3, 3, 3, 3, 3, 3]),
    (28, &[4, 3, 3, 3, 3, 3, 3, 3, 3]),
    (29, &[4, 4, 3, 3, 3, 3, 3, 3, 3]),
    (30, &[3, 3, 3, 3, 3, 3, 3, 3, 3, 3]),
    (31, &[4, 3, 3, 3, 3, 3, 3, 3, 3, 3]),
    (32, &[4, 4, 3, 3, 3, 3, 3, 3, 3, 3]),
    (33, &[3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3]),
    (34, &[4, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3]),
    (35, &[4, 4, 3, 3, 3, 3, 3, 3, 3, 3, 3]),
];

// First round by zone count, positions 1..=size/2
static SKELETONS: &[(usize, &[Pairing])] = &[
    (2, &[("1A", Some("2B")), ("1B", Some("2A"))]),
    (
        3,
        &[
            ("1A", None),
            ("2C", Some("2B")),
            ("1B", None),
            ("1C", Some("2A")),
        ],
    ),
    (
        4,
        &[
            ("1A", Some("2B")),
            ("1D", Some("2C")),
            ("1B", Some("2A")),
            ("1C", Some("2D")),
        ],
    ),
    (
        5,
        &[
            ("1A", None),
            ("2C", Some("2B")),
            ("1D", None),
            ("1E", None),
            ("1B", None),
            ("2D", Some("2A")),
            ("1C", None),
            ("2E", None),
        ],
    ),
    (
        6,
        &[
            ("1A", None),
            ("2B", Some("2C")),
            ("1D", None),
            ("1E", Some("2F")),
            ("1B", None),
            ("2A", Some("2D")),
            ("1C", None),
            ("1F", Some("2E")),
        ],
    ),
    (
        7,
        &[
            ("1A", None),
            ("2G", Some("2F")),
            ("1D", Some("2B")),
            ("1E", Some("2C")),
            ("1B", None),
            ("1G", Some("2E")),
            ("1C", Some("2A")),
            ("1F", Some("2D")),
        ],
    ),
    (
        8,
        &[
            ("1A", Some("2B")),
            ("1H", Some("2C")),
            ("1D", Some("2G")),
            ("1E", Some("2F")),
            ("1B", Some("2A")),
            ("1G", Some("2D")),
            ("1C", Some("2H")),
            ("1F", Some("2E")),
        ],
    ),
    (
        9,
        &[
            ("1A", None),
            ("2C", Some("2B")),
            ("1H", None),
            ("1I", None),
            ("1D", None),
            ("2F", None),
            ("1E", None),
            ("2G", None),
            ("1B", None),
            ("2D", Some("2A")),
            ("1G", None),
            ("2I", None),
            ("1C", None),
            ("2E", None),
            ("1F", None),
            ("2H", None),
        ],
    ),
    (
        10,
        &[
            ("1A", None),
            ("2F", Some("2G")),
            ("1H", None),
            ("1I", None),
            ("1D", None),
            ("2C", Some("2J")),
            ("1E", None),
            ("2B", None),
            ("1B", None),
            ("2E", Some("2H")),
            ("1G", None),
            ("1J", None),
            ("1C", None),
            ("2D", Some("2I")),
            ("1F", None),
            ("2A", None),
        ],
    ),
    (
        11,
        &[
            ("1A", None),
            ("2G", Some("2F")),
            ("1H", None),
            ("1I", None),
            ("1D", None),
            ("2J", Some("2C")),
            ("1E", None),
            ("2K", Some("2B")),
            ("1B", None),
            ("2H", Some("2E")),
            ("1G", None),
            ("1J", None),
            ("1C", None),
            ("2I", Some("2D")),
            ("1F", None),
            ("1K", Some("2A")),
        ],
    ),
];

/// A zone-standing reference such as "1A" (first place of zone A)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotRef {
    /// 1-based finishing place
    pub place: u8,
    /// Zone letter
    pub zone: String,
}

impl SlotRef {
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let place = chars.next()?.to_digit(10)? as u8;
        let zone: String = chars.collect();
        if place == 0 || zone.is_empty() || !zone.chars().all(|c| c.is_ascii_uppercase()) {
            return None;
        }
        Some(Self { place, zone })
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.place, self.zone)
    }
}

/// Zone layout and bracket skeleton for one entrant count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketLayout {
    pub entrants: usize,
    /// Size of every zone, in creation order
    pub zone_sizes: &'static [usize],
    /// First-round pairings; `None` opponent is a bye
    pub first_round: &'static [Pairing],
}

/// Look up the layout for `entrants`
///
/// # Errors
///
/// Returns `UnsupportedEntrantCount` outside 6..=35 entrants.
pub fn layout_for(entrants: usize) -> TournamentResult<BracketLayout> {
    let unsupported = || TournamentError::UnsupportedEntrantCount {
        count: entrants,
        min: MIN_ENTRANTS,
        max: MAX_ENTRANTS,
    };

    let zone_sizes = ZONE_SIZES
        .iter()
        .find(|(n, _)| *n == entrants)
        .map(|(_, sizes)| *sizes)
        .ok_or_else(unsupported)?;
    let first_round = first_round_for_zones(zone_sizes.len()).ok_or_else(unsupported)?;

    Ok(BracketLayout {
        entrants,
        zone_sizes,
        first_round,
    })
}

/// Skeleton first round for a category with `zones` zones
pub fn first_round_for_zones(zones: usize) -> Option<&'static [Pairing]> {
    SKELETONS
        .iter()
        .find(|(count, _)| *count == zones)
        .map(|(_, pairs)| *pairs)
}

impl BracketLayout {
    pub fn zone_count(&self) -> usize {
        self.zone_sizes.len()
    }

    /// Slots of the first round, byes included
    pub fn bracket_size(&self) -> usize {
        self.first_round.len() * 2
    }

    /// Entrants that reach the bracket
    pub fn qualifiers(&self) -> usize {
        self.zone_count() * QUALIFYING_PLACES as usize
    }

    pub fn byes(&self) -> usize {
        self.first_round.iter().filter(|(_, b)| b.is_none()).count()
    }

    /// Check the layout is self-consistent
    ///
    /// Zone sizes must add up to the entrant count, the bracket size must be a
    /// power of two, and every qualifying place of every zone must be referenced
    /// exactly once.
    pub fn validate(&self) -> TournamentResult<()> {
        let invalid = |reason: String| TournamentError::InvalidLayout {
            entrants: self.entrants,
            reason,
        };

        if self.zone_sizes.iter().sum::<usize>() != self.entrants {
            return Err(invalid("zone sizes do not add up".to_string()));
        }
        if self.zone_sizes.iter().any(|s| !(3..=4).contains(s)) {
            return Err(invalid("zone sizes must be 3 or 4".to_string()));
        }
        if !self.bracket_size().is_power_of_two() {
            return Err(invalid(format!(
                "bracket size {} is not a power of two",
                self.bracket_size()
            )));
        }
        if self.bracket_size() < self.qualifiers() {
            return Err(invalid("bracket too small for qualifiers".to_string()));
        }

        let mut expected: Vec<String> = (0..self.zone_count())
            .flat_map(|z| {
                (1..=QUALIFYING_PLACES).map(move |place| format!("{place}{}", zone_letter(z)))
            })
            .collect();
        expected.sort();

        let mut referenced = Vec::with_capacity(self.qualifiers());
        for (a, b) in self.first_round {
            for raw in std::iter::once(*a).chain(*b) {
                let slot = SlotRef::parse(raw)
                    .ok_or_else(|| invalid(format!("malformed slot reference {raw:?}")))?;
                referenced.push(slot.to_string());
            }
        }
        referenced.sort();

        if referenced != expected {
            return Err(invalid(
                "slot references do not match the zone layout".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate every entry of the lookup table
pub fn validate_all() -> TournamentResult<()> {
    for entrants in MIN_ENTRANTS..=MAX_ENTRANTS {
        layout_for(entrants)?.validate()?;
    }
    Ok(())
}
