/// Property-based tests for scheduling, score evaluation and standings
///
/// These tests check the engine's invariants over randomly generated
/// venues, scores and zone results.
use chrono::NaiveDate;
use padel_zones::bracket::layout_for;
use padel_zones::schedule::{Booking, CourtScheduler};
use padel_zones::scoring::{MatchFormat, MatchScore, evaluate};
use padel_zones::tournament::{CategoryKey, CategoryState, TournamentConfig};
use padel_zones::zone::Entrant;
use padel_zones::zone::partition::build_zones;
use padel_zones::zone::results::record_result;
use padel_zones::zone::standings::compute_standings;
use proptest::prelude::*;
use std::collections::HashSet;

// Strategy for a set score, including unfinished and impossible ones
fn set_strategy() -> impl Strategy<Value = (u8, u8)> {
    (0u8..=8, 0u8..=8)
}

fn score_strategy() -> impl Strategy<Value = MatchScore> {
    prop::collection::vec(set_strategy(), 1..=3).prop_map(|sets| MatchScore::from_pairs(&sets))
}

fn format_strategy() -> impl Strategy<Value = MatchFormat> {
    prop_oneof![
        Just(MatchFormat::BestOfThree),
        Just(MatchFormat::SuperTiebreak),
        (4u8..=9).prop_map(|target| MatchFormat::SingleSet { target }),
    ]
}

fn config() -> TournamentConfig {
    TournamentConfig::weekend(
        "Proptest".to_string(),
        NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
    )
}

/// Generate zones for `n` entrants and decide every match, `bits` picking the winners
fn played_category(n: usize, bits: &[bool]) -> CategoryState {
    let config = config();
    let entrants = (1..=n as i64)
        .map(|i| Entrant::new(i, format!("Pair {i}")))
        .collect();
    let mut state = CategoryState::new(CategoryKey::new(1, 1), entrants);
    build_zones(&mut state, &config).unwrap();

    let mut bit = bits.iter().cycle();
    loop {
        let next = state
            .matches
            .iter()
            .find(|m| !m.is_finalized() && m.has_both_slots())
            .map(|m| m.id);
        let Some(id) = next else { break };
        let score = if *bit.next().unwrap_or(&true) {
            MatchScore::from_pairs(&[(6, 4), (6, 3)])
        } else {
            MatchScore::from_pairs(&[(4, 6), (7, 5), (2, 6)])
        };
        record_result(&mut state, config.match_format, id, score).unwrap();
    }
    state
}

proptest! {
    #[test]
    fn test_scheduler_never_overlaps(
        courts in 1u8..=4,
        requests in prop::collection::vec((1u8..=2, 0u32..=1200), 1..60),
    ) {
        let duration = 60;
        let mut scheduler = CourtScheduler::new(duration, courts, [(1, 540), (2, 540)]);
        let bookings: Vec<Booking> = requests
            .iter()
            .map(|&(day, minimum)| {
                let booking = scheduler.book(day, minimum).unwrap();
                assert!(booking.start_minute >= minimum);
                assert!(booking.start_minute >= 540);
                assert!((1..=courts).contains(&booking.court));
                booking
            })
            .collect();

        for (i, a) in bookings.iter().enumerate() {
            for b in &bookings[i + 1..] {
                prop_assert!(!a.overlaps(b, duration), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_evaluation_is_deterministic(format in format_strategy(), score in score_strategy()) {
        prop_assert_eq!(evaluate(format, &score), evaluate(format, &score));
    }

    #[test]
    fn test_evaluation_is_symmetric(format in format_strategy(), score in score_strategy()) {
        let forward = evaluate(format, &score);
        let mirrored = evaluate(format, &score.swapped());
        match (forward, mirrored) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a.winner, b.winner.map(|w| w.other())),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "asymmetric outcome: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn test_generated_matches_follow_their_predecessors(n in 6usize..=35, courts in 1u8..=4) {
        let mut config = config();
        config.courts = courts;
        let entrants = (1..=n as i64)
            .map(|i| Entrant::new(i, format!("Pair {i}")))
            .collect();
        let mut state = CategoryState::new(CategoryKey::new(1, 1), entrants);
        build_zones(&mut state, &config).unwrap();
        let duration = config.match_duration_minutes;

        for m in &state.matches {
            let booking = m.booking.unwrap();
            for kind in m.kind.timing_predecessors() {
                for before in state.matches.iter().filter(|p| p.zone_id == m.zone_id && p.kind == *kind) {
                    let earlier = before.booking.unwrap();
                    prop_assert_eq!(earlier.day, booking.day);
                    prop_assert!(
                        booking.start_minute >= earlier.end_minute(duration),
                        "{:?} at {} starts before {:?} ends",
                        m.kind,
                        booking.start_minute,
                        kind
                    );
                }
            }
        }
    }

    #[test]
    fn test_partition_places_every_entrant_once(n in 6usize..=35) {
        let state = played_category(n, &[true]);
        let layout = layout_for(n).unwrap();

        let mut sizes: Vec<usize> = state.zones.iter().map(|z| z.size()).collect();
        let mut expected = layout.zone_sizes.to_vec();
        sizes.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(sizes, expected);

        let placed: HashSet<i64> = state.zones.iter().flat_map(|z| z.members.iter().copied()).collect();
        prop_assert_eq!(placed.len(), n);
    }

    #[test]
    fn test_standings_are_idempotent(
        n in 6usize..=20,
        bits in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        let state = played_category(n, &bits);
        let format = config().match_format;

        for zone in &state.zones {
            let matches = state.zone_matches(zone.id);
            prop_assert!(matches.iter().all(|m| m.is_finalized()));

            let first = compute_standings(zone, &matches, format);
            let second = compute_standings(zone, &matches, format);
            prop_assert_eq!(&first, &second);

            let wins: u32 = first.iter().map(|s| s.wins).sum();
            prop_assert_eq!(wins as usize, matches.len());

            let mut positions: Vec<u8> = first.iter().map(|s| s.position).collect();
            positions.sort_unstable();
            let expected: Vec<u8> = (1..=zone.size() as u8).collect();
            prop_assert_eq!(positions, expected);
        }
    }
}
