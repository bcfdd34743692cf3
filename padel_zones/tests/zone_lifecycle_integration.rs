//! Integration tests for the category lifecycle
//!
//! Registration, zone generation, score entry, zone closing and the bracket,
//! driven through the manager against the in-memory repository.

use std::sync::Arc;

use chrono::NaiveDate;
use padel_zones::TournamentError;
use padel_zones::bracket::BracketRound;
use padel_zones::db::InMemoryTournamentRepository;
use padel_zones::schedule::Booking;
use padel_zones::scoring::{MatchScore, Side};
use padel_zones::tournament::{CategoryKey, TournamentConfig, TournamentManager, ZoneView};
use padel_zones::zone::{CloseOutcome, Entrant, MatchKind, TieBreakMethod, ZoneStatus};

fn config() -> TournamentConfig {
    TournamentConfig::weekend(
        "Fecha 5".to_string(),
        NaiveDate::from_ymd_opt(2026, 8, 22).unwrap(),
    )
}

fn straight_sets(winner: Side) -> MatchScore {
    match winner {
        Side::One => MatchScore::from_pairs(&[(6, 2), (6, 3)]),
        Side::Two => MatchScore::from_pairs(&[(2, 6), (3, 6)]),
    }
}

async fn setup(entrants: i64) -> (TournamentManager, CategoryKey) {
    let manager = TournamentManager::new(Arc::new(InMemoryTournamentRepository::new()));
    manager.configure_tournament(1, config()).await.unwrap();
    let key = CategoryKey::new(1, 1);
    let pairs = (1..=entrants)
        .map(|i| Entrant::new(i, format!("Pair {i}")))
        .collect();
    manager.register_entrants(key, pairs).await.unwrap();
    (manager, key)
}

/// Decide every playable match of a zone, slot one always winning
async fn play_zone(manager: &TournamentManager, zone_id: uuid::Uuid) -> ZoneView {
    loop {
        let view = manager.zone(zone_id).await.unwrap();
        let next = view
            .matches
            .iter()
            .find(|m| !m.is_finalized() && m.has_both_slots());
        match next {
            Some(m) => {
                manager
                    .record_zone_match_result(m.id, straight_sets(Side::One))
                    .await
                    .unwrap();
            }
            None => return view,
        }
    }
}

#[tokio::test]
async fn test_six_entrants_full_lifecycle() {
    let (manager, key) = setup(6).await;

    let zones = manager.generate_zones(key).await.unwrap();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].zone.name, "A");
    assert_eq!(zones[1].zone.name, "B");
    for view in &zones {
        assert_eq!(view.matches.len(), 3);
        assert!(view.matches.iter().all(|m| m.booking.is_some()));
    }

    for view in &zones {
        let played = play_zone(&manager, view.zone.id).await;
        assert!(played.matches.iter().all(|m| m.is_finalized()));

        let outcome = manager.close_zone(view.zone.id).await.unwrap();
        let CloseOutcome::Closed { standings } = outcome else {
            panic!("zone {} should close", view.zone.name);
        };
        // initial winner also beats the third entrant
        assert_eq!(standings[0].entrant_id, view.zone.members[0]);
        assert_eq!(standings[0].wins, 2);
    }

    let bracket = manager.generate_bracket(key).await.unwrap();
    let semis: Vec<_> = bracket
        .iter()
        .filter(|m| m.round == BracketRound::SemiFinal)
        .collect();
    assert_eq!(semis.len(), 2);
    assert!(semis.iter().all(|m| m.slot1.is_some() && m.slot2.is_some()));

    let mut champion = None;
    for _ in 0..bracket.len() {
        let current = manager.bracket(key).await.unwrap();
        let Some(next) = current
            .iter()
            .find(|m| !m.is_finalized() && m.slot1.is_some() && m.slot2.is_some())
        else {
            break;
        };
        let update = manager
            .record_bracket_result(next.id, straight_sets(Side::One))
            .await
            .unwrap();
        champion = update.champion.or(champion);
    }

    assert_eq!(champion, Some(zones[0].zone.members[0]));
}

#[tokio::test]
async fn test_nine_entrants_bracket_has_byes() {
    let (manager, key) = setup(9).await;
    let zones = manager.generate_zones(key).await.unwrap();
    assert_eq!(zones.len(), 3);

    for view in &zones {
        play_zone(&manager, view.zone.id).await;
        assert!(matches!(
            manager.close_zone(view.zone.id).await.unwrap(),
            CloseOutcome::Closed { .. }
        ));
    }

    let bracket = manager.generate_bracket(key).await.unwrap();
    let byes: Vec<_> = bracket.iter().filter(|m| m.bye).collect();
    assert_eq!(byes.len(), 2);
    for bye in byes {
        assert!(bye.is_finalized());
        assert!(matches!(
            manager
                .record_bracket_result(bye.id, straight_sets(Side::One))
                .await,
            Err(TournamentError::ByeMatch(_))
        ));
    }

    assert!(matches!(
        manager.generate_bracket(key).await,
        Err(TournamentError::BracketAlreadyGenerated(_))
    ));
}

#[tokio::test]
async fn test_dependent_match_waits_for_initial() {
    let (manager, key) = setup(6).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let view = &zones[0];

    let initial = view
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::Initial)
        .unwrap();
    let dependent = view
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::WinnerVsThird)
        .unwrap();
    assert!(dependent.slot1.is_none());
    assert!(matches!(
        manager
            .record_zone_match_result(dependent.id, straight_sets(Side::One))
            .await,
        Err(TournamentError::MatchAwaitingPrerequisites(_))
    ));

    // dependent starts no earlier than the initial match ends
    let duration = config().match_duration_minutes;
    let (a, b) = (initial.booking.unwrap(), dependent.booking.unwrap());
    assert!(b.day > a.day || b.start_minute >= a.start_minute + duration);

    let update = manager
        .record_zone_match_result(initial.id, straight_sets(Side::Two))
        .await
        .unwrap();
    assert_eq!(update.cascaded.len(), 2);

    let refreshed = manager.zone(view.zone.id).await.unwrap();
    let winner_match = refreshed
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::WinnerVsThird)
        .unwrap();
    assert_eq!(winner_match.slot1, initial.slot2);
}

fn booking_of(view: &ZoneView, kind: MatchKind) -> Booking {
    view.matches
        .iter()
        .find(|m| m.kind == kind)
        .and_then(|m| m.booking)
        .unwrap()
}

#[tokio::test]
async fn test_four_zone_later_matches_wait_for_both_initials() {
    let (manager, key) = setup(8).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let duration = config().match_duration_minutes;
    assert_eq!(zones.len(), 2);

    for view in &zones {
        let first = booking_of(view, MatchKind::Initial1);
        let second = booking_of(view, MatchKind::Initial2);
        let ready = first.end_minute(duration).max(second.end_minute(duration));

        for kind in [MatchKind::Losers, MatchKind::Winners] {
            let later = booking_of(view, kind);
            assert_eq!(later.day, first.day);
            assert!(
                later.start_minute >= ready,
                "zone {} {:?} starts at {} before {}",
                view.zone.name,
                kind,
                later.start_minute,
                ready
            );
        }
    }
}

#[tokio::test]
async fn test_three_zone_matches_run_in_sequence() {
    let (manager, key) = setup(6).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let duration = config().match_duration_minutes;

    for view in &zones {
        let initial = booking_of(view, MatchKind::Initial);
        let losers = booking_of(view, MatchKind::LoserVsThird);
        let winners = booking_of(view, MatchKind::WinnerVsThird);

        assert!(losers.start_minute >= initial.end_minute(duration));
        assert!(winners.start_minute >= losers.end_minute(duration));
    }
}

#[tokio::test]
async fn test_partial_score_then_decided_is_immutable() {
    let (manager, key) = setup(6).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let initial = zones[0]
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::Initial)
        .unwrap();

    let partial = manager
        .record_zone_match_result(initial.id, MatchScore::from_pairs(&[(6, 4)]))
        .await
        .unwrap();
    assert!(!partial.updated.is_finalized());
    assert!(partial.cascaded.is_empty());

    let decided = manager
        .record_zone_match_result(initial.id, MatchScore::from_pairs(&[(6, 4), (6, 4)]))
        .await
        .unwrap();
    assert_eq!(decided.updated.winner, Some(Side::One));

    assert!(matches!(
        manager
            .record_zone_match_result(initial.id, straight_sets(Side::Two))
            .await,
        Err(TournamentError::MatchAlreadyDecided(_))
    ));
}

#[tokio::test]
async fn test_third_set_after_two_nil_rejected() {
    let (manager, key) = setup(6).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let initial = zones[0].matches[0].id;

    let err = manager
        .record_zone_match_result(initial, MatchScore::from_pairs(&[(6, 1), (6, 1), (6, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::Score(_)));

    let view = manager.zone(zones[0].zone.id).await.unwrap();
    assert!(view.matches.iter().all(|m| m.score.is_none()));
}

#[tokio::test]
async fn test_triple_tie_blocks_close_until_resolved() {
    let (manager, key) = setup(6).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let zone_id = zones[0].zone.id;

    // a beats b, b beats c, c beats a
    for (kind, winner) in [
        (MatchKind::Initial, Side::One),
        (MatchKind::LoserVsThird, Side::One),
        (MatchKind::WinnerVsThird, Side::Two),
    ] {
        let view = manager.zone(zone_id).await.unwrap();
        let m = view.matches.iter().find(|m| m.kind == kind).unwrap();
        manager
            .record_zone_match_result(m.id, straight_sets(winner))
            .await
            .unwrap();
    }

    let members = zones[0].zone.members.clone();
    let outcome = manager.close_zone(zone_id).await.unwrap();
    assert!(matches!(outcome, CloseOutcome::TieDetected { .. }));
    assert_eq!(
        manager.zone(zone_id).await.unwrap().zone.status,
        ZoneStatus::Open
    );

    let method = TieBreakMethod::MiniMatch {
        points: vec![(members[0], 3), (members[1], 9), (members[2], 6)],
    };
    let standings = manager.resolve_tie(zone_id, method).await.unwrap();
    let order: Vec<_> = standings.iter().map(|s| s.entrant_id).collect();
    assert_eq!(order, vec![members[1], members[2], members[0]]);

    let CloseOutcome::Closed { standings } = manager.close_zone(zone_id).await.unwrap() else {
        panic!("resolved zone should close");
    };
    assert_eq!(standings[0].entrant_id, members[1]);
    assert!(matches!(
        manager.close_zone(zone_id).await,
        Err(TournamentError::ZoneClosed(_))
    ));
}

#[tokio::test]
async fn test_resolve_tie_without_tie_rejected() {
    let (manager, key) = setup(6).await;
    let zones = manager.generate_zones(key).await.unwrap();
    let zone_id = zones[0].zone.id;
    play_zone(&manager, zone_id).await;

    assert!(matches!(
        manager.resolve_tie(zone_id, TieBreakMethod::Draw).await,
        Err(TournamentError::NoTieToResolve(_))
    ));
}

#[tokio::test]
async fn test_regenerating_played_zones_rejected() {
    let (manager, key) = setup(7).await;
    let zones = manager.generate_zones(key).await.unwrap();
    play_zone(&manager, zones[0].zone.id).await;

    assert!(matches!(
        manager.generate_zones(key).await,
        Err(TournamentError::ZonesAlreadyPlayed(_))
    ));
}
