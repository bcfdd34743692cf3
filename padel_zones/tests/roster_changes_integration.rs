//! Integration tests for roster changes on generated zones
//!
//! Moves, swaps and withdrawals must leave every zone with a valid template,
//! keep decided matches untouched and never double-book a court.

use std::sync::Arc;

use chrono::NaiveDate;
use padel_zones::TournamentError;
use padel_zones::db::InMemoryTournamentRepository;
use padel_zones::scoring::{MatchScore, Side};
use padel_zones::tournament::{CategoryKey, TournamentConfig, TournamentManager, ZoneView};
use padel_zones::zone::{
    CloseOutcome, Entrant, MatchKind, Relocation, WithdrawPolicy, ZoneFormat,
};

const DURATION: u32 = 60;

fn config() -> TournamentConfig {
    TournamentConfig::weekend(
        "Fecha 6".to_string(),
        NaiveDate::from_ymd_opt(2026, 9, 5).unwrap(),
    )
}

async fn setup(entrants: i64) -> (TournamentManager, CategoryKey, Vec<ZoneView>) {
    let manager = TournamentManager::new(Arc::new(InMemoryTournamentRepository::new()));
    manager.configure_tournament(1, config()).await.unwrap();
    let key = CategoryKey::new(1, 2);
    let pairs = (1..=entrants)
        .map(|i| Entrant::new(i, format!("Pair {i}")))
        .collect();
    manager.register_entrants(key, pairs).await.unwrap();
    let zones = manager.generate_zones(key).await.unwrap();
    (manager, key, zones)
}

fn sized(zones: &[ZoneView], size: usize) -> &ZoneView {
    zones.iter().find(|z| z.zone.size() == size).unwrap()
}

fn assert_no_overlaps(zones: &[ZoneView]) {
    let bookings: Vec<_> = zones
        .iter()
        .flat_map(|z| z.matches.iter())
        .filter_map(|m| m.booking)
        .collect();
    for (i, a) in bookings.iter().enumerate() {
        for b in &bookings[i + 1..] {
            assert!(!a.overlaps(b, DURATION), "{a:?} overlaps {b:?}");
        }
    }
}

fn assert_valid_templates(zones: &[ZoneView]) {
    for view in zones {
        let expected = match view.zone.format {
            ZoneFormat::Three => 3,
            ZoneFormat::Four => 4,
            ZoneFormat::FinalOnly => 1,
            ZoneFormat::RoundRobin => view.zone.size() * (view.zone.size() - 1) / 2,
        };
        assert_eq!(view.matches.len(), expected, "zone {}", view.zone.name);
        assert!(view.matches.iter().all(|m| m.booking.is_some()));
    }
}

#[tokio::test]
async fn test_move_between_zones_retemplates_both() {
    let (manager, key, zones) = setup(7).await;
    let (four, three) = (sized(&zones, 4), sized(&zones, 3));
    let mover = four.zone.members[3];

    manager
        .move_entrant(mover, four.zone.id, three.zone.id, None)
        .await
        .unwrap();

    let zones = manager.list_zones(key).await.unwrap();
    let source = zones.iter().find(|z| z.zone.id == four.zone.id).unwrap();
    let destination = zones.iter().find(|z| z.zone.id == three.zone.id).unwrap();
    assert_eq!(source.zone.format, ZoneFormat::Three);
    assert_eq!(destination.zone.format, ZoneFormat::Four);
    assert!(destination.zone.contains(mover));
    assert_valid_templates(&zones);
    assert_no_overlaps(&zones);
}

#[tokio::test]
async fn test_move_keeps_decided_match() {
    let (manager, key, zones) = setup(7).await;
    let (four, three) = (sized(&zones, 4), sized(&zones, 3));
    let decided = four
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::Initial1)
        .unwrap();
    let score = MatchScore::from_pairs(&[(6, 3), (6, 4)]);
    manager
        .record_zone_match_result(decided.id, score.clone())
        .await
        .unwrap();

    // the winner cannot leave any more
    let (winner, _) = decided.pairing().unwrap();
    assert!(matches!(
        manager
            .move_entrant(winner, four.zone.id, three.zone.id, None)
            .await,
        Err(TournamentError::FinalizedMatches { .. })
    ));

    let initial2 = four
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::Initial2)
        .unwrap();
    let (mover, _) = initial2.pairing().unwrap();
    manager
        .move_entrant(mover, four.zone.id, three.zone.id, None)
        .await
        .unwrap();

    let source = manager.zone(four.zone.id).await.unwrap();
    assert_eq!(source.zone.format, ZoneFormat::Three);
    let kept = source.matches.iter().find(|m| m.id == decided.id).unwrap();
    assert_eq!(kept.kind, MatchKind::Initial);
    assert_eq!(kept.score, Some(score));
    assert_eq!(kept.booking, decided.booking);
    assert_eq!(kept.winner, Some(Side::One));

    // dependents were filled from the preserved result
    let winner_vs_third = source
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::WinnerVsThird)
        .unwrap();
    assert_eq!(winner_vs_third.slot1, Some(winner));
    assert_no_overlaps(&manager.list_zones(key).await.unwrap());
}

#[tokio::test]
async fn test_move_into_full_zone_rejected_but_swap_allowed() {
    let (manager, key, zones) = setup(8).await;
    let (a, b) = (&zones[0], &zones[1]);
    let (mover, partner) = (a.zone.members[0], b.zone.members[2]);

    assert!(matches!(
        manager.move_entrant(mover, a.zone.id, b.zone.id, None).await,
        Err(TournamentError::ZoneCapacity { capacity: 4, .. })
    ));
    assert_eq!(manager.list_zones(key).await.unwrap(), zones);

    manager
        .move_entrant(mover, a.zone.id, b.zone.id, Some(partner))
        .await
        .unwrap();
    let zones = manager.list_zones(key).await.unwrap();
    assert!(zones[1].zone.contains(mover));
    assert!(zones[0].zone.contains(partner));
    assert_eq!(zones[0].zone.size(), 4);
    assert!(
        zones[1]
            .matches
            .iter()
            .any(|m| m.involves(mover) && m.kind == MatchKind::Initial2)
    );
}

#[tokio::test]
async fn test_same_zone_move_needs_partner() {
    let (manager, _, zones) = setup(6).await;
    let zone = &zones[0].zone;

    assert!(matches!(
        manager
            .move_entrant(zone.members[0], zone.id, zone.id, None)
            .await,
        Err(TournamentError::InvalidRequest(_))
    ));

    manager
        .move_entrant(zone.members[0], zone.id, zone.id, Some(zone.members[2]))
        .await
        .unwrap();
    let view = manager.zone(zone.id).await.unwrap();
    let initial = view
        .matches
        .iter()
        .find(|m| m.kind == MatchKind::Initial)
        .unwrap();
    assert_eq!(initial.pairing(), Some((zone.members[2], zone.members[1])));
}

#[tokio::test]
async fn test_withdraw_from_three_needs_policy() {
    let (manager, key, zones) = setup(6).await;
    let zone = &zones[0].zone;
    let leaving = zone.members[0];

    assert!(matches!(
        manager.withdraw_entrant(leaving, zone.id, None).await,
        Err(TournamentError::WithdrawPolicyRequired(_))
    ));

    manager
        .withdraw_entrant(leaving, zone.id, Some(WithdrawPolicy::FinalOnly))
        .await
        .unwrap();
    let view = manager.zone(zone.id).await.unwrap();
    assert_eq!(view.zone.format, ZoneFormat::FinalOnly);
    assert_eq!(view.matches.len(), 1);
    assert_eq!(view.matches[0].kind, MatchKind::Final);
    assert!(manager.entrants(key).await.unwrap().iter().all(|e| e.id != leaving));
}

#[tokio::test]
async fn test_withdraw_from_four_becomes_three() {
    let (manager, key, zones) = setup(7).await;
    let four = sized(&zones, 4);

    manager
        .withdraw_entrant(four.zone.members[1], four.zone.id, None)
        .await
        .unwrap();
    let zones = manager.list_zones(key).await.unwrap();
    assert!(zones.iter().all(|z| z.zone.format == ZoneFormat::Three));
    assert_valid_templates(&zones);
    assert_no_overlaps(&zones);
}

#[tokio::test]
async fn test_withdraw_with_rebalance_takes_donor() {
    let (manager, key, zones) = setup(7).await;
    let three = sized(&zones, 3);

    manager
        .withdraw_entrant(three.zone.members[0], three.zone.id, Some(WithdrawPolicy::Rebalance))
        .await
        .unwrap();
    let zones = manager.list_zones(key).await.unwrap();
    assert_eq!(zones.len(), 2);
    assert!(zones.iter().all(|z| z.zone.size() == 3));
    assert_valid_templates(&zones);
    assert_no_overlaps(&zones);
}

#[tokio::test]
async fn test_rebalance_without_donor_rejected() {
    let (manager, _, zones) = setup(6).await;
    let zone = &zones[0].zone;
    assert!(matches!(
        manager
            .withdraw_entrant(zone.members[0], zone.id, Some(WithdrawPolicy::Rebalance))
            .await,
        Err(TournamentError::NoDonorZone(_))
    ));
}

#[tokio::test]
async fn test_withdraw_with_restructure() {
    let (manager, key, zones) = setup(9).await;
    let (a, b, c) = (&zones[0].zone, &zones[1].zone, &zones[2].zone);
    let (leaving, first, second) = (b.members[0], b.members[1], b.members[2]);

    let incomplete = WithdrawPolicy::Restructure {
        destinations: vec![Relocation {
            entrant_id: first,
            zone_id: a.id,
        }],
    };
    assert!(matches!(
        manager.withdraw_entrant(leaving, b.id, Some(incomplete)).await,
        Err(TournamentError::MissingDestination(id)) if id == second
    ));

    let policy = WithdrawPolicy::Restructure {
        destinations: vec![
            Relocation {
                entrant_id: first,
                zone_id: a.id,
            },
            Relocation {
                entrant_id: second,
                zone_id: c.id,
            },
        ],
    };
    manager
        .withdraw_entrant(leaving, b.id, Some(policy))
        .await
        .unwrap();

    let zones = manager.list_zones(key).await.unwrap();
    assert_eq!(zones.len(), 2);
    assert!(zones.iter().all(|z| z.zone.format == ZoneFormat::Four));
    assert!(zones[0].zone.contains(first));
    assert!(zones[1].zone.contains(second));
    assert_valid_templates(&zones);
    assert_no_overlaps(&zones);
}

/// Decide every playable match of a zone with slot one winning, then close it
async fn play_and_close(manager: &TournamentManager, zone_id: uuid::Uuid) {
    loop {
        let view = manager.zone(zone_id).await.unwrap();
        let Some(next) = view
            .matches
            .iter()
            .find(|m| !m.is_finalized() && m.has_both_slots())
        else {
            break;
        };
        manager
            .record_zone_match_result(next.id, MatchScore::from_pairs(&[(6, 3), (6, 4)]))
            .await
            .unwrap();
    }
    assert!(matches!(
        manager.close_zone(zone_id).await.unwrap(),
        CloseOutcome::Closed { .. }
    ));
}

#[tokio::test]
async fn test_bracket_after_restructure_names_existing_zones() {
    let (manager, key, zones) = setup(9).await;
    let (a, b, c) = (&zones[0].zone, &zones[1].zone, &zones[2].zone);
    let (leaving, first, second) = (a.members[0], a.members[1], a.members[2]);

    let policy = WithdrawPolicy::Restructure {
        destinations: vec![
            Relocation {
                entrant_id: first,
                zone_id: b.id,
            },
            Relocation {
                entrant_id: second,
                zone_id: c.id,
            },
        ],
    };
    manager
        .withdraw_entrant(leaving, a.id, Some(policy))
        .await
        .unwrap();

    let zones = manager.list_zones(key).await.unwrap();
    let names: Vec<String> = zones.iter().map(|z| z.zone.name.clone()).collect();
    assert_eq!(names, vec!["B", "C"]);
    for view in &zones {
        play_and_close(&manager, view.zone.id).await;
    }

    let bracket = manager.generate_bracket(key).await.unwrap();
    let refs: Vec<String> = bracket
        .iter()
        .flat_map(|m| [m.slot1_ref.clone(), m.slot2_ref.clone()])
        .flatten()
        .collect();
    assert_eq!(refs, vec!["1B", "2C", "1C", "2B"]);
    for slot in &refs {
        assert!(names.contains(&slot[1..].to_string()), "{slot} names no zone");
    }

    let zone_b = manager.zone(zones[0].zone.id).await.unwrap();
    assert_eq!(bracket[0].slot1, Some(zone_b.standings[0].entrant_id));
}
