//! Integration tests for the conflict layer
//!
//! Every scenario runs through the `Frontier` facade with in-memory ports
//! and a manual clock:
//! - Condemnation maturing into war
//! - Capital capture through the hold timer, and recovery from it
//! - Surrender, emergency capital moves and allies
//! - Secession into civil war
//! - Raider waves

mod common;

use common::{at, key, world, world_with, World};
use iron_frontier::conflict::{
    CivilWarOutcome, CondemnOutcome, DamageOutcome, DeclareOutcome, EmergencyMoveOutcome, EndReason, JoinWarOutcome,
    Side, SurrenderOutcome,
};
use iron_frontier::core::config::FrontierConfig;
use iron_frontier::core::types::ActorId;
use iron_frontier::territory::PlacementOutcome;
use iron_frontier::upkeep::RepairOutcome;
use iron_frontier::GiftOutcome;

/// Rome (Forum + Farms) against Carthage (Byrsa + Harbor), not yet at war
fn two_states(w: &mut World) -> (ActorId, ActorId) {
    let rome = w.found("Rome", "Forum", 0);
    w.add_sector(rome, "Farms", 200);
    let carthage = w.found("Carthage", "Byrsa", 2000);
    w.add_sector(carthage, "Harbor", 2200);
    (rome, carthage)
}

fn declare(w: &mut World, rome: ActorId) -> u64 {
    assert!(matches!(w.frontier.condemn(rome, "Carthage"), CondemnOutcome::Success { .. }));
    w.advance_secs(w.frontier.config().war.condemnation_delay_secs);
    match w.frontier.declare_war(rome, "carthage") {
        DeclareOutcome::Declared { war_id } => war_id,
        other => panic!("war not declared: {:?}", other),
    }
}

// ============================================================================
// Declaration
// ============================================================================

#[test]
fn test_condemnation_must_mature_before_war() {
    let mut w = world();
    let (rome, _) = two_states(&mut w);

    assert_eq!(
        w.frontier.declare_war(rome, "carthage"),
        DeclareOutcome::NoCondemnation
    );
    assert!(matches!(w.frontier.condemn(rome, "carthage"), CondemnOutcome::Success { .. }));

    w.advance_secs(300);
    assert_eq!(
        w.frontier.declare_war(rome, "carthage"),
        DeclareOutcome::CondemnationPending { remaining_ms: 300_000 }
    );

    w.advance_secs(301);
    assert!(matches!(w.frontier.declare_war(rome, "carthage"), DeclareOutcome::Declared { .. }));
    assert!(w.frontier.conflict().is_at_war(&key("rome")));
    assert!(w.frontier.conflict().are_enemies(&key("rome"), &key("carthage")));
    assert!(w.notifier.count("war.declared") > 0);
    assert!(w.notifier.count("war.camp_revealed") > 0);
}

#[test]
fn test_state_fights_at_most_one_war() {
    let mut w = world();
    let (rome, _) = two_states(&mut w);
    let sparta = w.found("Sparta", "Agora", 5000);

    assert!(matches!(w.frontier.condemn(sparta, "carthage"), CondemnOutcome::Success { .. }));
    declare(&mut w, rome);

    assert_eq!(w.frontier.declare_war(sparta, "carthage"), DeclareOutcome::TargetAtWar);
    assert_eq!(w.frontier.conflict().war_count(), 1);
}

// ============================================================================
// Capital capture
// ============================================================================

#[test]
fn test_held_capital_loses_the_war() {
    let mut w = world();
    let (rome, _) = two_states(&mut w);
    let war_id = declare(&mut w, rome);

    assert_eq!(
        w.frontier.damage_camp("carthage", "harbor", 500.0, "rome"),
        DamageOutcome::Broken { capital: false }
    );
    assert_eq!(
        w.frontier.damage_camp("carthage", "byrsa", 500.0, "rome"),
        DamageOutcome::Broken { capital: true }
    );
    assert_eq!(w.frontier.damage_camp("carthage", "byrsa", 10.0, "rome"), DamageOutcome::Inert);

    let hold = w.frontier.config().war.capital_hold_secs;
    w.advance_secs(hold - 1);
    assert!(w.frontier.tick().conflict.resolved.is_empty());

    w.advance_secs(1);
    let report = w.frontier.tick();
    assert_eq!(report.conflict.resolved.len(), 1);
    let resolution = &report.conflict.resolved[0];
    assert_eq!(resolution.war_id, war_id);
    assert_eq!(resolution.winner, Some(key("rome")));
    assert_eq!(resolution.reason, EndReason::CapitalHeld);
    assert_eq!(resolution.transfers.len(), 1);

    let rome_state = w.frontier.store().state(&key("rome")).unwrap();
    assert!(rome_state.sectors.contains_key(&key("harbor")));
    assert_eq!(rome_state.bank, w.frontier.config().war.reward_flat);
    assert!(!w.frontier.conflict().is_at_war(&key("rome")));
}

#[test]
fn test_repaired_capital_cancels_hold() {
    let mut w = world();
    let (rome, carthage) = two_states(&mut w);
    declare(&mut w, rome);

    w.frontier.damage_camp("carthage", "byrsa", 500.0, "rome");
    assert!(w.frontier.conflict().hold_timers().get(&key("carthage")).is_some());

    assert!(matches!(
        w.frontier.repair_camp(carthage, "byrsa"),
        RepairOutcome::Success { recovered: false, .. }
    ));
    assert_eq!(
        w.frontier.repair_camp(carthage, "byrsa"),
        RepairOutcome::Success {
            hp: 50.0,
            recovered: true
        }
    );
    assert!(w.frontier.conflict().hold_timers().get(&key("carthage")).is_none());

    w.advance_secs(w.frontier.config().war.capital_hold_secs);
    assert!(w.frontier.tick().conflict.resolved.is_empty());
    assert!(w.frontier.conflict().is_at_war(&key("carthage")));
}

#[test]
fn test_emergency_move_escapes_the_hold_once() {
    let mut w = world();
    let (rome, carthage) = two_states(&mut w);
    declare(&mut w, rome);

    w.frontier.damage_camp("carthage", "byrsa", 500.0, "rome");
    assert_eq!(
        w.frontier.emergency_move(carthage, "harbor"),
        EmergencyMoveOutcome::Success {
            capital: "Harbor".into()
        }
    );
    assert_eq!(
        w.frontier.emergency_move(carthage, "byrsa"),
        EmergencyMoveOutcome::AlreadyUsed
    );

    w.advance_secs(w.frontier.config().war.capital_hold_secs);
    assert!(w.frontier.tick().conflict.resolved.is_empty());
    let capital = w.frontier.store().state(&key("carthage")).unwrap().capital.clone();
    assert_eq!(capital.as_deref(), Some("Harbor"));
}

// ============================================================================
// Surrender and allies
// ============================================================================

#[test]
fn test_accepted_surrender_ends_war_for_acceptor() {
    let mut w = world();
    let (rome, carthage) = two_states(&mut w);
    w.frontier.deposit_to_bank(carthage, 1000.0);
    declare(&mut w, rome);

    assert_eq!(w.frontier.offer_surrender(carthage), SurrenderOutcome::Offered);
    assert_eq!(w.frontier.offer_surrender(carthage), SurrenderOutcome::AlreadyOffered);
    assert_eq!(w.frontier.accept_surrender(carthage), SurrenderOutcome::NoOffer);

    match w.frontier.accept_surrender(rome) {
        SurrenderOutcome::Accepted(resolution) => {
            assert_eq!(resolution.winner, Some(key("rome")));
            assert_eq!(resolution.reason, EndReason::Surrender);
            assert_eq!(resolution.loot_total, 250.0);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(w.frontier.store().state(&key("carthage")).unwrap().bank, 750.0);
    assert_eq!(w.frontier.conflict().war_count(), 0);
}

#[test]
fn test_denied_surrender_keeps_fighting() {
    let mut w = world();
    let (rome, carthage) = two_states(&mut w);
    declare(&mut w, rome);

    w.frontier.offer_surrender(rome);
    assert_eq!(w.frontier.deny_surrender(carthage), SurrenderOutcome::Denied);
    assert_eq!(w.frontier.accept_surrender(carthage), SurrenderOutcome::NoOffer);
    assert_eq!(w.frontier.conflict().war_count(), 1);
}

#[test]
fn test_ally_joins_and_becomes_a_target() {
    let mut w = world();
    let (rome, _) = two_states(&mut w);
    let sparta = w.found("Sparta", "Agora", 5000);
    declare(&mut w, rome);

    match w.frontier.join_war(sparta, "rome") {
        JoinWarOutcome::Joined { side, .. } => assert_eq!(side, Side::Attacker),
        other => panic!("unexpected {:?}", other),
    }
    assert!(w.frontier.conflict().are_enemies(&key("sparta"), &key("carthage")));
    assert_eq!(
        w.frontier.damage_camp("sparta", "agora", 500.0, "carthage"),
        DamageOutcome::Broken { capital: true }
    );
    // ally capitals start no hold timer
    assert!(w.frontier.conflict().hold_timers().get(&key("sparta")).is_none());
}

// ============================================================================
// Civil war
// ============================================================================

#[test]
fn test_secession_becomes_civil_war_on_first_camp() {
    let mut w = world();
    let (rome, carthage) = two_states(&mut w);
    let rebel = w.recruit(rome);
    let banner = w.frontier.config().war.civil_war_item.clone();
    w.inventory.give(rebel, banner, 1);

    assert_eq!(w.frontier.secede(rome, "Gaul", "Alesia"), CivilWarOutcome::IsCaptain);
    assert_eq!(
        w.frontier.secede(rebel, "Gaul", "Alesia"),
        CivilWarOutcome::Success { rebel: key("gaul") }
    );
    assert_eq!(w.frontier.store().state_of(rebel), Some(&key("gaul")));

    // ownership changes are frozen while the secession is pending
    assert_eq!(
        w.frontier.offer_gift(rome, "farms", "carthage"),
        GiftOutcome::CivilWarPending
    );
    let _ = carthage;

    let placed = w.frontier.complete_placement(rebel, at(800));
    assert!(matches!(placed, PlacementOutcome::Committed(_)), "{:?}", placed);
    let war = w.frontier.conflict().war_between(&key("gaul"), &key("rome")).unwrap();
    assert_eq!(war.attacker, key("gaul"));
    assert!(w.frontier.conflict().civil_war_for(&key("rome")).is_none());
}

#[test]
fn test_seceder_killed_before_camp_crushes_rebellion() {
    let mut w = world();
    let (rome, _) = two_states(&mut w);
    let rebel = w.recruit(rome);
    let banner = w.frontier.config().war.civil_war_item.clone();
    w.inventory.give(rebel, banner, 1);
    w.frontier.secede(rebel, "Gaul", "Alesia");

    assert!(w.frontier.on_actor_killed(rebel, rome));
    assert!(w.frontier.store().state(&key("gaul")).is_none());
    assert!(w.frontier.store().pending_placement(rebel).is_none());
    assert!(w.notifier.count("civil_war.aborted") > 0);
}

// ============================================================================
// Raids
// ============================================================================

#[test]
fn test_raids_strike_defender_camps_on_interval() {
    let mut config = FrontierConfig::default();
    config.raids.enabled = true;
    let mut w = world_with(config);
    let (rome, _) = two_states(&mut w);
    let war_id = declare(&mut w, rome);

    w.advance_secs(w.frontier.config().raids.interval_secs);
    assert_eq!(w.frontier.tick().conflict.raids, 1);
    assert_eq!(w.frontier.tick().conflict.raids, 0);

    let raids = w.world.raids();
    assert_eq!(raids.len(), 1);
    let (location, count, id) = &raids[0];
    assert_eq!(*id, war_id);
    assert!(location.x >= 2000);
    assert!((2..=6).contains(count));
}
