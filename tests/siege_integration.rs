//! Siege escalation integration tests
//!
//! Drive a full engine through the event bus on a manual clock and check the
//! timelines, breach accounting, intent rate limiting and journal bounds.

use proptest::prelude::*;
use region_siege::core::clock::ManualClock;
use region_siege::core::config::EngineConfig;
use region_siege::engine::RegionEngine;
use region_siege::events::journal::JournalQuery;
use region_siege::events::types::PressureEvent;
use region_siege::policy::provider::RuntimeMode;
use region_siege::siege::{SiegeStateMachine, SiegeTier, SiegeTimings};
use std::sync::Arc;

const SHARD: &str = "prime_shard";

fn engine_at(config: EngineConfig, start_ms: u64) -> (RegionEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    let engine = RegionEngine::new(config, RuntimeMode::Test, clock.clone());
    (engine, clock)
}

fn pressure(room: &str) -> PressureEvent {
    PressureEvent::new(SHARD, room, 3, 10_000)
}

/// Three hits inside the window grant exactly one breach and one intent
#[test]
fn test_third_hit_in_window_breaches() {
    let (engine, clock) = engine_at(
        EngineConfig {
            breach_hits: 3,
            breach_window_ms: 30_000,
            breach_ttl_ms: 5_000,
            ..EngineConfig::default()
        },
        1_000,
    );

    engine.report_pressure(pressure("8,8"));
    clock.set(2_000);
    engine.report_pressure(pressure("8,8"));
    assert!(!engine.is_breach_active("8,8"));
    assert_eq!(engine.debug_state("8,8").breach_hits_in_window, 2);

    clock.set(3_000);
    engine.report_pressure(pressure("8,8"));
    assert_eq!(engine.tier("8,8"), SiegeTier::Breach);

    let debug = engine.debug_state("8,8");
    assert_eq!(debug.breach_count_in_window, 3);
    assert_eq!(debug.breach_hits_in_window, 0);
    assert_eq!(debug.breach_remaining_ms, 5_000);

    let breaches = engine.recent_events(&JournalQuery::new().events(&["siege.breach"]));
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].payload["breachUntilTs"], 8_000);
    assert_eq!(
        engine
            .recent_events(&JournalQuery::new().events(&["invasion.intent"]))
            .len(),
        1
    );
}

/// Hits older than the window do not count toward a breach
#[test]
fn test_hits_outside_window_expire() {
    let (engine, clock) = engine_at(
        EngineConfig {
            breach_hits: 3,
            breach_window_ms: 1_000,
            ..EngineConfig::default()
        },
        0,
    );

    engine.report_pressure(pressure("8,8"));
    clock.set(600);
    engine.report_pressure(pressure("8,8"));
    clock.set(1_700);
    engine.report_pressure(pressure("8,8"));

    assert!(!engine.is_breach_active("8,8"));
    assert_eq!(engine.debug_state("8,8").breach_hits_in_window, 2);
}

/// warning 0 / siege 1000 / recovery 200 walks siege → recovery → none
#[test]
fn test_timeline_walks_down_to_none() {
    let (engine, clock) = engine_at(
        EngineConfig {
            warning_ms: 0,
            siege_ttl_ms: 1_000,
            recovery_ms: 200,
            ..EngineConfig::default()
        },
        0,
    );

    engine.report_pressure(pressure("8,8"));
    assert_eq!(engine.tier("8,8"), SiegeTier::Siege);
    assert!(engine.is_under_siege("8,8"));

    clock.set(1_005);
    assert_eq!(engine.tier("8,8"), SiegeTier::Recovery);
    assert!(!engine.is_under_siege("8,8"));
    assert_eq!(engine.debug_state("8,8").recovery_remaining_ms, 195);

    clock.set(1_210);
    assert_eq!(engine.tier("8,8"), SiegeTier::None);
    assert!(engine.siege().active_rooms(engine.now_ms()).is_empty());
}

/// Two breaches 1 ms apart produce a single journaled intent
#[test]
fn test_intent_cooldown_across_breaches() {
    let (engine, clock) = engine_at(
        EngineConfig {
            breach_hits: 1,
            intent_cooldown_ms: 60_000,
            ..EngineConfig::default()
        },
        10_000,
    );

    engine.report_pressure(pressure("8,8"));
    clock.advance(1);
    engine.report_pressure(pressure("8,8"));

    let intents = engine.recent_events(&JournalQuery::new().events(&["invasion.intent"]));
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].ts, 10_000);
    assert_eq!(intents[0].payload["tier"], "breach");

    clock.advance(60_000);
    engine.report_pressure(pressure("8,8"));
    assert_eq!(
        engine
            .recent_events(&JournalQuery::new().events(&["invasion.intent"]))
            .len(),
        2
    );
}

/// Rooms escalate independently
#[test]
fn test_rooms_are_isolated() {
    let (engine, _clock) = engine_at(
        EngineConfig {
            breach_hits: 1,
            ..EngineConfig::default()
        },
        0,
    );

    engine.report_pressure(pressure("8,8"));
    engine.report_pressure(pressure("9,9"));

    let intents = engine.recent_events(&JournalQuery::new().events(&["invasion.intent"]));
    assert_eq!(intents.len(), 2);
    assert_eq!(engine.tier("10,10"), SiegeTier::None);
}

/// A journal of capacity N keeps the newest N records after N + k events
#[test]
fn test_journal_stays_bounded() {
    let capacity = 20;
    let (engine, clock) = engine_at(
        EngineConfig {
            journal_capacity: capacity,
            ..EngineConfig::default()
        },
        0,
    );

    for i in 0..(capacity as u64 + 7) {
        clock.set(i);
        engine.report_pressure(pressure("8,8"));
    }

    assert_eq!(engine.journal().len(), capacity);
    let records = engine.recent_events(&JournalQuery::new().limit(1_000));
    assert_eq!(records.len(), capacity);
    assert_eq!(records[0].ts, capacity as u64 + 6);
    assert!(records.windows(2).all(|pair| pair[0].id > pair[1].id));
}

/// Debug state of an unknown room is well-formed
#[test]
fn test_debug_state_for_unknown_room() {
    let (engine, _clock) = engine_at(EngineConfig::default(), 42);
    let debug = engine.debug_state("nowhere");

    assert_eq!(debug.tier, SiegeTier::None);
    assert!(!debug.under_siege);
    assert_eq!(debug.now, 42);
    assert_eq!(debug.breach_hits_threshold, 3);

    let rendered = serde_json::to_value(&debug).unwrap();
    assert_eq!(rendered["roomId"], "nowhere");
    assert_eq!(rendered["tier"], "none");
}

proptest! {
    /// Right after a pressure event the room is never idle
    #[test]
    fn prop_pressure_always_escalates(
        times in proptest::collection::vec(0u64..1_000_000, 1..20),
        hits in 1usize..5,
    ) {
        let machine = SiegeStateMachine::new(SiegeTimings {
            breach_hits: hits,
            ..SiegeTimings::default()
        });
        let mut sorted = times.clone();
        sorted.sort_unstable();

        for now in sorted {
            let outcome = machine.report_pressure(&pressure("8,8"), now);
            prop_assert_ne!(outcome.tier, SiegeTier::None);
            prop_assert_ne!(outcome.tier, SiegeTier::Recovery);
            prop_assert_eq!(outcome.breach.is_some(), outcome.tier == SiegeTier::Breach);
            prop_assert!(outcome.state.breach_count_in_window <= hits);
        }
    }
}
