//! End-to-end engine tests: configuration, policy-driven gates, and the
//! sanctuary denial loop feeding siege escalation.

use region_siege::core::clock::ManualClock;
use region_siege::core::config::EngineConfig;
use region_siege::engine::{GateDecision, RegionEngine};
use region_siege::events::journal::JournalQuery;
use region_siege::events::PressureEvent;
use region_siege::policy::{projections, HttpPolicyProvider, RuntimeMode, StaticPolicyProvider};
use region_siege::siege::SiegeTier;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SHARD: &str = "prime_shard";

const CONFIG: &str = r#"
[engine]
warning_ms = 1_000
siege_ttl_ms = 5_000
recovery_ms = 2_000
breach_hits = 2
breach_window_ms = 10_000
breach_ttl_ms = 3_000
intent_cooldown_ms = 60_000
journal_capacity = 100
"#;

fn keep_engine() -> (RegionEngine, Arc<ManualClock>) {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let seeds = StaticPolicyProvider::new().with_document(
        SHARD,
        "keep",
        json!({
            "combatEnabled": false,
            "rules": {
                "sanctuary": { "enabled": true },
                "economy": { "lockdownOnSiege": true },
                "travel": { "lockdownOnSiege": false },
                "ai": { "guardSortie": { "enabled": true, "rangeTiles": 3 } }
            }
        }),
    );
    let clock = Arc::new(ManualClock::new(0));
    let engine =
        RegionEngine::with_provider(config, RuntimeMode::Test, clock.clone(), Arc::new(seeds))
            .unwrap();
    (engine, clock)
}

#[tokio::test]
async fn test_sanctuary_siege_lifecycle() {
    let (engine, clock) = keep_engine();
    engine.warm(SHARD, &["keep"]).await;

    // First denial: warning, trade locked, travel untouched
    let denied = engine.deny_hostile_entry(SHARD, "keep", 2, 10_000);
    assert!(matches!(denied, GateDecision::Denied(_)));
    assert_eq!(engine.tier("keep"), SiegeTier::Warning);
    assert!(!engine.check_economy(SHARD, "keep").is_allowed());
    assert!(engine.check_travel(SHARD, "keep").is_allowed());

    // Second denial inside the window breaches
    clock.advance(1_500);
    engine.deny_hostile_entry(SHARD, "keep", 2, 10_000);
    assert_eq!(engine.tier("keep"), SiegeTier::Breach);
    assert_eq!(
        engine
            .recent_events(&JournalQuery::new().events(&["invasion.intent"]))
            .len(),
        1
    );

    // Breach lapses back into siege, then recovery
    clock.advance(3_000);
    assert_eq!(engine.tier("keep"), SiegeTier::Siege);
    clock.advance(2_000);
    assert_eq!(engine.tier("keep"), SiegeTier::Recovery);
    assert!(engine.check_economy(SHARD, "keep").is_allowed());

    clock.advance(2_001);
    assert_eq!(engine.tier("keep"), SiegeTier::None);
}

/// A shard-qualified room id and the bare id name the same room for both
/// the policy cache and the siege timeline
#[tokio::test]
async fn test_prefixed_denial_locks_bare_room() {
    let (engine, _clock) = keep_engine();
    engine.warm(SHARD, &["keep"]).await;

    let denied = engine.deny_hostile_entry(SHARD, "prime_shard:keep", 2, 10_000);
    assert!(!denied.is_allowed());

    assert!(engine.is_under_siege("keep"));
    assert!(engine.is_under_siege("prime_shard:keep"));
    match engine.check_economy(SHARD, "keep") {
        GateDecision::Denied(reason) => assert!(reason.contains("siege")),
        GateDecision::Allowed => panic!("trade must be locked down in a besieged sanctuary"),
    }
    assert!(!engine.check_economy(SHARD, "prime_shard:keep").is_allowed());

    // The second hit on the bare id counts toward the same breach window
    engine.deny_hostile_entry(SHARD, "keep", 2, 10_000);
    assert!(engine.is_breach_active("prime_shard:keep"));
    assert_eq!(engine.siege().active_rooms(engine.now_ms()).len(), 1);
}

#[tokio::test]
async fn test_policy_projections_through_engine() {
    let (engine, _clock) = keep_engine();
    let policy = engine.get_policy(SHARD, "room:keep").await;

    assert!(projections::is_sanctuary(&policy));
    assert!(!projections::is_combat_enabled(&policy));
    assert!(projections::is_guard_sortie_enabled(&policy));
    assert_eq!(projections::guard_sortie_range_tiles(&policy), 3);
}

#[test]
fn test_gates_default_open_before_warm() {
    let (engine, _clock) = keep_engine();
    engine.report_pressure(PressureEvent::new(SHARD, "keep", 1, 1_000));

    // Nothing cached yet, so the lockdown rule is not visible to the gate
    assert!(engine.is_under_siege("keep"));
    assert!(engine.check_economy(SHARD, "keep").is_allowed());
}

#[test]
fn test_config_from_toml_and_env() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.siege_ttl_ms, 5_000);
    assert_eq!(config.breach_hits, 2);
    assert!(config.validate().is_ok());

    let env = EngineConfig::from_env_with(|name| match name {
        "REGION_SIEGE_BREACH_HITS" => Some("0".to_string()),
        "REGION_SIEGE_EXTEND_ONLY" => Some("yes".to_string()),
        "REGION_SIEGE_WARNING_MS" => Some("soon".to_string()),
        _ => None,
    });
    assert_eq!(env.breach_hits, 1);
    assert!(env.extend_only);
    assert_eq!(env.warning_ms, EngineConfig::default().warning_ms);

    assert!(EngineConfig::from_toml_str("breach_hits = [").is_err());
}

#[tokio::test]
async fn test_unreachable_document_store_fails_closed() {
    let clock = Arc::new(ManualClock::new(0));
    let http = HttpPolicyProvider::new("http://127.0.0.1:9".to_string(), None)
        .with_timeout(Duration::from_millis(200));
    let engine = RegionEngine::with_provider(
        EngineConfig::default(),
        RuntimeMode::Production,
        clock,
        Arc::new(http),
    )
    .unwrap();

    let policy = engine.get_policy(SHARD, "keep").await;
    assert!(policy.is_empty());
    assert!(engine.deny_hostile_entry(SHARD, "keep", 1, 1_000).is_allowed());
}
