//! Composition root for one isolated world instance
//!
//! Owns the bus, the policy store, the siege state machine, the intent
//! director and the journal, and wires them together. Consumers (movement,
//! economy commands, the operator console) talk to this type only.

use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::TimestampMs;
use crate::events::bus::EventBus;
use crate::events::journal::{EventJournal, JournalQuery, JournalRecord};
use crate::events::types::{EngineEvent, PressureEvent};
use crate::policy::projections;
use crate::policy::provider::{PolicyProvider, RuntimeMode};
use crate::policy::store::{PolicyFetchOptions, PolicyStore};
use crate::policy::types::RegionPolicy;
use crate::siege::intent::IntentDirector;
use crate::siege::machine::{SiegeStateMachine, SiegeTimings};
use crate::siege::state::{SiegeDebugState, SiegeTier};
use std::sync::Arc;

/// Answer to "may this action proceed here?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// Player-facing reason
    Denied(String),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

pub struct RegionEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    bus: Arc<EventBus>,
    policies: Arc<PolicyStore>,
    siege: Arc<SiegeStateMachine>,
    director: Arc<IntentDirector>,
    journal: Arc<EventJournal>,
}

impl RegionEngine {
    /// Build and wire every component. No provider is installed yet, so every
    /// region reads as the empty policy until `set_provider` is called.
    pub fn new(config: EngineConfig, runtime: RuntimeMode, clock: Arc<dyn Clock>) -> Self {
        let config = config.sanitized();
        if let Err(problem) = config.validate() {
            tracing::warn!(%problem, "Engine configuration is inconsistent");
        }

        let bus = Arc::new(EventBus::new());
        let policies = Arc::new(PolicyStore::new(
            runtime,
            config.policy_cache_ttl_ms,
            clock.clone(),
        ));
        let siege = Arc::new(SiegeStateMachine::new(SiegeTimings::from(&config)));
        let director = Arc::new(IntentDirector::new(
            config.intent_cooldown_ms,
            siege.clone(),
        ));
        let journal = Arc::new(EventJournal::new(config.journal_capacity));

        // Journal first so it records each event before downstream reactions.
        journal.attach(&bus, clock.clone());
        siege.attach(&bus, clock.clone());
        director.attach(&bus, clock.clone());

        Self {
            config,
            clock,
            bus,
            policies,
            siege,
            director,
            journal,
        }
    }

    /// `new` plus a provider, failing only on the test-provider guard
    pub fn with_provider(
        config: EngineConfig,
        runtime: RuntimeMode,
        clock: Arc<dyn Clock>,
        provider: Arc<dyn PolicyProvider>,
    ) -> Result<Self> {
        let engine = Self::new(config, runtime, clock);
        engine.policies.set_provider(Some(provider))?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now_ms(&self) -> TimestampMs {
        self.clock.now_ms()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    pub fn siege(&self) -> &Arc<SiegeStateMachine> {
        &self.siege
    }

    pub fn director(&self) -> &Arc<IntentDirector> {
        &self.director
    }

    pub fn journal(&self) -> &Arc<EventJournal> {
        &self.journal
    }

    pub fn set_provider(&self, provider: Option<Arc<dyn PolicyProvider>>) -> Result<()> {
        self.policies.set_provider(provider)
    }

    pub async fn get_policy(&self, shard_id: &str, region_id: &str) -> RegionPolicy {
        self.policies
            .get_policy(shard_id, region_id, PolicyFetchOptions::default())
            .await
    }

    /// Pre-load regions so `peek`-based gates see them
    pub async fn warm(&self, shard_id: &str, region_ids: &[&str]) {
        self.policies.warm(shard_id, region_ids).await;
    }

    /// Publish a pressure event through the bus
    pub fn report_pressure(&self, event: PressureEvent) {
        self.bus.emit(&EngineEvent::PressureReported(event));
    }

    /// A sanctuary turned hostile pursuit away; feed that into escalation
    pub fn report_sanctuary_denial(
        &self,
        shard_id: &str,
        room_id: &str,
        pressure_count: i64,
        window_ms: u64,
    ) {
        self.report_pressure(PressureEvent::new(
            shard_id,
            room_id,
            pressure_count,
            window_ms,
        ));
    }

    /// Called when hostile NPC pursuit is refused entry to a room.
    ///
    /// Sanctuaries deny the entry and record pressure; other rooms allow it.
    pub fn deny_hostile_entry(
        &self,
        shard_id: &str,
        room_id: &str,
        pressure_count: i64,
        window_ms: u64,
    ) -> GateDecision {
        let policy = self.policies.peek(shard_id, room_id);
        if !projections::is_sanctuary(&policy) {
            return GateDecision::Allowed;
        }
        self.report_sanctuary_denial(shard_id, room_id, pressure_count, window_ms);
        GateDecision::Denied(format!(
            "{} is a sanctuary; hostile pursuit is turned back and the wardens raise the siege alarm.",
            room_id
        ))
    }

    /// Bank, vendor, auction and mail commands check this before a transaction
    pub fn check_economy(&self, shard_id: &str, room_id: &str) -> GateDecision {
        let policy = self.policies.peek(shard_id, room_id);
        if projections::economy_lockdown_on_siege(&policy) && self.is_under_siege(room_id) {
            return GateDecision::Denied(format!(
                "Trade in {} is suspended while the siege lasts.",
                room_id
            ));
        }
        GateDecision::Allowed
    }

    /// Movement checks this before letting a player into a room
    pub fn check_travel(&self, shard_id: &str, room_id: &str) -> GateDecision {
        let policy = self.policies.peek(shard_id, room_id);
        if projections::travel_lockdown_on_siege(&policy) && self.is_under_siege(room_id) {
            return GateDecision::Denied(format!(
                "The gates of {} are sealed under siege.",
                room_id
            ));
        }
        GateDecision::Allowed
    }

    pub fn tier(&self, room_id: &str) -> SiegeTier {
        self.siege.get_tier(room_id, self.clock.now_ms())
    }

    pub fn is_under_siege(&self, room_id: &str) -> bool {
        self.siege.is_under_siege(room_id, self.clock.now_ms())
    }

    pub fn is_breach_active(&self, room_id: &str) -> bool {
        self.siege.is_breach_active(room_id, self.clock.now_ms())
    }

    pub fn debug_state(&self, room_id: &str) -> SiegeDebugState {
        self.siege.get_debug_state(room_id, self.clock.now_ms())
    }

    pub fn recent_events(&self, query: &JournalQuery) -> Vec<JournalRecord> {
        self.journal.peek_recent(query)
    }

    /// Clear siege state, cooldowns, journal and policy cache
    pub fn reset(&self) {
        self.siege.reset();
        self.director.reset();
        self.journal.clear();
        self.policies.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::events::types::EventName;
    use crate::policy::provider::StaticPolicyProvider;
    use serde_json::json;

    fn engine(config: EngineConfig) -> (RegionEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let provider = StaticPolicyProvider::new()
            .with_document(
                "prime_shard",
                "8,8",
                json!({
                    "rules": {
                        "sanctuary": true,
                        "economy": { "lockdownOnSiege": true },
                        "travel": { "lockdownOnSiege": true }
                    }
                }),
            )
            .with_document("prime_shard", "9,9", json!({ "pvpEnabled": true }));
        let engine = RegionEngine::with_provider(
            config,
            RuntimeMode::Test,
            clock.clone(),
            Arc::new(provider),
        )
        .unwrap();
        (engine, clock)
    }

    #[tokio::test]
    async fn test_sanctuary_denial_raises_siege() {
        let (engine, _clock) = engine(EngineConfig::default());
        engine.warm("prime_shard", &["8,8", "9,9"]).await;

        assert!(engine.check_economy("prime_shard", "8,8").is_allowed());

        let decision = engine.deny_hostile_entry("prime_shard", "8,8", 4, 10_000);
        assert!(!decision.is_allowed());
        assert_eq!(engine.tier("8,8"), SiegeTier::Warning);

        match engine.check_economy("prime_shard", "8,8") {
            GateDecision::Denied(reason) => assert!(reason.contains("siege")),
            GateDecision::Allowed => panic!("economy should be locked down"),
        }
        match engine.check_travel("prime_shard", "8,8") {
            GateDecision::Denied(reason) => assert!(reason.contains("siege")),
            GateDecision::Allowed => panic!("travel should be locked down"),
        }
    }

    #[tokio::test]
    async fn test_non_sanctuary_allows_entry() {
        let (engine, _clock) = engine(EngineConfig::default());
        engine.warm("prime_shard", &["9,9"]).await;
        assert!(engine.deny_hostile_entry("prime_shard", "9,9", 4, 10_000).is_allowed());
        assert_eq!(engine.tier("9,9"), SiegeTier::None);
        assert!(engine.journal().is_empty());
    }

    #[tokio::test]
    async fn test_siege_without_lockdown_rules_allows_trade() {
        let (engine, _clock) = engine(EngineConfig::default());
        engine.warm("prime_shard", &["9,9"]).await;
        engine.report_sanctuary_denial("prime_shard", "9,9", 1, 1_000);
        assert!(engine.is_under_siege("9,9"));
        assert!(engine.check_economy("prime_shard", "9,9").is_allowed());
    }

    #[test]
    fn test_breach_produces_single_intent() {
        let (engine, clock) = engine(EngineConfig {
            breach_hits: 1,
            intent_cooldown_ms: 60_000,
            ..EngineConfig::default()
        });

        engine.report_pressure(PressureEvent::new("prime_shard", "8,8", 3, 1_000));
        clock.advance(1);
        engine.report_pressure(PressureEvent::new("prime_shard", "8,8", 3, 1_000));

        assert!(engine.is_breach_active("8,8"));
        let intents = engine.recent_events(&JournalQuery::new().events(&["invasion.intent"]));
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].payload["reason"], "breach");

        let breaches = engine.recent_events(&JournalQuery::new().prefix("siege.breach"));
        assert_eq!(breaches.len(), 2);
    }

    #[test]
    fn test_journal_order_follows_causality() {
        let (engine, _clock) = engine(EngineConfig {
            breach_hits: 1,
            ..EngineConfig::default()
        });
        engine.report_pressure(PressureEvent::new("prime_shard", "8,8", 3, 1_000));

        let names: Vec<String> = engine
            .recent_events(&JournalQuery::new())
            .into_iter()
            .rev()
            .map(|r| r.event)
            .collect();
        assert_eq!(
            names,
            vec![
                EventName::SiegePressure.as_str(),
                EventName::SiegeBreach.as_str(),
                EventName::InvasionIntent.as_str()
            ]
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let (engine, _clock) = engine(EngineConfig {
            breach_hits: 1,
            ..EngineConfig::default()
        });
        engine.report_pressure(PressureEvent::new("prime_shard", "8,8", 3, 1_000));
        engine.reset();

        assert_eq!(engine.tier("8,8"), SiegeTier::None);
        assert!(engine.journal().is_empty());
        assert_eq!(engine.director().last_intent_ts("8,8"), None);
    }

    #[test]
    fn test_production_engine_refuses_static_provider() {
        let result = RegionEngine::with_provider(
            EngineConfig::default(),
            RuntimeMode::Production,
            Arc::new(ManualClock::new(0)),
            Arc::new(StaticPolicyProvider::new()),
        );
        assert!(result.is_err());
    }
}
