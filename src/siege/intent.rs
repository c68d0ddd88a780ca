//! Cooldown-gated invasion intents
//!
//! A siege episode can grant several breaches in quick succession. Downstream
//! spawners should react once, so at most one `invasion.intent` is published
//! per room per cooldown window.

use super::machine::SiegeStateMachine;
use crate::core::clock::Clock;
use crate::core::types::{normalize_region_id, TimestampMs};
use crate::events::bus::EventBus;
use crate::events::types::{BreachEvent, EngineEvent, EventName, IntentEvent, IntentReason};
use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

pub struct IntentDirector {
    cooldown_ms: u64,
    siege: Arc<SiegeStateMachine>,
    last_intent_ts: Mutex<AHashMap<String, TimestampMs>>,
    publisher: OnceLock<Weak<EventBus>>,
}

impl IntentDirector {
    pub fn new(cooldown_ms: u64, siege: Arc<SiegeStateMachine>) -> Self {
        Self {
            cooldown_ms,
            siege,
            last_intent_ts: Mutex::new(AHashMap::new()),
            publisher: OnceLock::new(),
        }
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// Listen for `siege.breach` on `bus` and publish intents back to it
    pub fn attach(self: &Arc<Self>, bus: &Arc<EventBus>, clock: Arc<dyn Clock>) {
        if self.publisher.set(Arc::downgrade(bus)).is_err() {
            tracing::warn!("Intent director is already attached to a bus");
            return;
        }
        let director = Arc::clone(self);
        bus.on(EventName::SiegeBreach, move |event| {
            if let EngineEvent::Breach(breach) = event {
                director.on_breach(breach, clock.now_ms());
            }
        });
    }

    /// Turn a breach into an intent unless the room is cooling down
    pub fn on_breach(&self, breach: &BreachEvent, now: TimestampMs) -> Option<IntentEvent> {
        let room_id = normalize_region_id(&breach.room_id);
        {
            let mut last = self.lock();
            if let Some(&previous) = last.get(&room_id) {
                if now.saturating_sub(previous) < self.cooldown_ms {
                    tracing::debug!(
                        room = %room_id,
                        since_last_ms = now.saturating_sub(previous),
                        "Invasion intent suppressed by cooldown"
                    );
                    return None;
                }
            }
            last.insert(room_id.clone(), now);
        }

        let intent = IntentEvent {
            shard_id: breach.shard_id.clone(),
            tier: self.siege.get_tier(&room_id, now),
            room_id,
            reason: IntentReason::Breach,
            ts: now,
        };
        tracing::info!(
            shard = %intent.shard_id,
            room = %intent.room_id,
            tier = intent.tier.as_str(),
            "Invasion intent issued"
        );

        if let Some(bus) = self.publisher.get().and_then(Weak::upgrade) {
            bus.emit(&EngineEvent::InvasionIntent(intent.clone()));
        }
        Some(intent)
    }

    pub fn last_intent_ts(&self, room_id: &str) -> Option<TimestampMs> {
        self.lock().get(&normalize_region_id(room_id)).copied()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<String, TimestampMs>> {
        self.last_intent_ts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
