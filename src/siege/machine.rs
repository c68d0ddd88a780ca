//! Per-room siege escalation
//!
//! A room moves none → warning → siege → breach → recovery → none. The only
//! input is a pressure event; everything else is a function of the stored
//! deadlines and the caller's `now`. Expired rooms are dropped lazily on read.
//!
//! Rooms are keyed by their normalized id (`"prime_shard:8,8"` and `"8,8"` are
//! the same room), matching the policy cache. One machine serves one shard's
//! world instance; the shard id is carried on the state for reporting only.

use super::breach::BreachWindow;
use super::state::{SiegeDebugState, SiegeState, SiegeTier};
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::types::{normalize_region_id, TimestampMs};
use crate::events::bus::EventBus;
use crate::events::types::{BreachEvent, EngineEvent, EventName, PressureEvent};
use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

/// Durations and thresholds driving the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiegeTimings {
    pub warning_ms: u64,
    pub siege_ttl_ms: u64,
    pub recovery_ms: u64,
    pub breach_ttl_ms: u64,
    pub breach_hits: usize,
    pub breach_window_ms: u64,
    pub extend_only: bool,
}

impl SiegeTimings {
    /// Clamp values that cannot be honored
    pub fn sanitized(mut self) -> Self {
        self.breach_hits = self.breach_hits.max(1);
        self.breach_window_ms = self.breach_window_ms.max(1);
        self
    }
}

impl From<&EngineConfig> for SiegeTimings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            warning_ms: config.warning_ms,
            siege_ttl_ms: config.siege_ttl_ms,
            recovery_ms: config.recovery_ms,
            breach_ttl_ms: config.breach_ttl_ms,
            breach_hits: config.breach_hits,
            breach_window_ms: config.breach_window_ms,
            extend_only: config.extend_only,
        }
        .sanitized()
    }
}

impl Default for SiegeTimings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// What a single pressure event did to its room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressureOutcome {
    pub tier: SiegeTier,
    pub state: SiegeState,
    /// Set when this event granted a new breach
    pub breach: Option<BreachEvent>,
}

#[derive(Debug, Default)]
struct RoomTable {
    states: AHashMap<String, SiegeState>,
    windows: AHashMap<String, BreachWindow>,
}

pub struct SiegeStateMachine {
    timings: SiegeTimings,
    rooms: Mutex<RoomTable>,
    publisher: OnceLock<Weak<EventBus>>,
}

impl SiegeStateMachine {
    pub fn new(timings: SiegeTimings) -> Self {
        Self {
            timings: timings.sanitized(),
            rooms: Mutex::new(RoomTable::default()),
            publisher: OnceLock::new(),
        }
    }

    pub fn timings(&self) -> &SiegeTimings {
        &self.timings
    }

    /// Listen for `siege.pressure` on `bus` and publish breaches back to it
    pub fn attach(self: &Arc<Self>, bus: &Arc<EventBus>, clock: Arc<dyn Clock>) {
        if self.publisher.set(Arc::downgrade(bus)).is_err() {
            tracing::warn!("Siege state machine is already attached to a bus");
            return;
        }
        let machine = Arc::clone(self);
        bus.on(EventName::SiegePressure, move |event| {
            if let EngineEvent::PressureReported(pressure) = event {
                machine.report_pressure(pressure, clock.now_ms());
            }
        });
    }

    /// Apply a pressure event at `now`.
    ///
    /// The room's state is replaced wholesale: every event restarts the whole
    /// timeline, and may shorten it. With `extend_only` set, deadlines of a
    /// live state are kept when they run later than the new ones.
    pub fn report_pressure(&self, event: &PressureEvent, now: TimestampMs) -> PressureOutcome {
        let t = &self.timings;
        let room_id = normalize_region_id(&event.room_id);

        let (state, breach) = {
            let mut guard = self.lock();
            let table = &mut *guard;

            let window = table.windows.entry(room_id.clone()).or_default();
            let hits = window.record(now, t.breach_window_ms);
            let breach_until_ts = if t.breach_hits <= 1 || hits >= t.breach_hits {
                window.clear();
                Some(now.saturating_add(t.breach_ttl_ms))
            } else {
                None
            };

            let siege_until_ts = now.saturating_add(t.siege_ttl_ms);
            let mut state = SiegeState {
                shard_id: event.shard_id.clone(),
                last_pressure_count: event.pressure_count,
                last_window_ms: event.window_ms,
                last_event_ts: now,
                warning_until_ts: now.saturating_add(t.warning_ms),
                siege_until_ts,
                breach_until_ts,
                recovery_until_ts: siege_until_ts.saturating_add(t.recovery_ms),
                breach_count_in_window: hits,
            };

            if t.extend_only {
                if let Some(previous) = table.states.get(&room_id) {
                    if !previous.is_expired(now) {
                        extend_deadlines(&mut state, previous);
                    }
                }
            }

            table.states.insert(room_id.clone(), state.clone());

            let breach = breach_until_ts.map(|until| BreachEvent {
                shard_id: event.shard_id.clone(),
                room_id: room_id.clone(),
                breach_until_ts: until,
            });
            (state, breach)
        };

        let tier = state.tier_at(now);
        tracing::debug!(
            shard = %event.shard_id,
            room = %room_id,
            pressure = event.pressure_count,
            hits = state.breach_count_in_window,
            tier = tier.as_str(),
            "Pressure reported"
        );

        if let Some(breach) = &breach {
            tracing::info!(
                shard = %breach.shard_id,
                room = %breach.room_id,
                until = breach.breach_until_ts,
                "Breach granted"
            );
            self.publish(EngineEvent::Breach(breach.clone()));
        }

        PressureOutcome {
            tier,
            state,
            breach,
        }
    }

    /// Live state for a room; `None` (and deletion) once past recovery
    pub fn get_state(&self, room_id: &str, now: TimestampMs) -> Option<SiegeState> {
        let room_id = normalize_region_id(room_id);
        let mut guard = self.lock();
        self.live_state(&mut guard, &room_id, now).cloned()
    }

    pub fn get_tier(&self, room_id: &str, now: TimestampMs) -> SiegeTier {
        self.get_state(room_id, now)
            .map(|state| state.tier_at(now))
            .unwrap_or(SiegeTier::None)
    }

    /// True through both the warning and siege sub-tiers
    pub fn is_under_siege(&self, room_id: &str, now: TimestampMs) -> bool {
        self.get_state(room_id, now)
            .is_some_and(|state| now < state.siege_until_ts)
    }

    pub fn is_breach_active(&self, room_id: &str, now: TimestampMs) -> bool {
        self.get_tier(room_id, now) == SiegeTier::Breach
    }

    /// Operator view; a well-formed "none" shape when the room is quiet
    pub fn get_debug_state(&self, room_id: &str, now: TimestampMs) -> SiegeDebugState {
        let t = &self.timings;
        let room_id = normalize_region_id(room_id);
        let room_id = room_id.as_str();
        let mut guard = self.lock();
        let hits = guard
            .windows
            .get(room_id)
            .map(|w| w.count_at(now, t.breach_window_ms))
            .unwrap_or(0);

        match self.live_state(&mut guard, room_id, now) {
            Some(state) => SiegeDebugState::from_state(
                room_id,
                state,
                now,
                hits,
                t.breach_hits,
                t.breach_window_ms,
            ),
            None => SiegeDebugState::none(room_id, now, hits, t.breach_hits, t.breach_window_ms),
        }
    }

    /// Rooms with live state at `now`, sorted by id. Expired rooms are dropped.
    pub fn active_rooms(&self, now: TimestampMs) -> Vec<(String, SiegeTier)> {
        let mut guard = self.lock();
        guard.states.retain(|_, state| !state.is_expired(now));
        let mut rooms: Vec<(String, SiegeTier)> = guard
            .states
            .iter()
            .map(|(room, state)| (room.clone(), state.tier_at(now)))
            .collect();
        rooms.sort_by(|a, b| a.0.cmp(&b.0));
        rooms
    }

    /// Forget every room
    pub fn reset(&self) {
        let mut guard = self.lock();
        guard.states.clear();
        guard.windows.clear();
    }

    fn live_state<'a>(
        &self,
        table: &'a mut RoomTable,
        room_id: &str,
        now: TimestampMs,
    ) -> Option<&'a SiegeState> {
        if table.states.get(room_id)?.is_expired(now) {
            table.states.remove(room_id);
            if let Some(window) = table.windows.get_mut(room_id) {
                window.prune(now, self.timings.breach_window_ms);
                if window.is_empty() {
                    table.windows.remove(room_id);
                }
            }
            tracing::debug!(room = room_id, "Siege state expired");
            return None;
        }
        table.states.get(room_id)
    }

    fn publish(&self, event: EngineEvent) {
        if let Some(bus) = self.publisher.get().and_then(Weak::upgrade) {
            bus.emit(&event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, RoomTable> {
        self.rooms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn extend_deadlines(state: &mut SiegeState, previous: &SiegeState) {
    state.warning_until_ts = state.warning_until_ts.max(previous.warning_until_ts);
    state.siege_until_ts = state.siege_until_ts.max(previous.siege_until_ts);
    state.recovery_until_ts = state.recovery_until_ts.max(previous.recovery_until_ts);
    state.breach_until_ts = match (state.breach_until_ts, previous.breach_until_ts) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
}
