//! Per-room siege state and tier derivation

use crate::core::types::TimestampMs;
use serde::{Deserialize, Serialize};

/// Escalation tier of a room at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiegeTier {
    #[default]
    None,
    Warning,
    Siege,
    Breach,
    Recovery,
}

impl SiegeTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Warning => "warning",
            Self::Siege => "siege",
            Self::Breach => "breach",
            Self::Recovery => "recovery",
        }
    }

    /// Warning and siege both count as "under siege"
    pub fn is_under_siege(self) -> bool {
        matches!(self, Self::Warning | Self::Siege)
    }
}

/// Timeline written by the latest pressure event for a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiegeState {
    pub shard_id: String,
    pub last_pressure_count: i64,
    pub last_window_ms: u64,
    pub last_event_ts: TimestampMs,
    pub warning_until_ts: TimestampMs,
    pub siege_until_ts: TimestampMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breach_until_ts: Option<TimestampMs>,
    pub recovery_until_ts: TimestampMs,
    pub breach_count_in_window: usize,
}

impl SiegeState {
    /// Tier priority: breach > warning/siege > recovery > none
    pub fn tier_at(&self, now: TimestampMs) -> SiegeTier {
        if self.breach_until_ts.is_some_and(|until| until > now) {
            SiegeTier::Breach
        } else if now < self.siege_until_ts {
            if now < self.warning_until_ts {
                SiegeTier::Warning
            } else {
                SiegeTier::Siege
            }
        } else if now < self.recovery_until_ts {
            SiegeTier::Recovery
        } else {
            SiegeTier::None
        }
    }

    pub fn is_expired(&self, now: TimestampMs) -> bool {
        now > self.recovery_until_ts
    }
}

/// Operator view of a room, rendered verbatim by the debug surface.
///
/// Always well-formed: a room with no state reports tier `none` and zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiegeDebugState {
    pub room_id: String,
    pub shard_id: Option<String>,
    pub now: TimestampMs,
    pub tier: SiegeTier,
    pub under_siege: bool,
    pub warning_remaining_ms: u64,
    pub siege_remaining_ms: u64,
    pub breach_remaining_ms: u64,
    pub recovery_remaining_ms: u64,
    pub breach_hits_in_window: usize,
    pub breach_count_in_window: usize,
    pub breach_hits_threshold: usize,
    pub breach_window_ms: u64,
    pub last_pressure_count: Option<i64>,
    pub last_window_ms: Option<u64>,
    pub last_event_ts: Option<TimestampMs>,
}

impl SiegeDebugState {
    pub fn none(
        room_id: &str,
        now: TimestampMs,
        breach_hits_in_window: usize,
        breach_hits_threshold: usize,
        breach_window_ms: u64,
    ) -> Self {
        Self {
            room_id: room_id.to_string(),
            shard_id: None,
            now,
            tier: SiegeTier::None,
            under_siege: false,
            warning_remaining_ms: 0,
            siege_remaining_ms: 0,
            breach_remaining_ms: 0,
            recovery_remaining_ms: 0,
            breach_hits_in_window,
            breach_count_in_window: 0,
            breach_hits_threshold,
            breach_window_ms,
            last_pressure_count: None,
            last_window_ms: None,
            last_event_ts: None,
        }
    }

    pub fn from_state(
        room_id: &str,
        state: &SiegeState,
        now: TimestampMs,
        breach_hits_in_window: usize,
        breach_hits_threshold: usize,
        breach_window_ms: u64,
    ) -> Self {
        let tier = state.tier_at(now);
        Self {
            room_id: room_id.to_string(),
            shard_id: Some(state.shard_id.clone()),
            now,
            tier,
            under_siege: now < state.siege_until_ts,
            warning_remaining_ms: state.warning_until_ts.saturating_sub(now),
            siege_remaining_ms: state.siege_until_ts.saturating_sub(now),
            breach_remaining_ms: state
                .breach_until_ts
                .map(|until| until.saturating_sub(now))
                .unwrap_or(0),
            recovery_remaining_ms: state.recovery_until_ts.saturating_sub(now),
            breach_hits_in_window,
            breach_count_in_window: state.breach_count_in_window,
            breach_hits_threshold,
            breach_window_ms,
            last_pressure_count: Some(state.last_pressure_count),
            last_window_ms: Some(state.last_window_ms),
            last_event_ts: Some(state.last_event_ts),
        }
    }
}
