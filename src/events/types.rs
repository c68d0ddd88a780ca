//! Engine events and their payloads

use crate::core::types::TimestampMs;
use crate::siege::state::SiegeTier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable event names used for subscription and journaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "siege.pressure")]
    SiegePressure,
    #[serde(rename = "siege.breach")]
    SiegeBreach,
    #[serde(rename = "invasion.intent")]
    InvasionIntent,
}

impl EventName {
    pub const ALL: [EventName; 3] = [
        EventName::SiegePressure,
        EventName::SiegeBreach,
        EventName::InvasionIntent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SiegePressure => "siege.pressure",
            Self::SiegeBreach => "siege.breach",
            Self::InvasionIntent => "invasion.intent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == raw)
    }
}

/// Repeated hostile activity against a sanctuary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureEvent {
    pub shard_id: String,
    pub room_id: String,
    pub pressure_count: i64,
    pub window_ms: u64,
}

impl PressureEvent {
    pub fn new(shard_id: &str, room_id: &str, pressure_count: i64, window_ms: u64) -> Self {
        Self {
            shard_id: shard_id.to_string(),
            room_id: room_id.to_string(),
            pressure_count,
            window_ms,
        }
    }
}

/// A breach window was granted for a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachEvent {
    pub shard_id: String,
    pub room_id: String,
    pub breach_until_ts: TimestampMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentReason {
    Breach,
}

/// Cooldown-gated signal that downstream systems should react to a breach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentEvent {
    pub shard_id: String,
    pub room_id: String,
    pub reason: IntentReason,
    pub tier: SiegeTier,
    pub ts: TimestampMs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PressureReported(PressureEvent),
    Breach(BreachEvent),
    InvasionIntent(IntentEvent),
}

impl EngineEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::PressureReported(_) => EventName::SiegePressure,
            Self::Breach(_) => EventName::SiegeBreach,
            Self::InvasionIntent(_) => EventName::InvasionIntent,
        }
    }

    pub fn room_id(&self) -> &str {
        match self {
            Self::PressureReported(e) => &e.room_id,
            Self::Breach(e) => &e.room_id,
            Self::InvasionIntent(e) => &e.room_id,
        }
    }

    /// JSON rendering of the payload, as stored in the journal
    pub fn payload(&self) -> Value {
        let rendered = match self {
            Self::PressureReported(e) => serde_json::to_value(e),
            Self::Breach(e) => serde_json::to_value(e),
            Self::InvasionIntent(e) => serde_json::to_value(e),
        };
        rendered.unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names_round_trip() {
        for name in EventName::ALL {
            assert_eq!(EventName::parse(name.as_str()), Some(name));
        }
        assert_eq!(EventName::parse("siege"), None);
    }

    #[test]
    fn test_breach_is_namespaced_on_the_wire() {
        assert_eq!(EventName::SiegeBreach.as_str(), "siege.breach");
        assert_eq!(EventName::SiegePressure.as_str(), "siege.pressure");
        assert_eq!(EventName::parse("breach"), None);
        assert_eq!(
            serde_json::to_value(EventName::SiegeBreach).unwrap(),
            json!("siege.breach")
        );
    }

    #[test]
    fn test_intent_payload_shape() {
        let event = EngineEvent::InvasionIntent(IntentEvent {
            shard_id: "prime_shard".into(),
            room_id: "8,8".into(),
            reason: IntentReason::Breach,
            tier: SiegeTier::Breach,
            ts: 42,
        });
        assert_eq!(event.name(), EventName::InvasionIntent);
        assert_eq!(
            event.payload(),
            json!({
                "shardId": "prime_shard",
                "roomId": "8,8",
                "reason": "breach",
                "tier": "breach",
                "ts": 42
            })
        );
    }
}
