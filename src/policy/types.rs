//! Normalized region policy and its enumerations

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// PvP ruleset for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PvpMode {
    Open,
    DuelOnly,
    Warfront,
}

impl PvpMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(Self::Open),
            "duelOnly" => Some(Self::DuelOnly),
            "warfront" => Some(Self::Warfront),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::DuelOnly => "duelOnly",
            Self::Warfront => "warfront",
        }
    }
}

/// Kind of world event running in a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionEventKind {
    Invasion,
    Warfront,
    Seasonal,
    Story,
}

impl RegionEventKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "invasion" => Some(Self::Invasion),
            "warfront" => Some(Self::Warfront),
            "seasonal" => Some(Self::Seasonal),
            "story" => Some(Self::Story),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invasion => "invasion",
            Self::Warfront => "warfront",
            Self::Seasonal => "seasonal",
            Self::Story => "story",
        }
    }
}

/// How NPCs pick fights in a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcAggroMode {
    #[default]
    Default,
    RetaliateOnly,
}

impl NpcAggroMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(Self::Default),
            "retaliate_only" => Some(Self::RetaliateOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::RetaliateOnly => "retaliate_only",
        }
    }
}

/// How far NPCs chase a target out of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcPursuitProfile {
    #[default]
    Default,
    Short,
    Train,
}

impl NpcPursuitProfile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(Self::Default),
            "short" => Some(Self::Short),
            "train" => Some(Self::Train),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Short => "short",
            Self::Train => "train",
        }
    }
}

/// Gameplay policy for one region after normalization.
///
/// Every field is optional; absence means "no special policy" and the
/// projections in [`super::projections`] supply the defaults. `rules` is an
/// opaque subtree (`ai.*`, `economy.*`, `travel.*`, ...) carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvp_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvp_mode: Option<PvpMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_kind: Option<RegionEventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger_scalar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warfront_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub rules: Map<String, Value>,
}

impl RegionPolicy {
    /// The "no special policy" value
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Render as the JSON document shape (`{}` when empty)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Look up a dotted path inside `rules`, e.g. `"ai.guardSortie.enabled"`
    pub fn rule(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.rules.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_policy_serializes_as_empty_object() {
        assert_eq!(RegionPolicy::empty().to_value(), json!({}));
        assert!(RegionPolicy::empty().is_empty());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(PvpMode::DuelOnly).unwrap(), json!("duelOnly"));
        assert_eq!(PvpMode::parse("duelOnly"), Some(PvpMode::DuelOnly));
        assert_eq!(PvpMode::parse("DUEL_ONLY"), None);
        assert_eq!(
            serde_json::to_value(NpcAggroMode::RetaliateOnly).unwrap(),
            json!("retaliate_only")
        );
        assert_eq!(RegionEventKind::Seasonal.as_str(), "seasonal");
    }

    #[test]
    fn test_rule_path_lookup() {
        let mut policy = RegionPolicy::empty();
        policy.rules.insert(
            "ai".into(),
            json!({ "guardSortie": { "enabled": true, "rangeTiles": 3 } }),
        );
        assert_eq!(policy.rule("ai.guardSortie.enabled"), Some(&json!(true)));
        assert_eq!(policy.rule("ai.guardSortie.rangeTiles"), Some(&json!(3)));
        assert_eq!(policy.rule("ai.missing"), None);
        assert_eq!(policy.rule("ai.guardSortie.enabled.deeper"), None);
    }
}
