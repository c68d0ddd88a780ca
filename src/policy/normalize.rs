//! Normalization of untrusted policy documents
//!
//! The backing store is written by admin tooling, but nothing it returns is
//! trusted. Known fields are kept when they have the right shape; everything
//! else is dropped without complaint. The result is idempotent:
//! `normalize_policy(&normalize_policy(x).to_value()) == normalize_policy(x)`.

use super::types::{PvpMode, RegionEventKind, RegionPolicy};
use serde_json::{Map, Value};

pub const MIN_DANGER_SCALAR: f64 = 0.1;
pub const MAX_DANGER_SCALAR: f64 = 10.0;

/// Normalize a raw provider document. Non-objects yield the empty policy.
pub fn normalize_policy(raw: &Value) -> RegionPolicy {
    let Some(doc) = raw.as_object() else {
        return RegionPolicy::empty();
    };

    RegionPolicy {
        combat_enabled: bool_field(doc, "combatEnabled"),
        pvp_enabled: bool_field(doc, "pvpEnabled"),
        pvp_mode: str_field(doc, "pvpMode").and_then(PvpMode::parse),
        event_enabled: bool_field(doc, "eventEnabled"),
        event_id: string_field(doc, "eventId"),
        event_kind: str_field(doc, "eventKind").and_then(RegionEventKind::parse),
        event_tags: tags_field(doc, "eventTags"),
        danger_scalar: doc
            .get("dangerScalar")
            .and_then(Value::as_f64)
            .and_then(clamp_danger_scalar),
        warfront_id: string_field(doc, "warfrontId"),
        rules: doc
            .get("rules")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

/// Clamp to `[0.1, 10]`; non-finite input has no scalar at all
pub fn clamp_danger_scalar(raw: f64) -> Option<f64> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.clamp(MIN_DANGER_SCALAR, MAX_DANGER_SCALAR))
}

fn bool_field(doc: &Map<String, Value>, key: &str) -> Option<bool> {
    doc.get(key).and_then(Value::as_bool)
}

fn str_field<'a>(doc: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str)
}

fn string_field(doc: &Map<String, Value>, key: &str) -> Option<String> {
    let value = str_field(doc, key)?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn tags_field(doc: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let raw = doc.get(key)?.as_array()?;
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw.iter().filter_map(Value::as_str).map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}
