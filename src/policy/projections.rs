//! Read-only projections over a normalized policy
//!
//! Consumers (movement, economy commands, NPC AI) call these instead of
//! poking at fields, so every default lives in one place.

use super::types::{NpcAggroMode, NpcPursuitProfile, RegionPolicy};
use serde_json::Value;

/// Guard sortie range when the policy does not set one
pub const DEFAULT_GUARD_SORTIE_RANGE_TILES: u32 = 1;
/// Largest sortie range a policy may request
pub const MAX_GUARD_SORTIE_RANGE_TILES: u32 = 8;
/// Danger multiplier when the policy does not set one
pub const DEFAULT_DANGER_SCALAR: f64 = 1.0;

pub fn is_pvp_enabled(policy: &RegionPolicy) -> bool {
    policy.pvp_enabled.unwrap_or(false)
}

/// Combat is on unless the policy explicitly turns it off
pub fn is_combat_enabled(policy: &RegionPolicy) -> bool {
    policy.combat_enabled != Some(false)
}

/// `rules.sanctuary: true` or `rules.sanctuary.enabled: true`
pub fn is_sanctuary(policy: &RegionPolicy) -> bool {
    match policy.rule("sanctuary") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Object(section)) => section.get("enabled").and_then(Value::as_bool) == Some(true),
        _ => false,
    }
}

pub fn is_guard_sortie_enabled(policy: &RegionPolicy) -> bool {
    rule_flag(policy, "ai.guardSortie.enabled")
}

pub fn guard_sortie_range_tiles(policy: &RegionPolicy) -> u32 {
    let Some(raw) = policy.rule("ai.guardSortie.rangeTiles") else {
        return DEFAULT_GUARD_SORTIE_RANGE_TILES;
    };
    let tiles = match raw.as_u64() {
        Some(n) => n,
        None => match raw.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => f.floor() as u64,
            Some(f) if f.is_finite() => 0,
            _ => return DEFAULT_GUARD_SORTIE_RANGE_TILES,
        },
    };
    tiles.min(MAX_GUARD_SORTIE_RANGE_TILES as u64) as u32
}

pub fn economy_lockdown_on_siege(policy: &RegionPolicy) -> bool {
    rule_flag(policy, "economy.lockdownOnSiege")
}

pub fn travel_lockdown_on_siege(policy: &RegionPolicy) -> bool {
    rule_flag(policy, "travel.lockdownOnSiege")
}

pub fn npc_aggro_mode(policy: &RegionPolicy) -> NpcAggroMode {
    policy
        .rule("ai.aggroMode")
        .and_then(Value::as_str)
        .and_then(NpcAggroMode::parse)
        .unwrap_or_default()
}

pub fn npc_pursuit_profile(policy: &RegionPolicy) -> NpcPursuitProfile {
    policy
        .rule("ai.pursuitProfile")
        .and_then(Value::as_str)
        .and_then(NpcPursuitProfile::parse)
        .unwrap_or_default()
}

pub fn danger_scalar(policy: &RegionPolicy) -> f64 {
    policy.danger_scalar.unwrap_or(DEFAULT_DANGER_SCALAR)
}

fn rule_flag(policy: &RegionPolicy, path: &str) -> bool {
    policy.rule(path).and_then(Value::as_bool).unwrap_or(false)
}
