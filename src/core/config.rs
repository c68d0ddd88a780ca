//! Engine configuration with documented defaults
//!
//! Every timing constant the siege engine uses lives here. Values can come
//! from a TOML file, from `REGION_SIEGE_*` environment variables, or from
//! `Default`. Unparsable values never fail a load: the key keeps its default.

use super::error::ConfigError;
use std::fs;
use std::path::Path;

/// Prefix for environment overrides, e.g. `REGION_SIEGE_SIEGE_TTL_MS`
pub const ENV_PREFIX: &str = "REGION_SIEGE_";

/// Upper bound on journal capacity
pub const MAX_JOURNAL_CAPACITY: usize = 100_000;

/// Numeric keys accepted by `from_toml_str` and `from_env_with`
pub const NUMERIC_KEYS: [&str; 9] = [
    "warning_ms",
    "siege_ttl_ms",
    "recovery_ms",
    "breach_ttl_ms",
    "breach_hits",
    "breach_window_ms",
    "policy_cache_ttl_ms",
    "intent_cooldown_ms",
    "journal_capacity",
];

/// Configuration for the region policy and siege engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // === SIEGE TIMELINE ===
    /// How long a room stays in the warning sub-tier after a pressure event
    ///
    /// Warning is the leading edge of the siege window, so values larger than
    /// `siege_ttl_ms` make the siege sub-tier unobservable.
    pub warning_ms: u64,

    /// How long a room stays under siege after the latest pressure event
    pub siege_ttl_ms: u64,

    /// Cool-down tail measured from the end of the siege window
    ///
    /// At default (60s), a room that stops receiving pressure returns to
    /// "none" three minutes after the last event.
    pub recovery_ms: u64,

    // === BREACH ESCALATION ===
    /// Duration of a granted breach
    pub breach_ttl_ms: u64,

    /// Pressure events needed inside the rolling window to grant a breach
    ///
    /// A value of 1 grants a breach on every pressure event.
    pub breach_hits: usize,

    /// Length of the rolling window counted toward `breach_hits`
    pub breach_window_ms: u64,

    /// Opt into max-merge of deadlines on overlapping pressure events
    ///
    /// When false (default) the latest pressure event replaces the whole
    /// timeline, and may shorten it.
    pub extend_only: bool,

    // === POLICY CACHE ===
    /// How long a fetched (or failed) policy stays cached
    pub policy_cache_ttl_ms: u64,

    // === DERIVED EVENTS ===
    /// Minimum spacing between invasion intents for one room
    pub intent_cooldown_ms: u64,

    /// Maximum number of journal records kept in memory
    pub journal_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Timeline: warning ⊂ siege, recovery trails siege
            warning_ms: 10_000,
            siege_ttl_ms: 120_000,
            recovery_ms: 60_000,

            // Three hits in thirty seconds breaches for a minute
            breach_ttl_ms: 60_000,
            breach_hits: 3,
            breach_window_ms: 30_000,
            extend_only: false,

            policy_cache_ttl_ms: 60_000,
            intent_cooldown_ms: 60_000,
            journal_capacity: 500,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file (see `from_toml_str`)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML.
    ///
    /// Keys may sit at the top level or inside an `[engine]` table. Only TOML
    /// syntax errors fail; a missing or mistyped key keeps its default.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let root: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let table = match root.get("engine").and_then(|v| v.as_table()) {
            Some(engine) => engine,
            None => &root,
        };

        let mut config = Self::default();
        for key in NUMERIC_KEYS {
            let Some(value) = table.get(key) else {
                continue;
            };
            match toml_u64(value) {
                Some(n) => config.apply_numeric(key, n),
                None => tracing::warn!(key, value = %value, "Ignoring unparsable config value"),
            }
        }
        if let Some(value) = table.get("extend_only") {
            match value.as_bool() {
                Some(flag) => config.extend_only = flag,
                None => tracing::warn!(key = "extend_only", value = %value, "Ignoring unparsable config value"),
            }
        }

        Ok(config.sanitized())
    }

    /// Build from `REGION_SIEGE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (env-style names)
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        for key in NUMERIC_KEYS {
            let var = env_var_name(key);
            let Some(raw) = lookup(&var) else {
                continue;
            };
            match parse_u64(&raw) {
                Some(n) => config.apply_numeric(key, n),
                None => tracing::warn!(var = %var, raw = %raw, "Ignoring unparsable environment override"),
            }
        }
        if let Some(raw) = lookup(&env_var_name("extend_only")) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.extend_only = true,
                "0" | "false" | "no" | "off" => config.extend_only = false,
                _ => tracing::warn!(raw = %raw, "Ignoring unparsable extend_only override"),
            }
        }
        config.sanitized()
    }

    /// Clamp values that would make the engine misbehave
    pub fn sanitized(mut self) -> Self {
        self.breach_hits = self.breach_hits.max(1);
        self.breach_window_ms = self.breach_window_ms.max(1);
        self.journal_capacity = self.journal_capacity.clamp(1, MAX_JOURNAL_CAPACITY);
        self
    }

    /// Validate configuration for internal consistency
    ///
    /// Nothing reported here is fatal; the engine runs with any sanitized
    /// config. Callers log the message.
    pub fn validate(&self) -> Result<(), String> {
        if self.warning_ms > self.siege_ttl_ms {
            return Err(format!(
                "warning_ms ({}) exceeds siege_ttl_ms ({}); the siege tier is unreachable",
                self.warning_ms, self.siege_ttl_ms
            ));
        }

        if self.breach_hits > 1 && self.breach_window_ms < self.breach_hits as u64 {
            return Err(format!(
                "breach_window_ms ({}) is shorter than breach_hits ({}) milliseconds",
                self.breach_window_ms, self.breach_hits
            ));
        }

        if self.breach_ttl_ms == 0 {
            return Err("breach_ttl_ms is 0; breaches expire the instant they are granted".into());
        }

        Ok(())
    }

    fn apply_numeric(&mut self, key: &str, value: u64) {
        match key {
            "warning_ms" => self.warning_ms = value,
            "siege_ttl_ms" => self.siege_ttl_ms = value,
            "recovery_ms" => self.recovery_ms = value,
            "breach_ttl_ms" => self.breach_ttl_ms = value,
            "breach_hits" => self.breach_hits = usize::try_from(value).unwrap_or(usize::MAX),
            "breach_window_ms" => self.breach_window_ms = value,
            "policy_cache_ttl_ms" => self.policy_cache_ttl_ms = value,
            "intent_cooldown_ms" => self.intent_cooldown_ms = value,
            "journal_capacity" => {
                self.journal_capacity = usize::try_from(value).unwrap_or(usize::MAX)
            }
            _ => {}
        }
    }
}

fn env_var_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase())
}

fn parse_u64(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}

fn toml_u64(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(n) => u64::try_from(*n).ok(),
        toml::Value::Float(f) if f.is_finite() && *f >= 0.0 => Some(*f as u64),
        toml::Value::String(s) => parse_u64(s),
        _ => None,
    }
}
