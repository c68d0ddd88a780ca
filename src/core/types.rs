//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock time in milliseconds since the Unix epoch
pub type TimestampMs = u64;

/// Cache key for a region policy: shard plus normalized region id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyKey {
    pub shard_id: String,
    pub region_id: String,
}

impl PolicyKey {
    pub fn new(shard_id: &str, region_id: &str) -> Self {
        Self {
            shard_id: shard_id.trim().to_string(),
            region_id: normalize_region_id(region_id),
        }
    }

    /// Parse the `shard::region` rendering produced by `Display`
    pub fn parse(raw: &str) -> Option<Self> {
        let (shard, region) = raw.split_once("::")?;
        let key = Self::new(shard, region);
        if key.shard_id.is_empty() || key.region_id.is_empty() {
            return None;
        }
        Some(key)
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.shard_id, self.region_id)
    }
}

/// Strip a leading `shard:` qualifier from a region id.
///
/// `"prime_shard:8,8"` and `"8,8"` name the same region.
pub fn normalize_region_id(region_id: &str) -> String {
    let trimmed = region_id.trim();
    match trimmed.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => trimmed.to_string(),
    }
}
