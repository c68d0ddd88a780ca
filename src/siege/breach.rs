//! Rolling window of pressure hits that escalates a siege into a breach

use crate::core::types::TimestampMs;
use std::collections::VecDeque;

/// Timestamps of recent pressure events for one room, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreachWindow {
    hits: VecDeque<TimestampMs>,
}

impl BreachWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop hits more than `window_ms` before `now`
    pub fn prune(&mut self, now: TimestampMs, window_ms: u64) {
        self.hits.retain(|&ts| now.saturating_sub(ts) <= window_ms);
    }

    /// Prune, append `now`, and return the resulting hit count
    pub fn record(&mut self, now: TimestampMs, window_ms: u64) -> usize {
        self.prune(now, window_ms);
        self.hits.push_back(now);
        self.hits.len()
    }

    /// Hits that would still count at `now`, without mutating
    pub fn count_at(&self, now: TimestampMs, window_ms: u64) -> usize {
        self.hits
            .iter()
            .filter(|&&ts| now.saturating_sub(ts) <= window_ms)
            .count()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hits(&self) -> impl Iterator<Item = TimestampMs> + '_ {
        self.hits.iter().copied()
    }
}
