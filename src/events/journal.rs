//! Bounded in-memory journal of engine events
//!
//! Read by debug commands and tests; nothing here is durable.

use super::bus::EventBus;
use super::types::EventName;
use crate::core::clock::Clock;
use crate::core::types::TimestampMs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Records returned by `peek_recent` when no limit is given
pub const DEFAULT_PEEK_LIMIT: usize = 50;
/// Hard cap on records returned by one `peek_recent`
pub const MAX_PEEK_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub id: u64,
    pub ts: TimestampMs,
    pub event: String,
    pub payload: Value,
}

/// Filter for `peek_recent`. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalQuery {
    /// Only records with `ts >= since_ts`
    pub since_ts: Option<TimestampMs>,
    /// Only events whose name starts with this prefix
    pub event_prefix: Option<String>,
    /// Only these exact event names
    pub events: Option<Vec<String>>,
    /// Maximum records returned (default 50, capped at 1000)
    pub limit: Option<usize>,
}

impl JournalQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, ts: TimestampMs) -> Self {
        self.since_ts = Some(ts);
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.event_prefix = Some(prefix.to_string());
        self
    }

    pub fn events(mut self, names: &[&str]) -> Self {
        self.events = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn effective_limit(&self) -> usize {
        match self.limit {
            None | Some(0) => DEFAULT_PEEK_LIMIT,
            Some(n) => n.min(MAX_PEEK_LIMIT),
        }
    }

    fn matches(&self, record: &JournalRecord) -> bool {
        if self.since_ts.is_some_and(|since| record.ts < since) {
            return false;
        }
        if let Some(prefix) = &self.event_prefix {
            if !record.event.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(events) = &self.events {
            if !events.iter().any(|e| *e == record.event) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug)]
struct JournalBuffer {
    records: VecDeque<JournalRecord>,
    next_id: u64,
}

/// Fixed-capacity FIFO of observed events
#[derive(Debug)]
pub struct EventJournal {
    capacity: usize,
    allow_list: Vec<String>,
    buffer: Mutex<JournalBuffer>,
}

impl EventJournal {
    /// Journal every engine event
    pub fn new(capacity: usize) -> Self {
        Self::with_allow_list(
            capacity,
            EventName::ALL.iter().map(|n| n.as_str().to_string()).collect(),
        )
    }

    pub fn with_allow_list(capacity: usize, allow_list: Vec<String>) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            allow_list,
            buffer: Mutex::new(JournalBuffer {
                records: VecDeque::with_capacity(capacity.min(1024)),
                next_id: 1,
            }),
        }
    }

    /// Subscribe to the bus, stamping records with `clock`
    pub fn attach(self: &Arc<Self>, bus: &EventBus, clock: Arc<dyn Clock>) {
        let journal = Arc::clone(self);
        bus.on_any(move |event| {
            journal.record(event.name().as_str(), event.payload(), clock.now_ms());
        });
    }

    pub fn is_tracked(&self, event: &str) -> bool {
        self.allow_list.iter().any(|name| name == event)
    }

    /// Append a record if `event` is on the allow-list. Returns its id.
    pub fn record(&self, event: &str, payload: Value, ts: TimestampMs) -> Option<u64> {
        if !self.is_tracked(event) {
            return None;
        }

        let mut buffer = self.lock();
        let id = buffer.next_id;
        buffer.next_id += 1;
        buffer.records.push_back(JournalRecord {
            id,
            ts,
            event: event.to_string(),
            payload,
        });
        while buffer.records.len() > self.capacity {
            buffer.records.pop_front();
        }
        Some(id)
    }

    /// Matching records, newest first
    pub fn peek_recent(&self, query: &JournalQuery) -> Vec<JournalRecord> {
        let limit = query.effective_limit();
        self.lock()
            .records
            .iter()
            .rev()
            .filter(|record| query.matches(record))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Drop all records. Ids keep increasing across clears.
    pub fn clear(&self) {
        self.lock().records.clear();
    }

    fn lock(&self) -> MutexGuard<'_, JournalBuffer> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
