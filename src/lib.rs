//! Region Siege - region policy cache and siege escalation engine
//!
//! Policies are fetched per `(shard, region)`, normalized, and cached behind a
//! fail-closed store. Hostile pressure on sanctuary rooms drives a per-room
//! siege state machine whose breaches become rate-limited invasion intents.
//! Everything is wired through a synchronous event bus and journaled.

pub mod core;
pub mod engine;
pub mod events;
pub mod policy;
pub mod siege;

pub use crate::core::{Clock, EngineConfig, ManualClock, RegionError, Result, SystemClock};
pub use crate::engine::{GateDecision, RegionEngine};
