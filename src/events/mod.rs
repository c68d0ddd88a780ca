//! Event plumbing: typed events, the synchronous bus, and the bounded journal.

pub mod bus;
pub mod journal;
pub mod types;

pub use bus::EventBus;
pub use journal::{EventJournal, JournalQuery, JournalRecord};
pub use types::{BreachEvent, EngineEvent, EventName, IntentEvent, IntentReason, PressureEvent};
