//! Synchronous typed publish/subscribe
//!
//! `emit` calls every matching listener in registration order before it
//! returns. There is no queue. Listeners may emit from inside a handler;
//! the nested emit is delivered depth-first.

use super::types::{EngineEvent, EventName};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

pub type Handler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

struct Listener {
    /// `None` listens to every event
    filter: Option<EventName>,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event
    pub fn on<F>(&self, name: EventName, handler: F)
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.push(Some(name), Arc::new(handler));
    }

    /// Register a listener for every event
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.push(None, Arc::new(handler));
    }

    /// Deliver to every matching listener; returns how many completed.
    ///
    /// A panicking handler is logged and skipped, and delivery continues.
    pub fn emit(&self, event: &EngineEvent) -> usize {
        let name = event.name();
        let handlers: Vec<Handler> = self
            .lock()
            .iter()
            .filter(|l| l.filter.map_or(true, |f| f == name))
            .map(|l| l.handler.clone())
            .collect();

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::error!(event = name.as_str(), room = event.room_id(), "Event handler panicked")
                }
            }
        }
        delivered
    }

    /// Listeners that would receive `name` (including wildcards)
    pub fn listener_count(&self, name: EventName) -> usize {
        self.lock()
            .iter()
            .filter(|l| l.filter.map_or(true, |f| f == name))
            .count()
    }

    fn push(&self, filter: Option<EventName>, handler: Handler) {
        self.lock().push(Listener { filter, handler });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
