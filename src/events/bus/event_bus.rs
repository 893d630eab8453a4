// events/bus/event_bus.rs
//
// In-process event bus for invoicing facts.
//
// DESIGN PRINCIPLES:
// 1. Synchronous - handlers run on the emitting task, in subscription order
// 2. Re-entrant - the handler list is snapshotted before dispatch
// 3. Bounded - only the most recent emissions are kept for inspection

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::events::types::DomainEvent;

/// Emissions kept by `EventBus::new`
pub const DEFAULT_LOG_CAPACITY: usize = 256;

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// One dispatched event, as remembered by the bus
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogEntry {
    pub event_type: &'static str,
    pub event_id: String,
    pub occurred_at: String,
    pub handler_count: usize,
    /// Handlers that panicked while processing this event
    pub failed_handlers: usize,
}

struct Inner {
    handlers: RwLock<HashMap<TypeId, Vec<Handler>>>,
    log: Mutex<VecDeque<EventLogEntry>>,
    log_capacity: usize,
}

/// Announces what the workflow did without knowing who listens.
///
/// Clones share subscribers and the emission log.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_log_capacity(log_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(HashMap::new()),
                log: Mutex::new(VecDeque::with_capacity(log_capacity.min(DEFAULT_LOG_CAPACITY))),
                log_capacity,
            }),
        }
    }

    /// Registers `handler` for every future `E`
    pub fn subscribe<E, F>(&self, handler: F)
    where
        E: DomainEvent + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let erased: Handler = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });

        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }

    /// Dispatches `event` to its subscribers.
    ///
    /// A panicking handler is logged and counted; the rest still run.
    pub fn emit<E>(&self, event: E)
    where
        E: DomainEvent + 'static,
    {
        // Snapshot so handlers may subscribe or emit without deadlocking
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();

        log::debug!(
            "[EVENT] {} (id: {}) -> {} handlers",
            event.event_type(),
            event.event_id(),
            handlers.len()
        );

        let failed_handlers = handlers
            .iter()
            .filter(|handler| {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler(&event as &dyn Any)));
                if outcome.is_err() {
                    log::error!("A {} handler panicked", event.event_type());
                }
                outcome.is_err()
            })
            .count();

        self.remember(EventLogEntry {
            event_type: event.event_type(),
            event_id: event.event_id().to_string(),
            occurred_at: event.occurred_at().to_rfc3339(),
            handler_count: handlers.len(),
            failed_handlers,
        });
    }

    fn remember(&self, entry: EventLogEntry) {
        if self.inner.log_capacity == 0 {
            return;
        }
        let mut log = self.inner.log.lock().unwrap_or_else(PoisonError::into_inner);
        if log.len() == self.inner.log_capacity {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Most recent emissions, oldest first
    pub fn emitted(&self) -> Vec<EventLogEntry> {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
