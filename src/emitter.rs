//! Listener registry for [`LedgerNotice`]s.
//!
//! Listeners receive the notice as a JSON string. `event-emitter-rs` runs each
//! callback on its own thread, so listeners never block the ledger.

use std::sync::Mutex;

use event_emitter_rs::EventEmitter;
use tracing::{debug, error};

use crate::notice::LedgerNotice;

pub struct LedgerEmitter {
    inner: Mutex<EventEmitter>,
}

impl LedgerEmitter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(EventEmitter::new()),
        }
    }

    /// Register a listener for an event type (`"LessonCompleted"`, `"CourseCompleted"`).
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        match self.inner.lock() {
            Ok(mut emitter) => {
                emitter.on(event, listener);
            }
            Err(_) => error!(event, "emitter lock poisoned; listener not registered"),
        }
    }

    pub fn emit(&self, notice: &LedgerNotice) {
        let payload = match notice.payload() {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "failed to encode ledger notice");
                return;
            }
        };

        match self.inner.lock() {
            Ok(mut emitter) => {
                debug!(event = notice.event_type(), "emitting ledger notice");
                emitter.emit(notice.event_type(), payload);
            }
            Err(_) => error!(event = notice.event_type(), "emitter lock poisoned; notice dropped"),
        }
    }
}

impl Default for LedgerEmitter {
    fn default() -> Self {
        Self::new()
    }
}
