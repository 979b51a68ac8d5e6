//! Rebuild lifecycle notifications.
//!
//! The orchestrator publishes an [`IndexEvent`] to every registered
//! [`IndexEventListener`] when a rebuild starts and when a new snapshot has
//! gone live. Listeners are fire-and-forget observers: they cannot fail or
//! veto a rebuild, and they should return quickly because they run inline.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Arc;

use crate::models::Index;

#[derive(Clone, Debug)]
pub enum IndexEvent {
    /// A rebuild has begun.
    Started { at: DateTime<Utc> },
    /// A rebuild succeeded and `index` is now the live snapshot.
    Finished {
        index: Arc<Index>,
        at: DateTime<Utc>,
    },
}

pub trait IndexEventListener: Send + Sync {
    fn on_event(&self, event: &IndexEvent);
}

/// Logs each event through `tracing`.
pub struct TracingListener;

impl IndexEventListener for TracingListener {
    fn on_event(&self, event: &IndexEvent) {
        match event {
            IndexEvent::Started { at } => {
                tracing::info!(started_at = %at.to_rfc3339(), "index rebuild started");
            }
            IndexEvent::Finished { index, at } => {
                tracing::info!(
                    items = index.len(),
                    finished_at = %at.to_rfc3339(),
                    "index rebuild finished"
                );
            }
        }
    }
}

/// Machine-readable events: one JSON object per line on stderr.
pub struct JsonEventListener;

impl IndexEventListener for JsonEventListener {
    fn on_event(&self, event: &IndexEvent) {
        let obj = match event {
            IndexEvent::Started { at } => serde_json::json!({
                "event": "rebuild_started",
                "at": at.to_rfc3339(),
            }),
            IndexEvent::Finished { index, at } => serde_json::json!({
                "event": "rebuild_finished",
                "at": at.to_rfc3339(),
                "items": index.len(),
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// Fan-out to a fixed set of listeners, in registration order.
#[derive(Clone, Default)]
pub struct EventPublisher {
    listeners: Vec<Arc<dyn IndexEventListener>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn IndexEventListener>) {
        self.listeners.push(listener);
    }

    pub fn publish(&self, event: IndexEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}
