//! Push events and the per-corpus event relay.
//!
//! The server pushes typed JSON payloads (`{"event_type": "job", ...}`) over
//! one shared channel per corpus. [`EventRelay`] fans those payloads out to
//! callbacks registered by event kind and to any broadcast subscribers.
//! [`RelayRegistry`] owns the relays so every component on a page shares the
//! same one for a given corpus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::models::JobStatus;
use crate::Result;

/// Alert pushed to every page of a corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub message: String,
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

/// Job status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub percent_complete: Option<u8>,
}

/// Typed push event, discriminated by `event_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum PushEvent {
    Alert(AlertEvent),
    Job(JobEvent),
}

/// Kind key used to register callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Alert,
    Job,
}

impl PushEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PushEvent::Alert(_) => EventKind::Alert,
            PushEvent::Job(_) => EventKind::Job,
        }
    }
}

type Callback = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// One corpus's push-event relay.
///
/// Callbacks run synchronously on the dispatching task, in registration
/// order. Broadcast subscribers that fall behind receive `Lagged` and miss
/// events; the job manager recovers from that by re-fetching jobs.
pub struct EventRelay {
    corpus_id: String,
    tx: broadcast::Sender<PushEvent>,
    callbacks: RwLock<HashMap<EventKind, Vec<Callback>>>,
}

impl EventRelay {
    pub fn new(corpus_id: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            corpus_id: corpus_id.into(),
            tx,
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    pub fn corpus_id(&self) -> &str {
        &self.corpus_id
    }

    /// Register a callback for one event kind.
    pub fn register<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        callbacks.entry(kind).or_default().push(Arc::new(callback));
        debug!(corpus_id = %self.corpus_id, ?kind, "Registered push-event callback");
    }

    /// Deliver an event to callbacks and subscribers.
    pub fn publish(&self, event: PushEvent) {
        let callbacks: Vec<Callback> = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        for callback in &callbacks {
            callback(&event);
        }

        let subscriber_count = self.tx.receiver_count();
        debug!(
            corpus_id = %self.corpus_id,
            kind = ?event.kind(),
            callbacks = callbacks.len(),
            subscriber_count,
            "Relay publish"
        );
        // No subscribers is fine; callbacks may be the only consumers.
        let _ = self.tx.send(event);
    }

    /// Parse a raw payload and publish it.
    ///
    /// Returns the dispatched kind, or `None` when the payload carries an
    /// `event_type` this client does not know (logged and dropped).
    pub fn dispatch_json(&self, raw: &str) -> Result<Option<EventKind>> {
        let value: JsonValue = serde_json::from_str(raw)?;
        let event_type = value
            .get("event_type")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        if !matches!(event_type.as_str(), "alert" | "job") {
            warn!(corpus_id = %self.corpus_id, %event_type, "Dropping unknown push event");
            return Ok(None);
        }

        let event: PushEvent = serde_json::from_value(value)?;
        let kind = event.kind();
        self.publish(event);
        Ok(Some(kind))
    }

    /// Subscribe to every event published on this relay.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Owner of the per-corpus relays.
pub struct RelayRegistry {
    capacity: usize,
    relays: Mutex<HashMap<String, Arc<EventRelay>>>,
}

impl Default for RelayRegistry {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_RELAY_CAPACITY)
    }
}

impl RelayRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            relays: Mutex::new(HashMap::new()),
        }
    }

    /// The shared relay for `corpus_id`, created on first use.
    pub fn relay_for(&self, corpus_id: &str) -> Arc<EventRelay> {
        let mut relays = self.relays.lock().unwrap_or_else(PoisonError::into_inner);
        relays
            .entry(corpus_id.to_string())
            .or_insert_with(|| {
                info!(corpus_id, "Creating push-event relay");
                Arc::new(EventRelay::new(corpus_id, self.capacity))
            })
            .clone()
    }

    /// Drop the relay for `corpus_id` (page unmount).
    pub fn close(&self, corpus_id: &str) -> bool {
        self.relays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(corpus_id)
            .is_some()
    }
}
