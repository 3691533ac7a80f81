//! Per-connection event dispatch.
//!
//! Raw `(event_type, data)` pairs from the wire are decoded into typed
//! [`StreamEvent`]s at this boundary. Payloads that fail to decode are
//! logged and dropped; they never reach a listener and never end the
//! connection. Listeners for an event run in registration order, and a
//! failing or panicking listener does not stop the ones after it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, warn};

use promptcraft_core::{PayloadError, StreamEvent};

/// Handle returned by [`EventDispatcher::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&StreamEvent) -> anyhow::Result<()> + Send>;

struct Registration {
    id: ListenerId,
    /// `None` listens to every event.
    event_type: Option<String>,
    listener: Listener,
}

pub struct EventDispatcher {
    key: String,
    listeners: Vec<Registration>,
    next_id: u64,
    dropped: u64,
}

impl EventDispatcher {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            listeners: Vec::new(),
            next_id: 1,
            dropped: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Register a listener for one event type (`"token"`, `"complete"`, ...).
    pub fn on<F>(&mut self, event_type: &str, listener: F) -> ListenerId
    where
        F: FnMut(&StreamEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.register(Some(event_type.to_string()), Box::new(listener))
    }

    /// Register a listener for every event, lifecycle ones included.
    pub fn on_any<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&StreamEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.register(None, Box::new(listener))
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|r| r.id != id);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of wire events dropped because their payload was invalid.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Decode a wire event. Failures are logged and counted before being
    /// handed back.
    pub fn decode(&mut self, event_type: &str, raw: &str) -> Result<StreamEvent, PayloadError> {
        StreamEvent::decode(event_type, raw).inspect_err(|e| {
            self.dropped += 1;
            warn!(
                key = %self.key,
                event_type,
                error = %e,
                dropped = self.dropped,
                "Dropping malformed stream event"
            );
        })
    }

    /// Decode and deliver a wire event. Returns the decoded event, or `None`
    /// if it was dropped.
    pub fn dispatch(&mut self, event_type: &str, raw: &str) -> Option<StreamEvent> {
        let event = self.decode(event_type, raw).ok()?;
        self.dispatch_event(&event);
        Some(event)
    }

    /// Deliver an already-typed event. Returns how many listeners saw it.
    pub fn dispatch_event(&mut self, event: &StreamEvent) -> usize {
        let name = event.name();
        let key = &self.key;
        let mut delivered = 0;
        for registration in self
            .listeners
            .iter_mut()
            .filter(|r| r.event_type.as_deref().map_or(true, |t| t == name))
        {
            delivered += 1;
            match catch_unwind(AssertUnwindSafe(|| (registration.listener)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    key = %key,
                    event = name,
                    listener = registration.id.0,
                    error = %e,
                    "Listener failed"
                ),
                Err(_) => error!(
                    key = %key,
                    event = name,
                    listener = registration.id.0,
                    "Listener panicked"
                ),
            }
        }
        if delivered == 0 {
            debug!(key = %key, event = name, "No listener for event");
        }
        delivered
    }

    fn register(&mut self, event_type: Option<String>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Registration {
            id,
            event_type,
            listener,
        });
        id
    }
}
