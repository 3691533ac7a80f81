//! Session manager.
//!
//! Owns one slot per session key. Starting a session for a key that already
//! has one replaces it: the registry closes the old connection before the
//! new one opens, so two streams never race to update the same key. The
//! slot map is locked only to read or swap slots, never while a connection
//! closes or a pump drains.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use logging::{SessionEvent, SessionEventLogger};
use promptcraft_core::{AgentSession, Applied, ConnectionState, SessionMode, StreamEvent};
use promptcraft_stream::{
    ConnectOptions, ConnectionRegistry, Credential, EndpointError, Generation, HttpTransport,
    StreamEndpoint, Transport,
};

use crate::session_pump::SessionPump;

/// Everything needed to start one optimization session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub endpoint: StreamEndpoint,
    /// Sent as `?token=`; without one the stream is opened unauthenticated.
    pub credential: Option<Credential>,
    pub mode: SessionMode,
    pub input: String,
    /// Overrides the registry defaults for this session only.
    pub options: Option<ConnectOptions>,
}

impl SessionRequest {
    pub fn new(endpoint: StreamEndpoint, mode: SessionMode, input: impl Into<String>) -> Self {
        Self {
            endpoint,
            credential: None,
            mode,
            input: input.into(),
            options: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// One event as seen by the caller, with the session state right after it.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub key: String,
    pub event: StreamEvent,
    pub applied: Applied,
    pub snapshot: AgentSession,
}

/// Caller hook invoked for every lifecycle and domain event, in order.
pub type EventCallback = Arc<dyn Fn(&SessionUpdate) + Send + Sync>;

struct SessionSlot {
    generation: Generation,
    state: watch::Receiver<AgentSession>,
    pump: Option<JoinHandle<()>>,
}

impl SessionSlot {
    /// Wait for the pump to drain. Once this returns no callback for this
    /// slot will fire again.
    async fn join(&mut self, key: &str) {
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                warn!(key, error = %e, "Session pump ended abnormally");
            }
        }
    }
}

pub struct SessionManager {
    registry: Arc<ConnectionRegistry>,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_transport(transport: Arc<dyn Transport>, defaults: ConnectOptions) -> Self {
        Self::new(Arc::new(ConnectionRegistry::new(transport, defaults)))
    }

    /// Manager backed by SSE over HTTP.
    pub fn http(defaults: ConnectOptions) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()), defaults)
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Start (or restart) the session for `key` and return a receiver for
    /// its snapshots. `on_event` sees every event with the post-apply state.
    ///
    /// Network trouble never surfaces here; the only error is an endpoint
    /// that cannot produce a URL.
    pub async fn start_session(
        &self,
        key: &str,
        request: SessionRequest,
        on_event: Option<EventCallback>,
    ) -> Result<watch::Receiver<AgentSession>, EndpointError> {
        let url = request.endpoint.url(request.credential.as_ref())?;

        let mut session = AgentSession::new(key, request.mode, request.input);
        session.start();
        let (state_tx, state_rx) = watch::channel(session);
        let state_tx = Arc::new(state_tx);
        let (sink, notices) = mpsc::unbounded_channel();

        let options = request
            .options
            .unwrap_or_else(|| self.registry.defaults().clone());
        let generation = self
            .registry
            .connect_with(
                key,
                &request.endpoint,
                request.credential.as_ref(),
                options,
                sink,
            )
            .await?;

        // Its connection is already closed; let the pump drain before the
        // new one starts publishing.
        let previous = self.sessions.lock().await.remove(key);
        if let Some(mut previous) = previous {
            previous.join(key).await;
            info!(
                key,
                previous = previous.generation,
                generation,
                "Session restarted"
            );
        }

        let pump = SessionPump::new(
            key,
            generation,
            Arc::clone(&self.registry),
            state_tx,
            notices,
            on_event,
        );
        let handle = tokio::spawn(pump.run());
        let displaced = self.sessions.lock().await.insert(
            key.to_string(),
            SessionSlot {
                generation,
                state: state_rx.clone(),
                pump: Some(handle),
            },
        );
        // A concurrent start for the same key; the registry already
        // replaced its connection.
        if let Some(mut displaced) = displaced {
            displaced.join(key).await;
        }

        SessionEventLogger::log_event(
            key,
            SessionEvent::Started {
                mode: request.mode.to_string(),
                endpoint: url.to_string(),
            },
        );
        Ok(state_rx)
    }

    /// Stop streaming for `key`. The last snapshot stays readable. Returns
    /// false for an unknown or already-cancelled key.
    pub async fn cancel_session(&self, key: &str) -> bool {
        let (generation, pump, was_live) = {
            let mut sessions = self.sessions.lock().await;
            let Some(slot) = sessions.get_mut(key) else {
                debug!(key, "Cancel for unknown session ignored");
                return false;
            };
            let Some(pump) = slot.pump.take() else {
                return false;
            };
            let was_live = !slot.state.borrow().is_terminal();
            (slot.generation, pump, was_live)
        };
        self.registry.disconnect_generation(key, generation).await;
        if let Err(e) = pump.await {
            warn!(key, error = %e, "Session pump ended abnormally");
        }
        if was_live {
            SessionEventLogger::log_event(key, SessionEvent::Cancelled);
        }
        true
    }

    /// Cancel `key` and forget it entirely.
    pub async fn reset_session(&self, key: &str) -> bool {
        let removed = self.sessions.lock().await.remove(key);
        let Some(mut slot) = removed else {
            return false;
        };
        self.registry
            .disconnect_generation(key, slot.generation)
            .await;
        slot.join(key).await;
        debug!(key, "Session reset");
        true
    }

    /// Latest snapshot for `key`.
    pub async fn get_session_state(&self, key: &str) -> Option<AgentSession> {
        self.sessions
            .lock()
            .await
            .get(key)
            .map(|slot| slot.state.borrow().clone())
    }

    /// Fresh receiver for `key`'s snapshots.
    pub async fn subscribe(&self, key: &str) -> Option<watch::Receiver<AgentSession>> {
        self.sessions
            .lock()
            .await
            .get(key)
            .map(|slot| slot.state.clone())
    }

    pub async fn connection_state(&self, key: &str) -> ConnectionState {
        self.registry.state_of(key).await
    }

    pub async fn session_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Cancel every session. Snapshots stay readable.
    pub async fn shutdown(&self) {
        let keys = self.session_keys().await;
        for key in keys {
            self.cancel_session(&key).await;
        }
        info!("Session manager shut down");
    }
}
