//! Connection registry.
//!
//! Maps each session key to at most one live [`StreamConnection`]. All
//! mutation goes through `connect` / `disconnect`. The map lock guards
//! entry swaps only; connections are closed after their entry is removed
//! and the lock released, and a replacement finishes tearing down the old
//! connection before the new one is spawned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use promptcraft_core::ConnectionState;

use crate::connection::{ConnectOptions, NoticeSink, StreamConnection};
use crate::endpoint::{Credential, StreamEndpoint};
use crate::error::EndpointError;
use crate::transport::Transport;

/// Identifies one particular connection opened for a key.
pub type Generation = u64;

pub struct ConnectionRegistry {
    transport: Arc<dyn Transport>,
    defaults: ConnectOptions,
    connections: Mutex<HashMap<String, StreamConnection>>,
    next_generation: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new(transport: Arc<dyn Transport>, defaults: ConnectOptions) -> Self {
        info!(transport = transport.name(), "Connection registry initialized");
        Self {
            transport,
            defaults,
            connections: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn defaults(&self) -> &ConnectOptions {
        &self.defaults
    }

    /// Open a connection for `key` with the registry's default options,
    /// replacing any live one.
    pub async fn connect(
        &self,
        key: &str,
        endpoint: &StreamEndpoint,
        credential: Option<&Credential>,
        sink: NoticeSink,
    ) -> Result<Generation, EndpointError> {
        self.connect_with(key, endpoint, credential, self.defaults.clone(), sink)
            .await
    }

    /// Open a connection for `key` with explicit options. An existing
    /// connection for the key is fully closed (its `Closed` notice sent)
    /// before the new one starts.
    ///
    /// The map lock is only held to swap entries; closing a connection
    /// happens outside it, so teardown of one key never stalls another.
    pub async fn connect_with(
        &self,
        key: &str,
        endpoint: &StreamEndpoint,
        credential: Option<&Credential>,
        options: ConnectOptions,
        sink: NoticeSink,
    ) -> Result<Generation, EndpointError> {
        // Build the URL first so a bad endpoint leaves the old connection alone.
        let url = endpoint.url(credential)?;

        let previous = self.connections.lock().await.remove(key);
        if let Some(mut previous) = previous {
            info!(
                key,
                generation = previous.generation(),
                "Replacing existing connection"
            );
            previous.close().await;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let connection = StreamConnection::open(
            key,
            url,
            Arc::clone(&self.transport),
            options,
            sink,
            generation,
        );
        let displaced = {
            let mut connections = self.connections.lock().await;
            let displaced = connections.insert(key.to_string(), connection);
            debug!(key, generation, live = connections.len(), "Connection registered");
            displaced
        };
        // A concurrent connect for the same key registered in between.
        if let Some(mut displaced) = displaced {
            warn!(
                key,
                generation = displaced.generation(),
                "Closing connection displaced by a concurrent connect"
            );
            displaced.close().await;
        }
        Ok(generation)
    }

    /// Tear down the connection for `key`, cancelling any pending reconnect
    /// and heartbeat. Returns whether anything was removed; unknown keys are
    /// a no-op.
    pub async fn disconnect(&self, key: &str) -> bool {
        let removed = self.connections.lock().await.remove(key);
        let Some(mut connection) = removed else {
            debug!(key, "Disconnect for unknown key ignored");
            return false;
        };
        connection.close().await;
        info!(key, generation = connection.generation(), "Connection removed");
        true
    }

    /// Like [`disconnect`](Self::disconnect), but only if the live
    /// connection is still `generation`. Leaves a replacement untouched.
    pub async fn disconnect_generation(&self, key: &str, generation: Generation) -> bool {
        let removed = {
            let mut connections = self.connections.lock().await;
            match connections.get(key) {
                Some(c) if c.generation() == generation => connections.remove(key),
                _ => None,
            }
        };
        let Some(mut connection) = removed else {
            return false;
        };
        connection.close().await;
        info!(key, generation, "Connection removed");
        true
    }

    /// Current state for `key`; `Disconnected` when nothing is registered.
    pub async fn state_of(&self, key: &str) -> ConnectionState {
        self.connections
            .lock()
            .await
            .get(key)
            .map(StreamConnection::state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub async fn generation_of(&self, key: &str) -> Option<Generation> {
        self.connections
            .lock()
            .await
            .get(key)
            .map(StreamConnection::generation)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.connections.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Close every connection.
    pub async fn disconnect_all(&self) {
        let drained: Vec<(String, StreamConnection)> =
            self.connections.lock().await.drain().collect();
        for (key, mut connection) in drained {
            connection.close().await;
            debug!(key = %key, "Connection removed during shutdown");
        }
    }
}
