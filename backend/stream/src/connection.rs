//! One physical, self-reconnecting stream connection.
//!
//! [`StreamConnection::open`] spawns a task that owns the transport, the
//! heartbeat deadline and the backoff timer. Everything it observes is
//! reported as a [`ConnectionNotice`] on the caller's sink, in order.
//! Closing the handle stops the task and waits for it, so once
//! [`StreamConnection::close`] returns no socket or timer is left behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use promptcraft_core::ConnectionState;

use crate::backoff::{ReconnectPolicy, ReconnectState};
use crate::error::TransportError;
use crate::heartbeat::{HeartbeatMonitor, DEFAULT_HEARTBEAT_TIMEOUT};
use crate::sse::{SseEvent, SseFrame};
use crate::transport::Transport;

/// Per-connection behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub policy: ReconnectPolicy,
    pub heartbeat_timeout: Duration,
    /// When false, the first transport error gives up and closes the
    /// connection for good.
    pub auto_reconnect: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            auto_reconnect: true,
        }
    }
}

/// Lifecycle notifications emitted by a connection, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionNotice {
    Opening,
    Opened,
    Message(SseEvent),
    Errored(TransportError),
    Reconnecting { attempt: u32, delay_ms: u64 },
    GaveUp { attempts: u32 },
    /// Always the last notice a connection sends.
    Closed,
}

pub type NoticeSink = mpsc::UnboundedSender<ConnectionNotice>;

/// Point-in-time view of a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempt: u32,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            attempt: 0,
            last_activity_at: None,
        }
    }
}

/// Handle to a running connection task.
pub struct StreamConnection {
    key: String,
    generation: u64,
    status: watch::Receiver<ConnectionStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StreamConnection {
    /// Spawn the connection task. Must be called inside a Tokio runtime.
    pub fn open(
        key: impl Into<String>,
        url: Url,
        transport: Arc<dyn Transport>,
        options: ConnectOptions,
        sink: NoticeSink,
        generation: u64,
    ) -> Self {
        let key = key.into();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = ConnectionTask {
            key: key.clone(),
            url,
            transport,
            options,
            sink,
            status: status_tx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            key,
            generation,
            status: status_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    /// Stop the connection and wait for its task to finish. Safe to call
    /// repeatedly and at any point (mid-open, mid-backoff, mid-stream).
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(key = %self.key, error = %e, "Connection task ended abnormally");
                }
            }
        }
    }
}

struct ConnectionTask {
    key: String,
    url: Url,
    transport: Arc<dyn Transport>,
    options: ConnectOptions,
    sink: NoticeSink,
    status: watch::Sender<ConnectionStatus>,
    shutdown: oneshot::Receiver<()>,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut reconnect = ReconnectState::default();
        let mut heartbeat = HeartbeatMonitor::new(self.options.heartbeat_timeout);
        let endpoint = logging::redact_url(self.url.as_str());

        'connection: loop {
            self.set_state(ConnectionState::Connecting, reconnect.attempt);
            self.notify(ConnectionNotice::Opening);
            debug!(key = %self.key, url = %endpoint, attempt = reconnect.attempt, "Opening stream");

            // The handshake is held to the same deadline as an open stream.
            heartbeat.arm();
            let opened = tokio::select! {
                biased;
                _ = &mut self.shutdown => break 'connection,
                _ = heartbeat.expired() => {
                    Err(TransportError::HeartbeatTimeout(heartbeat.timeout()))
                }
                result = self.transport.open(&self.url) => result,
            };

            let cause = match opened {
                Ok(mut frames) => {
                    reconnect.reset();
                    heartbeat.arm();
                    self.set_state(ConnectionState::Connected, 0);
                    self.touch();
                    info!(key = %self.key, url = %endpoint, "Stream connected");
                    self.notify(ConnectionNotice::Opened);

                    let cause = loop {
                        tokio::select! {
                            biased;
                            _ = &mut self.shutdown => {
                                heartbeat.disarm();
                                break 'connection;
                            }
                            _ = heartbeat.expired() => {
                                break TransportError::HeartbeatTimeout(heartbeat.timeout());
                            }
                            frame = frames.next() => match frame {
                                Some(Ok(frame)) => {
                                    heartbeat.touch();
                                    self.touch();
                                    if let SseFrame::Event(event) = frame {
                                        self.notify(ConnectionNotice::Message(event));
                                    }
                                }
                                Some(Err(e)) => break e,
                                None => break TransportError::Closed,
                            },
                        }
                    };
                    heartbeat.disarm();
                    cause
                }
                Err(e) => {
                    heartbeat.disarm();
                    e
                }
            };

            warn!(key = %self.key, error = %cause, "Stream connection lost");
            self.set_state(ConnectionState::Erroring, reconnect.attempt);
            self.notify(ConnectionNotice::Errored(cause));

            if !self.options.auto_reconnect {
                debug!(key = %self.key, "Auto-reconnect disabled; closing");
                self.notify(ConnectionNotice::GaveUp { attempts: 0 });
                break;
            }
            let Some(delay) = reconnect.record_failure(&self.options.policy) else {
                self.notify(ConnectionNotice::GaveUp {
                    attempts: reconnect.attempt,
                });
                break;
            };
            info!(
                key = %self.key,
                attempt = reconnect.attempt,
                delay_ms = reconnect.next_delay_ms,
                "Scheduling reconnect"
            );
            self.notify(ConnectionNotice::Reconnecting {
                attempt: reconnect.attempt,
                delay_ms: reconnect.next_delay_ms,
            });

            tokio::select! {
                biased;
                _ = &mut self.shutdown => break 'connection,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected, reconnect.attempt);
        debug!(key = %self.key, "Stream closed");
        self.notify(ConnectionNotice::Closed);
    }

    fn notify(&self, notice: ConnectionNotice) {
        if self.sink.send(notice).is_err() {
            debug!(key = %self.key, "Notice sink dropped");
        }
    }

    fn set_state(&self, state: ConnectionState, attempt: u32) {
        self.status.send_modify(|s| {
            s.state = state;
            s.attempt = attempt;
        });
    }

    fn touch(&self) {
        self.status.send_modify(|s| s.last_activity_at = Some(Utc::now()));
    }
}
