//! Per-session event pump.
//!
//! Drains one connection's notices in arrival order, turns them into typed
//! events and hands them to the session's dispatcher. The dispatcher's
//! first listener folds each event into the published [`AgentSession`] and
//! reports it to the caller. When the session turns terminal the pump
//! tears down its own connection generation.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use logging::{SessionEvent, SessionEventLogger};
use promptcraft_core::{AgentSession, Applied, SessionPhase, StreamEvent};
use promptcraft_stream::{ConnectionNotice, ConnectionRegistry, EventDispatcher, Generation};

use crate::session_manager::{EventCallback, SessionUpdate};

pub(crate) struct SessionPump {
    key: String,
    generation: Generation,
    registry: Arc<ConnectionRegistry>,
    state: Arc<watch::Sender<AgentSession>>,
    dispatcher: EventDispatcher,
    notices: mpsc::UnboundedReceiver<ConnectionNotice>,
}

impl SessionPump {
    pub(crate) fn new(
        key: &str,
        generation: Generation,
        registry: Arc<ConnectionRegistry>,
        state: Arc<watch::Sender<AgentSession>>,
        notices: mpsc::UnboundedReceiver<ConnectionNotice>,
        on_event: Option<EventCallback>,
    ) -> Self {
        let mut dispatcher = EventDispatcher::new(key);

        let listener_state = Arc::clone(&state);
        let listener_key = key.to_string();
        dispatcher.on_any(move |event: &StreamEvent| {
            let mut applied = Applied::Updated;
            listener_state.send_if_modified(|session| {
                applied = session.apply(event);
                !matches!(applied, Applied::Ignored(_))
            });
            if let Some(callback) = &on_event {
                let update = SessionUpdate {
                    key: listener_key.clone(),
                    event: event.clone(),
                    applied,
                    snapshot: listener_state.borrow().clone(),
                };
                callback(&update);
            }
            Ok(())
        });

        Self {
            key: key.to_string(),
            generation,
            registry,
            state,
            dispatcher,
            notices,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(notice) = self.notices.recv().await {
            let was_terminal = self.state.borrow().is_terminal();
            self.handle(notice);
            let now_terminal = self.state.borrow().is_terminal();
            if now_terminal && !was_terminal {
                self.finish().await;
            }
        }
        debug!(key = %self.key, generation = self.generation, "Session pump stopped");
    }

    fn handle(&mut self, notice: ConnectionNotice) {
        let event = match notice {
            ConnectionNotice::Opening => StreamEvent::Connecting,
            ConnectionNotice::Opened => StreamEvent::Connected,
            ConnectionNotice::Reconnecting { attempt, delay_ms } => {
                StreamEvent::Reconnecting { attempt, delay_ms }
            }
            ConnectionNotice::GaveUp { attempts } => StreamEvent::GaveUp { attempts },
            ConnectionNotice::Closed => StreamEvent::Disconnected,
            ConnectionNotice::Errored(cause) => {
                // Absorbed here; the caller only ever sees `reconnecting`.
                debug!(key = %self.key, error = %cause, "Transport error");
                return;
            }
            ConnectionNotice::Message(raw) => {
                match self.dispatcher.decode(raw.event_type(), &raw.data) {
                    Ok(event) => event,
                    Err(e) => {
                        SessionEventLogger::log_event(
                            &self.key,
                            SessionEvent::PayloadDropped {
                                event_type: raw.event_type().to_string(),
                                reason: e.to_string(),
                            },
                        );
                        return;
                    }
                }
            }
        };
        self.dispatcher.dispatch_event(&event);
    }

    async fn finish(&mut self) {
        let outcome = {
            let session = self.state.borrow();
            match session.phase {
                SessionPhase::Complete => SessionEvent::Completed {
                    output_chars: session.accumulated_output.chars().count(),
                    quality_score: session.quality_score,
                },
                _ => SessionEvent::Failed {
                    error: session.error.clone().unwrap_or_default(),
                },
            }
        };
        SessionEventLogger::log_event(&self.key, outcome);
        self.registry
            .disconnect_generation(&self.key, self.generation)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptcraft_core::SessionMode;
    use promptcraft_stream::test_support::ScriptedTransport;
    use promptcraft_stream::{ConnectOptions, StreamEndpoint};

    #[tokio::test(start_paused = true)]
    async fn spawned_pump_tears_down_its_connection_on_failure() {
        let transport = ScriptedTransport::new();
        let feed = transport.push_stream();
        let registry = Arc::new(ConnectionRegistry::new(
            transport,
            ConnectOptions::default(),
        ));
        let endpoint = StreamEndpoint::new("http://localhost:8000/api", "s1").unwrap();
        let (sink, notices) = mpsc::unbounded_channel();
        let generation = registry.connect("s1", &endpoint, None, sink).await.unwrap();

        let mut session = AgentSession::new("s1", SessionMode::Standard, "");
        session.start();
        let (state, mut rx) = watch::channel(session);
        let pump = SessionPump::new(
            "s1",
            generation,
            Arc::clone(&registry),
            Arc::new(state),
            notices,
            None,
        );
        let handle = tokio::spawn(pump.run());

        feed.event("error_event", r#"{"message":"quota exceeded"}"#);
        let failed = rx.wait_for(|s| s.is_terminal()).await.unwrap().clone();
        assert_eq!(failed.phase, SessionPhase::Failed);

        // Teardown closes the connection, which drops the sink and ends the pump.
        handle.await.unwrap();
        assert!(registry.is_empty().await);
    }
}
