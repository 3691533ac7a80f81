//! Session Event Logger
//!
//! One structured record per session outcome, emitted under the
//! `session_events` target so it can be filtered or routed separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::{redact_sensitive_data, redact_url};

pub const SESSION_EVENTS_TARGET: &str = "session_events";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        mode: String,
        endpoint: String,
    },
    Completed {
        output_chars: usize,
        quality_score: Option<f64>,
    },
    Failed {
        error: String,
    },
    Cancelled,
    PayloadDropped {
        event_type: String,
        reason: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SessionLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: SessionEvent,
}

impl SessionLogEntry {
    /// Build an entry with every free-text field scrubbed.
    pub fn new(session_id: &str, mut event: SessionEvent) -> Self {
        match &mut event {
            SessionEvent::Started { endpoint, .. } => *endpoint = redact_url(endpoint),
            SessionEvent::Failed { error } => *error = redact_sensitive_data(error),
            SessionEvent::PayloadDropped { reason, .. } => {
                *reason = redact_sensitive_data(reason)
            }
            SessionEvent::Completed { .. } | SessionEvent::Cancelled => {}
        }
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct SessionEventLogger;

impl SessionEventLogger {
    pub fn log_event(session_id: &str, event: SessionEvent) {
        let entry = SessionLogEntry::new(session_id, event);
        let record = serde_json::to_string(&entry).unwrap_or_default();
        info!(
            target: SESSION_EVENTS_TARGET,
            session_id = %entry.session_id,
            record = %record,
            "Session event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_endpoint_is_redacted() {
        let entry = SessionLogEntry::new(
            "s1",
            SessionEvent::Started {
                mode: "standard".into(),
                endpoint: "http://h/stream/s1/?token=secret".into(),
            },
        );
        match entry.event {
            SessionEvent::Started { endpoint, .. } => {
                assert_eq!(endpoint, "http://h/stream/s1/?token=[REDACTED]")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let entry = SessionLogEntry::new(
            "s1",
            SessionEvent::PayloadDropped {
                event_type: "token".into(),
                reason: "invalid JSON".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["event"]["type"], "payload_dropped");
        assert_eq!(json["event"]["event_type"], "token");
    }

    #[test]
    fn failure_text_is_scrubbed() {
        let entry = SessionLogEntry::new(
            "s1",
            SessionEvent::Failed {
                error: "Bearer abcdefghijklmnop refused".into(),
            },
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("abcdefghijklmnop"));
    }

    #[test]
    fn log_event_does_not_panic_without_subscriber() {
        SessionEventLogger::log_event("s1", SessionEvent::Cancelled);
    }
}
