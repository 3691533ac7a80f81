//! Wire events consumed from the optimization stream.
//!
//! Every named SSE event is decoded into a [`StreamEvent`] variant with a
//! fixed schema. Decoding happens once, at the dispatch boundary; anything
//! that fails to decode is reported as a [`PayloadError`] and dropped by the
//! caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;
use crate::types::{BudgetUsage, Citation, StepStatus};

/// Wire names of the events this client understands.
pub mod names {
    pub const CONNECTING: &str = "connecting";
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const RECONNECTING: &str = "reconnecting";
    pub const GAVE_UP: &str = "gave_up";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const PROGRESS: &str = "progress";
    pub const VALIDATION: &str = "validation";
    pub const STEP: &str = "step";
    pub const TOKEN: &str = "token";
    pub const CITATIONS: &str = "citations";
    pub const USAGE: &str = "usage";
    pub const COMPLETE: &str = "complete";
    pub const ERROR: &str = "error_event";
    /// Default SSE event type when no `event:` field is sent.
    pub const MESSAGE: &str = "message";
}

/// A decoded stream event, either client-local lifecycle or server-sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Client-local: the transport is being opened.
    Connecting,
    /// Client-local: the transport is open.
    Connected,
    /// Client-local: the transport was closed.
    Disconnected,
    /// Client-local: a reconnect has been scheduled.
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// Client-local: the reconnect policy ran out of attempts.
    GaveUp { attempts: u32 },
    Heartbeat,
    Progress(ProgressPayload),
    Validation { payload: Value },
    Step(StepPayload),
    Token(TokenPayload),
    Citations(CitationsPayload),
    Usage(UsagePayload),
    Complete(CompletePayload),
    #[serde(rename = "error_event")]
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProgressPayload {
    /// Progress as a whole percentage in `0..=100`.
    pub fn percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepPayload {
    pub id: String,
    pub status: StepStatus,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(alias = "content")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationsPayload {
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// Usage block as sent by the server (`snake_case`, `credits` = used).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct UsagePayload {
    #[serde(default)]
    pub tokens_in: u64,
    #[serde(default)]
    pub tokens_out: u64,
    #[serde(default)]
    pub credits: f64,
    #[serde(default)]
    pub credits_max: Option<f64>,
}

impl From<UsagePayload> for BudgetUsage {
    fn from(u: UsagePayload) -> Self {
        BudgetUsage {
            tokens_in: u.tokens_in,
            tokens_out: u.tokens_out,
            credits_used: u.credits,
            credits_max: u.credits_max.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    #[serde(default)]
    pub quality_score: Option<f64>,
    pub optimized: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub diff_summary: Vec<Value>,
    #[serde(default)]
    pub usage: Option<UsagePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default = "default_error_message")]
    pub message: String,
}

fn default_error_message() -> String {
    "unknown server error".to_string()
}

impl StreamEvent {
    /// Decode a named wire event and its raw `data` body.
    ///
    /// Untyped events (`message`, or no name at all) must carry a JSON
    /// object with a `type` field naming the real event.
    pub fn decode(event_type: &str, data: &str) -> Result<Self, PayloadError> {
        match event_type {
            names::HEARTBEAT => Ok(StreamEvent::Heartbeat),
            "" | names::MESSAGE => {
                let value = parse_json(names::MESSAGE, data)?;
                let inner = value
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or(PayloadError::MissingType)?
                    .to_string();
                if inner == names::HEARTBEAT {
                    return Ok(StreamEvent::Heartbeat);
                }
                Self::from_value(&inner, value)
            }
            other => {
                if !is_server_event(other) {
                    return Err(PayloadError::UnknownEvent(other.to_string()));
                }
                let value = parse_json(other, data)?;
                Self::from_value(other, value)
            }
        }
    }

    fn from_value(name: &str, value: Value) -> Result<Self, PayloadError> {
        let invalid = |source| PayloadError::InvalidJson {
            event: name.to_string(),
            source,
        };
        let event = match name {
            names::PROGRESS => StreamEvent::Progress(serde_json::from_value(value).map_err(invalid)?),
            names::VALIDATION => StreamEvent::Validation { payload: value },
            names::STEP => StreamEvent::Step(serde_json::from_value(value).map_err(invalid)?),
            names::TOKEN => StreamEvent::Token(serde_json::from_value(value).map_err(invalid)?),
            names::CITATIONS => {
                let mut payload: CitationsPayload =
                    serde_json::from_value(value).map_err(invalid)?;
                payload.citations = payload
                    .citations
                    .into_iter()
                    .map(Citation::normalized)
                    .collect();
                StreamEvent::Citations(payload)
            }
            names::USAGE => StreamEvent::Usage(serde_json::from_value(value).map_err(invalid)?),
            names::COMPLETE => {
                let mut payload: CompletePayload =
                    serde_json::from_value(value).map_err(invalid)?;
                payload.citations = payload
                    .citations
                    .into_iter()
                    .map(Citation::normalized)
                    .collect();
                StreamEvent::Complete(payload)
            }
            names::ERROR => StreamEvent::Error(serde_json::from_value(value).map_err(invalid)?),
            other => return Err(PayloadError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }

    /// The wire name listeners register under.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Connecting => names::CONNECTING,
            StreamEvent::Connected => names::CONNECTED,
            StreamEvent::Disconnected => names::DISCONNECTED,
            StreamEvent::Reconnecting { .. } => names::RECONNECTING,
            StreamEvent::GaveUp { .. } => names::GAVE_UP,
            StreamEvent::Heartbeat => names::HEARTBEAT,
            StreamEvent::Progress(_) => names::PROGRESS,
            StreamEvent::Validation { .. } => names::VALIDATION,
            StreamEvent::Step(_) => names::STEP,
            StreamEvent::Token(_) => names::TOKEN,
            StreamEvent::Citations(_) => names::CITATIONS,
            StreamEvent::Usage(_) => names::USAGE,
            StreamEvent::Complete(_) => names::COMPLETE,
            StreamEvent::Error(_) => names::ERROR,
        }
    }

    /// Client-local lifecycle notifications, never sent by the server.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            StreamEvent::Connecting
                | StreamEvent::Connected
                | StreamEvent::Disconnected
                | StreamEvent::Reconnecting { .. }
                | StreamEvent::GaveUp { .. }
        )
    }

    /// Events that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error(_))
    }
}

fn is_server_event(name: &str) -> bool {
    matches!(
        name,
        names::PROGRESS
            | names::VALIDATION
            | names::STEP
            | names::TOKEN
            | names::CITATIONS
            | names::USAGE
            | names::COMPLETE
            | names::ERROR
    )
}

fn parse_json(event: &str, data: &str) -> Result<Value, PayloadError> {
    serde_json::from_str(data).map_err(|source| PayloadError::InvalidJson {
        event: event.to_string(),
        source,
    })
}
