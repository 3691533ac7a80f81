use thiserror::Error;

/// Why a wire event could not be turned into a [`crate::StreamEvent`].
///
/// Always recoverable: the event is logged and dropped.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("unknown event type `{0}`")]
    UnknownEvent(String),

    #[error("event `{event}` carries invalid JSON: {source}")]
    InvalidJson {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("untyped message has no `type` field")]
    MissingType,
}
