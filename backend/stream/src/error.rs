use std::time::Duration;

use thiserror::Error;

/// A fault on the physical stream. Always recovered by reconnecting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("stream closed by server")]
    Closed,

    #[error("no activity within {0:?}")]
    HeartbeatTimeout(Duration),
}

/// The stream URL could not be built from its parts.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid base url `{url}`: {source}")]
    InvalidBase {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base url `{0}` cannot carry a path")]
    CannotBeABase(String),

    #[error("stream resource id is empty")]
    EmptyResource,
}
