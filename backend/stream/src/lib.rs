//! `promptcraft-stream`: the streaming side of the client: SSE decoding,
//! transports, self-reconnecting connections with heartbeat supervision,
//! the keyed connection registry, and typed event dispatch.

pub mod backoff;
pub mod connection;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod heartbeat;
pub mod registry;
pub mod sse;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use backoff::{ReconnectPolicy, ReconnectState};
pub use connection::{
    ConnectOptions, ConnectionNotice, ConnectionStatus, NoticeSink, StreamConnection,
};
pub use dispatcher::{EventDispatcher, Listener, ListenerId};
pub use endpoint::{Credential, StreamEndpoint, TOKEN_PARAM};
pub use error::{EndpointError, TransportError};
pub use heartbeat::{HeartbeatMonitor, DEFAULT_HEARTBEAT_TIMEOUT};
pub use registry::{ConnectionRegistry, Generation};
pub use sse::{decode_stream, SseDecoder, SseEvent, SseFrame};
pub use transport::{FrameStream, HttpTransport, Transport};
