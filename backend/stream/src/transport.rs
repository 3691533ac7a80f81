//! Physical stream transports.
//!
//! A [`Transport`] opens one streaming request and yields decoded SSE frames
//! until the server closes the stream or the read fails. Reconnection,
//! heartbeats and dispatch all live above this seam.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::sse::{decode_stream, SseFrame};

/// Frames read from one open stream.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, TransportError>> + Send>>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Human-readable name of this transport.
    fn name(&self) -> &str;

    /// Open the stream at `url`. Resolves once the server has accepted it.
    async fn open(&self, url: &Url) -> Result<FrameStream, TransportError>;
}

/// SSE over HTTP(S) using `reqwest`.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, url: &Url) -> Result<FrameStream, TransportError> {
        // Errors are stripped of their URL so the token never leaks.
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        debug!(
            url = %logging::redact_url(url.as_str()),
            status = status.as_u16(),
            "Stream opened"
        );

        let bytes = response
            .bytes_stream()
            .map_err(|e| TransportError::Read(e.without_url().to_string()));
        Ok(Box::pin(decode_stream(bytes)))
    }
}
