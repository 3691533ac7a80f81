//! In-memory transport for tests.
//!
//! Each `open` pops the next scripted outcome: a refusal, a handshake that
//! never answers, or a queued stream. A queued stream is fed from
//! the test through a [`StreamFeed`]; with nothing queued, `open` succeeds
//! with a stream that stays silent forever.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;

use crate::error::TransportError;
use crate::sse::{SseEvent, SseFrame};
use crate::transport::{FrameStream, Transport};

enum Scripted {
    Refuse(TransportError),
    /// Accept the connection but never answer the handshake.
    Hang,
    Stream(mpsc::UnboundedReceiver<Result<SseFrame, TransportError>>),
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    opened: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a stream for the next `open` and return its feed.
    pub fn push_stream(&self) -> StreamFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_script().push_back(Scripted::Stream(rx));
        StreamFeed { tx }
    }

    /// Make the next `open` fail.
    pub fn push_refusal(&self, error: TransportError) {
        self.lock_script().push_back(Scripted::Refuse(error));
    }

    /// Make the next `open` never resolve.
    pub fn push_hang(&self) {
        self.lock_script().push_back(Scripted::Hang);
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn opened_urls(&self) -> Vec<Url> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self, url: &Url) -> Result<FrameStream, TransportError> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.clone());
        }
        let next = self.lock_script().pop_front();
        match next {
            Some(Scripted::Refuse(error)) => Err(error),
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Stream(rx)) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
            None => Ok(Box::pin(futures::stream::pending::<
                Result<SseFrame, TransportError>,
            >())),
        }
    }
}

/// Test-side handle for pushing frames into a scripted stream. Dropping it
/// ends the stream.
#[derive(Clone)]
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Result<SseFrame, TransportError>>,
}

impl StreamFeed {
    pub fn event(&self, name: &str, data: &str) {
        let _ = self.tx.send(Ok(SseFrame::Event(SseEvent {
            event: Some(name.to_string()),
            data: data.to_string(),
            id: None,
            retry: None,
        })));
    }

    pub fn comment(&self, text: &str) {
        let _ = self.tx.send(Ok(SseFrame::Comment(text.to_string())));
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }
}
