//! Incremental Server-Sent Events decoder.
//!
//! Bytes arrive in arbitrary chunks; lines are split on `\n` (a trailing
//! `\r` is dropped) and fields are accumulated until a blank line ends the
//! event. Comment lines are surfaced separately because they still prove
//! the connection is alive. A line longer than the decoder's limit is a
//! read error, so a server that never sends `\n` cannot grow the buffer
//! without bound.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use promptcraft_core::names;

use crate::error::TransportError;

/// Longest line the decoder will buffer, in bytes.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// One assembled SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<u64>,
}

impl SseEvent {
    /// The event name, defaulting to `message` like browsers do.
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or(names::MESSAGE)
    }
}

/// Something the decoder produced from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Event(SseEvent),
    Comment(String),
}

#[derive(Debug)]
pub struct SseDecoder {
    max_line: usize,
    pending: Vec<u8>,
    data: Vec<String>,
    event: Option<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            max_line,
            pending: Vec::new(),
            data: Vec::new(),
            event: None,
            id: None,
            retry: None,
        }
    }

    /// Feed one chunk and return every frame it completed. Fails once a
    /// line exceeds the limit; the decoder is cleared and the stream should
    /// be dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, TransportError> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        // `\n` never occurs inside a multi-byte UTF-8 sequence, so splitting
        // on it before decoding is safe.
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            if end > self.max_line {
                return Err(self.overflow());
            }
            let mut line: Vec<u8> = self.pending.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.line(&line) {
                frames.push(frame);
            }
        }
        if self.pending.len() > self.max_line {
            return Err(self.overflow());
        }
        Ok(frames)
    }

    fn overflow(&mut self) -> TransportError {
        let len = self.pending.len();
        *self = Self::with_max_line(self.max_line);
        TransportError::Read(format!(
            "SSE line exceeds {} bytes ({len} buffered)",
            self.max_line
        ))
    }

    fn line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.finish_event();
        }
        if let Some(comment) = line.strip_prefix(':') {
            return Some(SseFrame::Comment(comment.trim_start().to_string()));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.trim().parse() {
                    self.retry = Some(ms);
                }
            }
            _ => {}
        }
        None
    }

    fn finish_event(&mut self) -> Option<SseFrame> {
        // A named event with no data still counts (`event: heartbeat`).
        if self.data.is_empty() && self.event.is_none() {
            self.id = None;
            self.retry = None;
            return None;
        }
        let event = SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.take(),
            retry: self.retry.take(),
        };
        Some(SseFrame::Event(event))
    }
}

/// Adapt a byte stream into a stream of decoded frames.
///
/// An event left unterminated when the byte stream ends is discarded.
pub fn decode_stream<S>(bytes: S) -> impl Stream<Item = Result<SseFrame, TransportError>>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
{
    decode_stream_with(bytes, SseDecoder::new())
}

pub fn decode_stream_with<S>(
    bytes: S,
    mut decoder: SseDecoder,
) -> impl Stream<Item = Result<SseFrame, TransportError>>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
{
    bytes.flat_map(move |chunk| {
        let frames: Vec<Result<SseFrame, TransportError>> =
            match chunk.and_then(|bytes| decoder.feed(&bytes)) {
                Ok(frames) => frames.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
        futures::stream::iter(frames)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: Option<&str>, data: &str) -> SseFrame {
        SseFrame::Event(SseEvent {
            event: name.map(String::from),
            data: data.to_string(),
            id: None,
            retry: None,
        })
    }

    #[test]
    fn decodes_named_event() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"event: token\ndata: {\"text\":\"Hel\"}\n\n").unwrap();
        assert_eq!(frames, vec![event(Some("token"), "{\"text\":\"Hel\"}")]);
    }

    #[test]
    fn joins_multiline_data() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"data: one\ndata: two\n\n").unwrap();
        assert_eq!(frames, vec![event(None, "one\ntwo")]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"eve").unwrap().is_empty());
        assert!(d.feed(b"nt: progress\r\nda").unwrap().is_empty());
        assert!(d.feed(b"ta: {}\r\n").unwrap().is_empty());
        let frames = d.feed(b"\r\n").unwrap();
        assert_eq!(frames, vec![event(Some("progress"), "{}")]);
    }

    #[test]
    fn utf8_sequence_split_across_chunks() {
        let mut d = SseDecoder::new();
        let bytes = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte `é`.
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(d.feed(&bytes[..split]).unwrap().is_empty());
        assert_eq!(d.feed(&bytes[split..]).unwrap(), vec![event(None, "héllo")]);
    }

    #[test]
    fn comments_are_surfaced() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b": keepalive\n\n").unwrap();
        assert_eq!(frames, vec![SseFrame::Comment("keepalive".into())]);
    }

    #[test]
    fn named_event_without_data_is_emitted() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"event: heartbeat\n\n").unwrap();
        assert_eq!(frames, vec![event(Some("heartbeat"), "")]);
    }

    #[test]
    fn id_and_retry_fields_are_captured() {
        let mut d = SseDecoder::new();
        let frames = d.feed(b"id: 7\nretry: 2500\nevent: step\ndata: {}\n\n").unwrap();
        assert_eq!(
            frames,
            vec![SseFrame::Event(SseEvent {
                event: Some("step".into()),
                data: "{}".into(),
                id: Some("7".into()),
                retry: Some(2500),
            })]
        );
    }

    #[test]
    fn blank_lines_alone_emit_nothing() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn default_event_type_is_message() {
        assert_eq!(SseEvent::default().event_type(), "message");
    }

    #[tokio::test]
    async fn stream_adapter_drops_unterminated_tail() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"event: token\ndata: {\"text\":\"a\"}\n\n")),
            Ok(Bytes::from_static(b"event: token\ndata: {\"text\":\"b\"}\n")),
        ];
        let frames: Vec<_> = decode_stream(futures::stream::iter(chunks))
            .collect::<Vec<_>>()
            .await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], Ok(event(Some("token"), "{\"text\":\"a\"}")));
    }

    #[test]
    fn oversized_line_is_a_read_error() {
        let mut d = SseDecoder::with_max_line(16);
        assert!(d.feed(b"data: short\n").unwrap().is_empty());
        let err = d.feed(&[b'x'; 32]).unwrap_err();
        assert!(matches!(err, TransportError::Read(msg) if msg.contains("16 bytes")));

        // The decoder starts over cleanly afterwards.
        assert_eq!(d.feed(b"data: ok\n\n").unwrap(), vec![event(None, "ok")]);
    }

    #[test]
    fn oversized_terminated_line_is_rejected() {
        let mut d = SseDecoder::with_max_line(16);
        let mut chunk = b"data: ".to_vec();
        chunk.extend_from_slice(&[b'y'; 40]);
        chunk.extend_from_slice(b"\n\n");
        assert!(d.feed(&chunk).is_err());
    }

    #[tokio::test]
    async fn stream_adapter_surfaces_oversized_line() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"event: token\ndata: {\"text\":\"a\"}\n\n")),
            Ok(Bytes::from(vec![b'z'; 64])),
        ];
        let frames: Vec<_> =
            decode_stream_with(futures::stream::iter(chunks), SseDecoder::with_max_line(32))
                .collect::<Vec<_>>()
                .await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Ok(event(Some("token"), "{\"text\":\"a\"}")));
        assert!(matches!(frames[1], Err(TransportError::Read(_))));
    }
}
