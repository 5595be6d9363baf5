//! Server-sent event framing and the event-delta adapter
//!
//! Providers that stream `data: <json>` lines share the framing in
//! [`SseReader`]; what a JSON payload means is up to an [`SseDialect`].
//!
//! Framing rules:
//! - blank lines and lines that are not `data:` lines are skipped
//! - a `[DONE]` payload ends the stream successfully
//! - payloads that are not JSON are skipped, never fatal

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use super::adapter::{AdapterState, ByteStream, StreamAdapter};
use super::error::StreamError;
use super::lines::LineDecoder;

/// What one decoded event means for the stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialectEvent {
    /// Text carried by the event (a delta or a snapshot, per adapter)
    Text(String),
    /// Explicit end-of-message
    Done,
    /// The provider reported an error
    Error(String),
    /// Event with no text (pings, metadata, role headers)
    Ignore,
}

/// Maps a provider's JSON events onto [`DialectEvent`]s
pub trait SseDialect: Send {
    /// Interpret one parsed `data:` payload
    fn interpret(&self, event: &Value) -> DialectEvent;
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseFrame {
    Data(String),
    Done,
}

/// Pulls `data:` payloads out of a byte stream
pub(crate) struct SseReader {
    source: Option<ByteStream>,
    lines: LineDecoder,
}

impl SseReader {
    pub(crate) fn new(source: ByteStream) -> Self {
        Self {
            source: Some(source),
            lines: LineDecoder::new(),
        }
    }

    /// Next frame; `Ok(None)` at end of input
    pub(crate) async fn next_frame(&mut self) -> Result<Option<SseFrame>, StreamError> {
        loop {
            while let Some(line) = self.lines.next_line() {
                let Some(payload) = line.strip_prefix("data:") else {
                    continue;
                };
                let payload = payload.trim();
                if payload.is_empty() {
                    continue;
                }
                if payload == "[DONE]" {
                    return Ok(Some(SseFrame::Done));
                }
                return Ok(Some(SseFrame::Data(payload.to_string())));
            }

            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };
            match source.next().await {
                Some(Ok(chunk)) => self.lines.push(&chunk),
                Some(Err(err)) => {
                    self.close();
                    return Err(err);
                }
                None => {
                    self.source = None;
                    self.lines.finish();
                }
            }
        }
    }

    /// Drop the response body and anything buffered from it
    pub(crate) fn close(&mut self) {
        self.source = None;
        self.lines = LineDecoder::new();
    }
}

/// Decode the next payload that parses as JSON
pub(crate) async fn next_event(reader: &mut SseReader) -> Result<Option<SseEvent>, StreamError> {
    loop {
        match reader.next_frame().await? {
            None => return Ok(None),
            Some(SseFrame::Done) => return Ok(Some(SseEvent::Done)),
            Some(SseFrame::Data(payload)) => match serde_json::from_str::<Value>(&payload) {
                Ok(value) => return Ok(Some(SseEvent::Json(value))),
                Err(err) => {
                    tracing::trace!(error = %err, "Skipping malformed stream event");
                }
            },
        }
    }
}

pub(crate) enum SseEvent {
    Json(Value),
    Done,
}

// ============================================================================
// Event-delta adapter
// ============================================================================

/// Adapter for protocols where each event carries only the new fragment
pub struct EventDeltaAdapter<D> {
    reader: SseReader,
    dialect: D,
    state: AdapterState,
}

impl<D: SseDialect> EventDeltaAdapter<D> {
    /// Wrap a response body
    pub fn new(source: ByteStream, dialect: D) -> Self {
        Self {
            reader: SseReader::new(source),
            dialect,
            state: AdapterState::default(),
        }
    }
}

#[async_trait]
impl<D: SseDialect> StreamAdapter for EventDeltaAdapter<D> {
    async fn advance(&mut self) -> bool {
        if self.state.is_finished() {
            return false;
        }

        loop {
            let event = match next_event(&mut self.reader).await {
                Ok(Some(SseEvent::Json(value))) => value,
                Ok(Some(SseEvent::Done) | None) => {
                    self.reader.close();
                    return self.state.finish();
                }
                Err(err) => {
                    self.reader.close();
                    return self.state.fail(err);
                }
            };

            match self.dialect.interpret(&event) {
                DialectEvent::Text(delta) if !delta.is_empty() => return self.state.emit(delta),
                DialectEvent::Text(_) | DialectEvent::Ignore => {}
                DialectEvent::Done => {
                    self.reader.close();
                    return self.state.finish();
                }
                DialectEvent::Error(message) => {
                    self.reader.close();
                    return self.state.fail(StreamError::Provider(message));
                }
            }
        }
    }

    fn current(&self) -> &str {
        self.state.current()
    }

    fn err(&self) -> Option<&StreamError> {
        self.state.error()
    }

    fn close(&mut self) {
        self.reader.close();
        self.state.finish();
    }
}
