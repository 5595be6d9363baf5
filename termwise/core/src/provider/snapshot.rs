//! Cumulative-snapshot adapter
//!
//! Some backends resend the whole response on every event. The adapter keeps
//! the previous snapshot and only emits the new suffix, so callers see the
//! same delta stream as with any other provider.
//!
//! ```text
//! snapshot:  "Hello"   "Hello world"   "Hello world"
//! emitted:   "Hello"   " world"        (nothing)
//! ```

use async_trait::async_trait;

use super::adapter::{AdapterState, ByteStream, StreamAdapter};
use super::error::StreamError;
use super::sse::{next_event, DialectEvent, SseDialect, SseEvent, SseReader};

/// Turns successive full snapshots into deltas
#[derive(Debug, Default)]
pub(crate) struct SnapshotDiff {
    previous: String,
}

impl SnapshotDiff {
    /// Delta for `snapshot`; `None` when nothing new arrived
    ///
    /// A snapshot that does not extend the previous one is emitted whole.
    pub(crate) fn delta(&mut self, snapshot: String) -> Option<String> {
        let delta = if let Some(suffix) = snapshot.strip_prefix(self.previous.as_str()) {
            suffix.to_string()
        } else {
            tracing::warn!(
                previous_len = self.previous.len(),
                snapshot_len = snapshot.len(),
                "Snapshot does not extend the previous one, emitting it whole"
            );
            snapshot.clone()
        };
        self.previous = snapshot;

        if delta.is_empty() {
            None
        } else {
            Some(delta)
        }
    }
}

/// Adapter for protocols where each event carries the full response so far
pub struct SnapshotAdapter<D> {
    reader: SseReader,
    dialect: D,
    diff: SnapshotDiff,
    state: AdapterState,
}

impl<D: SseDialect> SnapshotAdapter<D> {
    /// Wrap a response body
    pub fn new(source: ByteStream, dialect: D) -> Self {
        Self {
            reader: SseReader::new(source),
            dialect,
            diff: SnapshotDiff::default(),
            state: AdapterState::default(),
        }
    }
}

#[async_trait]
impl<D: SseDialect> StreamAdapter for SnapshotAdapter<D> {
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
                DialectEvent::Text(snapshot) => {
                    if let Some(delta) = self.diff.delta(snapshot) {
                        return self.state.emit(delta);
                    }
                }
                DialectEvent::Ignore => {}
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
