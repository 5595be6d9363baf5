//! Stream adapter contract
//!
//! Every wire protocol is normalized into the same pull interface: call
//! [`StreamAdapter::advance`] until it returns `false`, reading
//! [`StreamAdapter::current`] after each `true`, then check
//! [`StreamAdapter::err`] to tell a clean finish from a failure.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::StreamError;

/// Raw response body chunks, already mapped to [`StreamError`]
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, StreamError>>;

/// Uniform pull interface over one provider response
///
/// Once `advance` has returned `false` it keeps returning `false`; no further
/// deltas follow a terminal state.
#[async_trait]
pub trait StreamAdapter: Send {
    /// Produce the next text delta; `false` once done, failed or exhausted
    async fn advance(&mut self) -> bool;

    /// Delta produced by the most recent successful `advance`
    fn current(&self) -> &str;

    /// Terminal error, if the stream failed
    fn err(&self) -> Option<&StreamError>;

    /// Release the underlying connection or worker
    ///
    /// Idempotent, and never waits on the network. Buffered events are
    /// discarded; `advance` returns `false` afterwards.
    fn close(&mut self);
}

/// Shared bookkeeping for adapters: current delta, terminal state
#[derive(Debug, Default)]
pub(crate) struct AdapterState {
    current: String,
    error: Option<StreamError>,
    finished: bool,
}

impl AdapterState {
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn current(&self) -> &str {
        &self.current
    }

    pub(crate) fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    /// Record a delta; always returns `true` for use as `advance`'s result
    pub(crate) fn emit(&mut self, delta: String) -> bool {
        self.current = delta;
        true
    }

    /// Enter the successful terminal state
    pub(crate) fn finish(&mut self) -> bool {
        self.finished = true;
        self.current.clear();
        false
    }

    /// Enter the failed terminal state; the first error wins
    pub(crate) fn fail(&mut self, error: StreamError) -> bool {
        if !self.finished {
            self.error = Some(error);
        }
        self.finish()
    }
}
