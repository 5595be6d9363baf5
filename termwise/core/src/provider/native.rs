//! Native pull-iterator adapter
//!
//! Some backends are easiest to consume as a stream of already-decoded
//! events. The adapter drives that stream on a worker task that forwards into
//! a bounded queue, so a slow consumer applies backpressure all the way to the
//! socket.
//!
//! ```text
//!   source stream ──► worker task ──► mpsc (32) ──► advance()
//!                        ▲
//!        close() ────────┘ cancel: worker stops, source is dropped
//! ```
//!
//! Closing never waits for the worker: the token is cancelled, the queue is
//! closed and drained, and the worker observes the cancellation on its next
//! poll.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::adapter::{AdapterState, StreamAdapter};
use super::error::StreamError;

/// Capacity of the queue between the worker and the consumer
pub const NATIVE_QUEUE_CAPACITY: usize = 32;

/// One decoded event from a native source
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeEvent {
    /// New text
    Delta(String),
    /// The backend signalled completion
    Done,
}

/// Decoded events produced by a backend
pub type NativeSource = BoxStream<'static, Result<NativeEvent, StreamError>>;

type Item = Result<NativeEvent, StreamError>;

/// Adapter over a [`NativeSource`] driven on its own task
pub struct NativeStreamAdapter {
    rx: mpsc::Receiver<Item>,
    cancel: CancellationToken,
    state: AdapterState,
}

impl NativeStreamAdapter {
    /// Start driving `source` with the default queue capacity
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(source: NativeSource) -> Self {
        Self::with_capacity(source, NATIVE_QUEUE_CAPACITY)
    }

    /// Start driving `source` with a custom queue capacity
    #[must_use]
    pub fn with_capacity(source: NativeSource, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        tokio::spawn(forward(source, tx, cancel.clone()));

        Self {
            rx,
            cancel,
            state: AdapterState::default(),
        }
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

async fn forward(mut source: NativeSource, tx: mpsc::Sender<Item>, cancel: CancellationToken) {
    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = source.next() => item,
        };
        let Some(item) = item else {
            break;
        };

        let terminal = !matches!(item, Ok(NativeEvent::Delta(_)));
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            result = tx.send(item) => result.is_ok(),
        };
        if !sent || terminal {
            break;
        }
    }
    tracing::trace!(cancelled = cancel.is_cancelled(), "Native stream worker exiting");
}

#[async_trait]
impl StreamAdapter for NativeStreamAdapter {
    async fn advance(&mut self) -> bool {
        if self.state.is_finished() {
            return false;
        }

        loop {
            match self.rx.recv().await {
                Some(Ok(NativeEvent::Delta(delta))) => {
                    if !delta.is_empty() {
                        return self.state.emit(delta);
                    }
                }
                Some(Ok(NativeEvent::Done)) | None => {
                    self.shutdown();
                    return self.state.finish();
                }
                Some(Err(err)) => {
                    self.shutdown();
                    return self.state.fail(err);
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
        self.shutdown();
        self.state.finish();
    }
}

impl Drop for NativeStreamAdapter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
