//! Stream Pump
//!
//! Drives one provider stream on its own task and hands the caller a
//! [`StreamHandle`] over a bounded queue of [`StreamEvent`]s.
//!
//! # Lifecycle
//!
//! ```text
//!  start() ── resolve request ──► ValidationError (no task, no network)
//!     │
//!     ▼
//!  producer task
//!     open_stream ─► advance ─► send Delta ─► advance ─► ... ─► close adapter
//!                                                                 │
//!                              Done | Error(e) | (nothing if cancelled)
//! ```
//!
//! # Guarantees
//!
//! - Deltas arrive in the order the adapter produced them.
//! - Exactly one terminal event (`Done` or `Error`) ends a stream that was
//!   not cancelled; nothing follows it.
//! - Once cancellation is observed no further event is delivered, and the
//!   adapter is closed without waiting on the consumer.
//! - The deadline covers opening the request and reading the whole stream.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::provider::{ChatRequest, Provider, ResolvedRequest, StreamError, ValidationError};

/// Default capacity of the queue between producer and consumer
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

// ============================================================================
// Events and options
// ============================================================================

/// One event of a stream as seen by the consumer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// New text
    Delta(String),
    /// The stream finished successfully
    Done,
    /// The stream failed
    Error(StreamError),
}

impl StreamEvent {
    /// Whether this event ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta(_))
    }
}

/// Per-stream options
#[derive(Clone, Debug, Default)]
pub struct StreamOptions {
    /// Absolute deadline; the provider's timeout applies when unset
    pub deadline: Option<Instant>,
    /// Parent token; cancelling it cancels the stream
    pub cancel: Option<CancellationToken>,
    /// Queue capacity override
    pub queue_capacity: Option<usize>,
}

impl StreamOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an absolute deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline `timeout` from now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tie the stream to a parent cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Override the queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }
}

// ============================================================================
// Pump
// ============================================================================

/// Starts provider streams
#[derive(Clone, Debug)]
pub struct StreamPump {
    queue_capacity: usize,
}

impl Default for StreamPump {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl StreamPump {
    /// Pump with the default queue capacity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pump with a custom default queue capacity
    #[must_use]
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            queue_capacity: capacity.max(1),
        }
    }

    /// Default queue capacity
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Resolve `request` against `provider` and start streaming
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the request cannot be resolved; no
    /// task is spawned and nothing is sent in that case.
    pub fn start(
        &self,
        provider: Arc<dyn Provider>,
        request: &ChatRequest,
        options: StreamOptions,
    ) -> Result<StreamHandle, ValidationError> {
        let resolved = request.resolve(provider.name(), provider.defaults())?;

        let now = Instant::now();
        let deadline = options
            .deadline
            .unwrap_or_else(|| now + provider.defaults().timeout);
        let budget = deadline.saturating_duration_since(now);
        let cancel = options
            .cancel
            .map_or_else(CancellationToken::new, |parent| parent.child_token());
        let capacity = options
            .queue_capacity
            .unwrap_or(self.queue_capacity)
            .max(1);

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        let span = tracing::info_span!(
            "stream",
            id = %id,
            provider = %provider.name(),
            model = %resolved.model,
        );

        let producer = Producer {
            provider,
            request: resolved,
            deadline,
            budget,
            cancel: cancel.clone(),
            tx,
        };
        let task = tokio::spawn(producer.run().instrument(span));

        Ok(StreamHandle {
            id,
            rx,
            cancel,
            task: Some(task),
            finished: false,
        })
    }
}

// ============================================================================
// Producer task
// ============================================================================

struct Producer {
    provider: Arc<dyn Provider>,
    request: ResolvedRequest,
    deadline: Instant,
    budget: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<StreamEvent>,
}

impl Producer {
    async fn run(self) {
        let started = std::time::Instant::now();
        let sleep = tokio::time::sleep_until(self.deadline);
        tokio::pin!(sleep);

        tracing::debug!(timeout_secs = self.budget.as_secs(), "Opening stream");

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!("Stream cancelled before it opened");
                return;
            }
            () = &mut sleep => Err(StreamError::Timeout(self.budget)),
            result = self.provider.open_stream(&self.request) => result,
        };

        let mut adapter = match opened {
            Ok(adapter) => adapter,
            Err(err) => {
                self.deliver_terminal(Err(err), 0, started).await;
                return;
            }
        };

        let mut deltas = 0usize;
        let outcome = loop {
            let advanced = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break None,
                () = &mut sleep => break Some(Err(StreamError::Timeout(self.budget))),
                advanced = adapter.advance() => advanced,
            };
            if !advanced {
                break Some(adapter.err().cloned().map_or(Ok(()), Err));
            }

            let event = StreamEvent::Delta(adapter.current().to_string());
            let sent = tokio::select! {
                biased;
                () = self.cancel.cancelled() => false,
                () = &mut sleep => break Some(Err(StreamError::Timeout(self.budget))),
                result = self.tx.send(event) => result.is_ok(),
            };
            if !sent {
                break None;
            }
            deltas += 1;
        };

        adapter.close();
        drop(adapter);

        match outcome {
            Some(result) => self.deliver_terminal(result, deltas, started).await,
            None => tracing::debug!(deltas, "Stream cancelled"),
        }
    }

    async fn deliver_terminal(
        &self,
        result: Result<(), StreamError>,
        deltas: usize,
        started: std::time::Instant,
    ) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let event = match result {
            Ok(()) => {
                tracing::info!(deltas, elapsed_ms, "Stream finished");
                StreamEvent::Done
            }
            Err(err) => {
                tracing::warn!(deltas, elapsed_ms, error = %err, "Stream failed");
                StreamEvent::Error(err)
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {}
            _ = self.tx.send(event) => {}
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Consumer side of a running stream
///
/// Dropping the handle cancels the stream.
#[derive(Debug)]
pub struct StreamHandle {
    id: Uuid,
    rx: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

impl StreamHandle {
    /// Stream id, as recorded in log spans
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token that cancels this stream
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the stream was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next event; `None` once the stream is over or cancelled
    ///
    /// After a terminal event, and after cancellation is observed, every call
    /// returns `None`.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }

        let event = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        };

        match event {
            Some(event) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.discard();
                None
            }
        }
    }

    /// Cancel the stream and discard anything queued
    ///
    /// Returns immediately; the producer closes the adapter on its own task.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.discard();
    }

    fn discard(&mut self) {
        self.finished = true;
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    /// Cancel and wait for the producer task to exit
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Stream producer task failed");
            }
        }
    }

    /// Concatenate every delta until the terminal event
    ///
    /// # Errors
    ///
    /// Returns the stream's terminal error, or [`StreamError::Cancelled`] if
    /// the stream was cancelled first.
    pub async fn collect_text(mut self) -> Result<String, StreamError> {
        let mut text = String::new();
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Delta(delta) => text.push_str(&delta),
                StreamEvent::Done => return Ok(text),
                StreamEvent::Error(err) => return Err(err),
            }
        }
        Err(StreamError::Cancelled)
    }

    /// View the handle as a [`Stream`] of events
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send {
        futures::stream::unfold(self, |mut handle| async move {
            let event = handle.next().await?;
            Some((event, handle))
        })
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
