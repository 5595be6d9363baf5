//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;

use crate::provider::{
    ByteStream, Provider, ProviderDefaults, ProviderKind, ResolvedRequest, StreamAdapter,
    StreamError,
};

/// Byte stream yielding `chunks` in order
pub fn byte_stream(chunks: Vec<Result<Vec<u8>, StreamError>>) -> ByteStream {
    futures::stream::iter(chunks).boxed()
}

/// Advance until terminal, returning every delta and the terminal error
pub async fn drain<A: StreamAdapter + ?Sized>(adapter: &mut A) -> (Vec<String>, Option<StreamError>) {
    let mut deltas = Vec::new();
    while adapter.advance().await {
        deltas.push(adapter.current().to_string());
    }
    (deltas, adapter.err().cloned())
}

/// One scripted adapter step
#[derive(Clone, Debug)]
pub enum Step {
    /// Produce a delta
    Delta(String),
    /// Wait before the next step
    Sleep(Duration),
    /// Fail with an error
    Fail(StreamError),
    /// Never produce anything again
    Hang,
}

/// Adapter that replays a script
pub struct ScriptedAdapter {
    steps: VecDeque<Step>,
    current: String,
    error: Option<StreamError>,
    finished: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl StreamAdapter for ScriptedAdapter {
    async fn advance(&mut self) -> bool {
        loop {
            if self.finished {
                return false;
            }
            match self.steps.pop_front() {
                Some(Step::Delta(delta)) => {
                    self.current = delta;
                    return true;
                }
                Some(Step::Sleep(duration)) => tokio::time::sleep(duration).await,
                Some(Step::Fail(err)) => {
                    self.error = Some(err);
                    self.finished = true;
                }
                Some(Step::Hang) => futures::future::pending::<()>().await,
                None => self.finished = true,
            }
        }
    }

    fn current(&self) -> &str {
        &self.current
    }

    fn err(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.finished = true;
        self.steps.clear();
    }
}

/// Provider whose streams replay a fixed script
pub struct ScriptedProvider {
    id: String,
    defaults: ProviderDefaults,
    steps: Vec<Step>,
    open_error: Option<StreamError>,
    open_delay: Option<Duration>,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    last_request: Mutex<Option<ResolvedRequest>>,
}

impl ScriptedProvider {
    /// Default model reported by scripted providers
    pub const MODEL: &'static str = "scripted-model";

    /// Provider replaying `steps`
    pub fn new(id: &str, steps: Vec<Step>) -> Self {
        Self {
            id: id.to_string(),
            defaults: ProviderDefaults {
                model: Self::MODEL.to_string(),
                ..ProviderDefaults::default()
            },
            steps,
            open_error: None,
            open_delay: None,
            opens: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            last_request: Mutex::new(None),
        }
    }

    /// Provider streaming `deltas` then finishing
    pub fn deltas(id: &str, deltas: &[&str]) -> Self {
        Self::new(
            id,
            deltas.iter().map(|d| Step::Delta((*d).to_string())).collect(),
        )
    }

    /// Fail `open_stream` with `err`
    pub fn with_open_error(mut self, err: StreamError) -> Self {
        self.open_error = Some(err);
        self
    }

    /// Delay `open_stream`
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Change the provider-level defaults
    pub fn with_defaults(mut self, defaults: ProviderDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Streams opened so far
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// `close` calls across all adapters
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Request seen by the latest `open_stream`
    pub fn last_request(&self) -> Option<ResolvedRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn defaults(&self) -> &ProviderDefaults {
        &self.defaults
    }

    async fn open_stream(
        &self,
        request: &ResolvedRequest,
    ) -> Result<Box<dyn StreamAdapter>, StreamError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref err) = self.open_error {
            return Err(err.clone());
        }

        Ok(Box::new(ScriptedAdapter {
            steps: self.steps.iter().cloned().collect(),
            current: String::new(),
            error: None,
            finished: false,
            closes: Arc::clone(&self.closes),
        }))
    }
}
