//! Assistant facade
//!
//! Ties the pipeline together for a UI or the `termwise` binary:
//!
//! ```text
//!   CaptureBuffer ──► assemble() ──► ChatRequest ──► StreamPump ──► StreamHandle
//!                                          ▲
//!                    ProviderRegistry ─────┘ (built once per id, cached)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::capture::CaptureBuffer;
use crate::config::TermwiseConfig;
use crate::context::{assemble, PromptMode, TerminalContext, TerminalMetadata};
use crate::provider::{ChatMessage, ChatRequest, CredentialSource, Provider, ValidationError};
use crate::pump::{StreamHandle, StreamOptions, StreamPump};
use crate::registry::{ProviderRegistry, RegistryError};

/// Errors from [`Assistant::ask`]
#[derive(Debug, Error)]
pub enum AssistError {
    /// The provider could not be built
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The request was rejected before anything was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One question about the captured terminal output
#[derive(Clone, Debug, Default)]
pub struct AskRequest {
    /// Which system prompt to use
    pub mode: PromptMode,
    /// Session metadata
    pub metadata: TerminalMetadata,
    /// Follow-up question appended after the terminal context
    pub question: Option<String>,
    /// Provider id; the configured default when unset
    pub provider: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Max output tokens override
    pub max_tokens: Option<u32>,
    /// Stream options
    pub options: StreamOptions,
}

impl AskRequest {
    /// Request in `mode`
    #[must_use]
    pub fn new(mode: PromptMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set the metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: TerminalMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the follow-up question
    #[must_use]
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Use a specific provider
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Override the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set stream options
    #[must_use]
    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }
}

/// Capture buffer, configuration and providers behind one entry point
pub struct Assistant {
    capture: Arc<CaptureBuffer>,
    config: TermwiseConfig,
    registry: Arc<ProviderRegistry>,
    credentials: Arc<dyn CredentialSource>,
    pump: StreamPump,
    providers: Mutex<HashMap<String, Arc<dyn Provider>>>,
}

impl Assistant {
    /// Create an assistant with a fresh capture buffer sized from `config`
    pub fn new(
        config: TermwiseConfig,
        registry: Arc<ProviderRegistry>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            capture: Arc::new(CaptureBuffer::new(config.capture_capacity)),
            config,
            registry,
            credentials,
            pump: StreamPump::new(),
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Share an existing capture buffer
    #[must_use]
    pub fn with_capture(mut self, capture: Arc<CaptureBuffer>) -> Self {
        self.capture = capture;
        self
    }

    /// Use a differently configured pump
    #[must_use]
    pub fn with_pump(mut self, pump: StreamPump) -> Self {
        self.pump = pump;
        self
    }

    /// The capture buffer
    #[must_use]
    pub fn capture(&self) -> &Arc<CaptureBuffer> {
        &self.capture
    }

    /// The configuration
    #[must_use]
    pub fn config(&self) -> &TermwiseConfig {
        &self.config
    }

    /// Assemble context from the current capture
    #[must_use]
    pub fn context(&self, mode: PromptMode, metadata: &TerminalMetadata) -> TerminalContext {
        let lines = self.capture.get_last_n(self.config.context.max_lines);
        assemble(&lines, metadata, mode, &self.config.context)
    }

    /// The provider for `id`, built on first use
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when `id` is unknown or its settings are
    /// invalid. Failures are not cached.
    pub fn provider(&self, id: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        if let Some(provider) = self.providers.lock().get(id) {
            return Ok(Arc::clone(provider));
        }

        let provider = self
            .registry
            .build_configured(id, &self.config, self.credentials.as_ref())?;
        self.providers
            .lock()
            .entry(id.to_string())
            .or_insert_with(|| Arc::clone(&provider));
        Ok(provider)
    }

    /// Ask about the captured output and start streaming the answer
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`AssistError`] when the provider cannot be built or the
    /// request is invalid; nothing is sent in either case.
    pub fn ask(&self, request: AskRequest) -> Result<StreamHandle, AssistError> {
        let id = request
            .provider
            .as_deref()
            .unwrap_or(self.config.default_provider.as_str());
        let provider = self.provider(id)?;

        let context = self.context(request.mode, &request.metadata);
        let mut messages = context.messages();
        if let Some(question) = request.question.as_deref().map(str::trim) {
            if !question.is_empty() {
                messages.push(ChatMessage::user(question));
            }
        }

        let chat = ChatRequest {
            messages,
            model: request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            provider = id,
            lines = context.line_count,
            truncated = context.truncated,
            "Asking provider"
        );
        Ok(self.pump.start(provider, &chat, request.options)?)
    }
}
