//! Provider Traits
//!
//! Trait and request types shared by every LLM provider. A provider turns a
//! resolved request into a [`StreamAdapter`]; everything about HTTP, auth
//! headers and wire dialects stays behind that boundary.
//!
//! # Request resolution
//!
//! Per-call values in [`ChatRequest`] win over the provider's
//! [`ProviderDefaults`] for model, temperature and max tokens. Resolution
//! fails with a [`ValidationError`] before any network activity when no model
//! is known or the message list is empty.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::adapter::StreamAdapter;
use super::error::{StreamError, ValidationError};

// ============================================================================
// Roles and messages
// ============================================================================

/// Author of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Top-level instructions
    System,
    /// Instructions from the application developer
    Developer,
    /// End-user content
    User,
    /// Prior model output
    Assistant,
}

impl Role {
    /// Map a role name to a role; unrecognized names are `User`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "system" => Self::System,
            "developer" => Self::Developer,
            "assistant" | "model" => Self::Assistant,
            _ => Self::User,
        }
    }

    /// Canonical lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Developer => "developer",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Whether the role carries instructions rather than conversation
    #[must_use]
    pub fn is_instruction(self) -> bool {
        matches!(self, Self::System | Self::Developer)
    }
}

/// One message in a chat request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Who wrote it
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A chat request with optional per-call overrides
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatRequest {
    /// Conversation to send
    pub messages: Vec<ChatMessage>,
    /// Model override
    pub model: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Max output tokens override
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request for `messages`
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max output tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Append a message
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Apply `defaults` underneath this request's overrides
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when no model is known, the message list
    /// is empty, or the temperature is out of range.
    pub fn resolve(
        &self,
        provider: &str,
        defaults: &ProviderDefaults,
    ) -> Result<ResolvedRequest, ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::EmptyMessages);
        }

        let model = self
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| Some(defaults.model.as_str()).filter(|m| !m.trim().is_empty()))
            .ok_or_else(|| ValidationError::MissingModel {
                provider: provider.to_string(),
            })?
            .to_string();

        let temperature = self.temperature.or(defaults.temperature);
        if let Some(t) = temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ValidationError::InvalidTemperature(t));
            }
        }

        Ok(ResolvedRequest {
            model,
            messages: self.messages.clone(),
            temperature,
            max_tokens: self.max_tokens.or(defaults.max_tokens),
        })
    }
}

/// A validated request with every effective parameter filled in
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRequest {
    /// Model to use
    pub model: String,
    /// Conversation to send (never empty)
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, if any
    pub temperature: Option<f32>,
    /// Max output tokens, if any
    pub max_tokens: Option<u32>,
}

/// Provider-level request defaults
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderDefaults {
    /// Default model (may be empty when the caller must choose)
    pub model: String,
    /// Default temperature
    pub temperature: Option<f32>,
    /// Default max output tokens
    pub max_tokens: Option<u32>,
    /// Bound on request plus stream lifetime
    pub timeout: Duration,
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Opaque secret handed over by the auth subsystem
///
/// The core never inspects or refreshes it; it only decides which header it
/// goes into.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static API key
    ApiKey(String),
    /// OAuth access token
    Bearer(String),
}

impl Credential {
    /// The raw secret
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::ApiKey(s) | Self::Bearer(s) => s,
        }
    }

    /// Whether the secret is blank
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.secret().trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}

// ============================================================================
// Provider trait
// ============================================================================

/// The wire-protocol families a provider can speak
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions over SSE deltas
    OpenAi,
    /// Anthropic messages API over SSE deltas
    Anthropic,
    /// Ollama chat API over NDJSON, driven as a pull iterator
    Ollama,
    /// SSE where every event carries the full response so far
    Cumulative,
}

impl ProviderKind {
    /// Every kind, in registration order
    pub const ALL: [Self; 4] = [Self::OpenAi, Self::Anthropic, Self::Ollama, Self::Cumulative];

    /// Look up a kind by its tag
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            "cumulative" => Some(Self::Cumulative),
            _ => None,
        }
    }

    /// The tag used in configuration
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::Cumulative => "cumulative",
        }
    }

    /// Whether requests need a credential
    #[must_use]
    pub fn requires_credential(self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// LLM provider
///
/// Implement this trait to add support for another backend. `open_stream`
/// performs the HTTP request; a connection failure or non-success status is
/// returned as the stream's terminal error.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider id as registered (e.g. "openai", "work-proxy")
    fn name(&self) -> &str;

    /// Wire-protocol family
    fn kind(&self) -> ProviderKind;

    /// Request defaults and timeout
    fn defaults(&self) -> &ProviderDefaults;

    /// Send the request and return an adapter over the response stream
    async fn open_stream(
        &self,
        request: &ResolvedRequest,
    ) -> Result<Box<dyn StreamAdapter>, StreamError>;
}
