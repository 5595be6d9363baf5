//! Anthropic messages API
//!
//! Differs from the chat-completions shape in two ways:
//! - instructions travel in a top-level `system` field, not as messages
//! - the stream uses typed events (`content_block_delta`, `message_stop`,
//!   `error`, ...) instead of a `[DONE]` marker

use async_trait::async_trait;
use serde_json::{json, Value};

use super::adapter::StreamAdapter;
use super::error::StreamError;
use super::http;
use super::sse::{DialectEvent, EventDeltaAdapter, SseDialect};
use super::traits::{
    Credential, Provider, ProviderDefaults, ProviderKind, ResolvedRequest, Role,
};
use crate::config::{ConfigError, ProviderSettings};

/// API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory for this API
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Event vocabulary of the messages stream
#[derive(Clone, Copy, Debug, Default)]
pub struct AnthropicDialect;

impl SseDialect for AnthropicDialect {
    fn interpret(&self, event: &Value) -> DialectEvent {
        match event.get("type").and_then(Value::as_str) {
            Some("content_block_delta") => {
                match event.pointer("/delta/text").and_then(Value::as_str) {
                    Some(text) => DialectEvent::Text(text.to_string()),
                    None => DialectEvent::Ignore,
                }
            }
            Some("message_stop") => DialectEvent::Done,
            Some("error") => {
                let message = event
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                DialectEvent::Error(message.to_string())
            }
            _ => DialectEvent::Ignore,
        }
    }
}

/// Build the streaming request body, lifting instructions into `system`
pub(crate) fn request_body(request: &ResolvedRequest) -> Value {
    let (instructions, conversation): (Vec<_>, Vec<_>) = request
        .messages
        .iter()
        .partition(|m| m.role.is_instruction());

    let messages: Vec<Value> = conversation
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "assistant",
                _ => "user",
            };
            json!({ "role": role, "content": m.content })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "stream": true,
    });

    let system: Vec<&str> = instructions.iter().map(|m| m.content.as_str()).collect();
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

/// Provider for the Anthropic messages API
pub struct AnthropicProvider {
    id: String,
    endpoint: String,
    credential: Option<Credential>,
    defaults: ProviderDefaults,
    http_client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create from validated settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if a required field is blank,
    /// or [`ConfigError::HttpClient`] if the client cannot be built.
    pub fn from_settings(
        id: &str,
        settings: &ProviderSettings,
        credential: Option<Credential>,
    ) -> Result<Self, ConfigError> {
        settings.validate(id, credential.as_ref())?;

        Ok(Self {
            id: id.to_string(),
            endpoint: settings.endpoint.clone(),
            credential,
            defaults: settings.defaults(),
            http_client: http::build_client(settings.timeout)?,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn defaults(&self) -> &ProviderDefaults {
        &self.defaults
    }

    async fn open_stream(
        &self,
        request: &ResolvedRequest,
    ) -> Result<Box<dyn StreamAdapter>, StreamError> {
        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body(request));
        builder = match self.credential {
            Some(Credential::ApiKey(ref key)) => builder.header("x-api-key", key),
            Some(Credential::Bearer(ref token)) => builder.bearer_auth(token),
            None => builder,
        };

        let body = http::open_body(builder).await?;
        Ok(Box::new(EventDeltaAdapter::new(body, AnthropicDialect)))
    }
}
