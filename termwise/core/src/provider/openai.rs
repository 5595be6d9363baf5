//! OpenAI-compatible chat completions
//!
//! Speaks the `/v1/chat/completions` streaming dialect, which many hosted
//! and self-hosted gateways also implement. Each SSE event carries
//! `choices[0].delta.content`; the stream ends with `data: [DONE]`.

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

/// Event vocabulary of the chat-completions stream
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiDialect;

impl SseDialect for OpenAiDialect {
    fn interpret(&self, event: &Value) -> DialectEvent {
        if let Some(error) = event.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return DialectEvent::Error(message.to_string());
        }

        match event
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            Some(text) => DialectEvent::Text(text.to_string()),
            None => DialectEvent::Ignore,
        }
    }
}

/// Wire name for a role in this dialect
fn role_name(role: Role) -> &'static str {
    match role {
        Role::System | Role::Developer => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Build the streaming request body
pub(crate) fn request_body(request: &ResolvedRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({ "role": role_name(m.role), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "stream": true,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

/// Provider for OpenAI-compatible endpoints
pub struct OpenAiProvider {
    id: String,
    endpoint: String,
    credential: Option<Credential>,
    defaults: ProviderDefaults,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
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

    /// Endpoint requests are POSTed to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
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
        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .json(&request_body(request));
        if let Some(ref credential) = self.credential {
            builder = builder.bearer_auth(credential.secret());
        }

        let body = http::open_body(builder).await?;
        Ok(Box::new(EventDeltaAdapter::new(body, OpenAiDialect)))
    }
}
