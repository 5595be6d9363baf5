//! Ollama Provider
//!
//! LLM provider for Ollama (local LLM server).
//!
//! # Ollama API
//!
//! `/api/chat` streams newline-delimited JSON, one object per line:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hel"},"done":false}
//! {"message":{"role":"assistant","content":"lo"},"done":false}
//! {"message":{"role":"assistant","content":""},"done":true,"eval_count":12}
//! ```
//!
//! Failures after the headers are sent arrive as `{"error":"..."}`. The body is
//! decoded into [`NativeEvent`]s and driven through a [`NativeStreamAdapter`].

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use serde_json::{json, Value};

use super::adapter::{ByteStream, StreamAdapter};
use super::error::StreamError;
use super::http;
use super::lines::LineDecoder;
use super::native::{NativeEvent, NativeSource, NativeStreamAdapter};
use super::traits::{
    Credential, Provider, ProviderDefaults, ProviderKind, ResolvedRequest, Role,
};
use crate::config::{ConfigError, ProviderSettings};

/// Ollama provider client
pub struct OllamaProvider {
    id: String,
    endpoint: String,
    credential: Option<Credential>,
    defaults: ProviderDefaults,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Create from validated settings
    ///
    /// A credential is optional; when present it is sent as a bearer token,
    /// which authenticating reverse proxies expect.
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

/// Build the chat request body
pub(crate) fn request_body(request: &ResolvedRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System | Role::Developer => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            json!({ "role": role, "content": m.content })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "stream": true,
    });

    let mut options = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        options.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = request.max_tokens {
        options.insert("num_predict".to_string(), json!(max_tokens));
    }
    if !options.is_empty() {
        body["options"] = Value::Object(options);
    }
    body
}

// ============================================================================
// NDJSON decoding
// ============================================================================

struct NdjsonEvents {
    body: Option<ByteStream>,
    lines: LineDecoder,
    done_pending: bool,
}

impl NdjsonEvents {
    async fn next_event(&mut self) -> Option<Result<NativeEvent, StreamError>> {
        if self.done_pending {
            self.done_pending = false;
            return Some(Ok(NativeEvent::Done));
        }

        loop {
            while let Some(line) = self.lines.next_line() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value: Value = match serde_json::from_str(line) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::trace!(error = %err, "Skipping malformed Ollama line");
                        continue;
                    }
                };

                if let Some(error) = value.get("error").and_then(Value::as_str) {
                    return Some(Err(StreamError::Provider(error.to_string())));
                }

                let text = value
                    .pointer("/message/content")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let done = value
                    .get("done")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                match (text.is_empty(), done) {
                    (true, true) => return Some(Ok(NativeEvent::Done)),
                    (false, true) => {
                        self.done_pending = true;
                        return Some(Ok(NativeEvent::Delta(text.to_string())));
                    }
                    (false, false) => return Some(Ok(NativeEvent::Delta(text.to_string()))),
                    (true, false) => {}
                }
            }

            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => self.lines.push(&chunk),
                Some(Err(err)) => {
                    self.body = None;
                    return Some(Err(err));
                }
                None => {
                    self.body = None;
                    self.lines.finish();
                }
            }
        }
    }
}

/// Decode an NDJSON chat body into native events
pub(crate) fn ndjson_events(body: ByteStream) -> NativeSource {
    let state = NdjsonEvents {
        body: Some(body),
        lines: LineDecoder::new(),
        done_pending: false,
    };
    stream::unfold(state, |mut state| async move {
        let event = state.next_event().await?;
        Some((event, state))
    })
    .boxed()
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
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
        Ok(Box::new(NativeStreamAdapter::spawn(ndjson_events(body))))
    }
}
