//! Cumulative-snapshot SSE endpoints
//!
//! For gateways whose events carry the whole response so far. The request
//! body uses the chat-completions shape; the snapshot text is located in each
//! event with a JSON pointer (`/text` unless configured otherwise).

use async_trait::async_trait;
use serde_json::Value;

use super::adapter::StreamAdapter;
use super::error::StreamError;
use super::http;
use super::openai;
use super::snapshot::SnapshotAdapter;
use super::sse::{DialectEvent, SseDialect};
use super::traits::{Credential, Provider, ProviderDefaults, ProviderKind, ResolvedRequest};
use crate::config::{ConfigError, ProviderSettings};

/// Pointer used when none is configured
pub const DEFAULT_TEXT_POINTER: &str = "/text";

/// Reads the snapshot text at a JSON pointer
#[derive(Clone, Debug)]
pub struct PointerDialect {
    pointer: String,
}

impl PointerDialect {
    /// Dialect reading the snapshot at `pointer`
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }

    /// The configured pointer
    #[must_use]
    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl Default for PointerDialect {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_POINTER)
    }
}

impl SseDialect for PointerDialect {
    fn interpret(&self, event: &Value) -> DialectEvent {
        if let Some(error) = event.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .unwrap_or("unknown error");
            return DialectEvent::Error(message.to_string());
        }

        if let Some(text) = event.pointer(&self.pointer).and_then(Value::as_str) {
            return DialectEvent::Text(text.to_string());
        }

        if event.get("done").and_then(Value::as_bool) == Some(true) {
            DialectEvent::Done
        } else {
            DialectEvent::Ignore
        }
    }
}

/// Provider for cumulative-snapshot endpoints
pub struct CumulativeProvider {
    id: String,
    endpoint: String,
    credential: Option<Credential>,
    defaults: ProviderDefaults,
    dialect: PointerDialect,
    http_client: reqwest::Client,
}

impl CumulativeProvider {
    /// Create from validated settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if a required field is blank
    /// or the text pointer is malformed, or [`ConfigError::HttpClient`] if the
    /// client cannot be built.
    pub fn from_settings(
        id: &str,
        settings: &ProviderSettings,
        credential: Option<Credential>,
    ) -> Result<Self, ConfigError> {
        settings.validate(id, credential.as_ref())?;

        let pointer = settings
            .text_pointer
            .as_deref()
            .unwrap_or(DEFAULT_TEXT_POINTER);
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "{id}: text_pointer must be empty or start with '/'"
            )));
        }

        Ok(Self {
            id: id.to_string(),
            endpoint: settings.endpoint.clone(),
            credential,
            defaults: settings.defaults(),
            dialect: PointerDialect::new(pointer),
            http_client: http::build_client(settings.timeout)?,
        })
    }
}

#[async_trait]
impl Provider for CumulativeProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Cumulative
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
            .json(&openai::request_body(request));
        if let Some(ref credential) = self.credential {
            builder = builder.bearer_auth(credential.secret());
        }

        let body = http::open_body(builder).await?;
        Ok(Box::new(SnapshotAdapter::new(body, self.dialect.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pointer_dialect() {
        let dialect = PointerDialect::new("/output/text");
        assert_eq!(
            dialect.interpret(&json!({"output": {"text": "so far"}})),
            DialectEvent::Text("so far".to_string())
        );
        assert_eq!(dialect.interpret(&json!({"done": true})), DialectEvent::Done);
        assert_eq!(dialect.interpret(&json!({"status": "queued"})), DialectEvent::Ignore);
        assert_eq!(
            dialect.interpret(&json!({"error": "busy"})),
            DialectEvent::Error("busy".to_string())
        );
    }

    #[test]
    fn test_from_settings() {
        let mut settings = ProviderSettings::builtin(ProviderKind::Cumulative);
        assert!(CumulativeProvider::from_settings("cumulative", &settings, None).is_err());

        settings.endpoint = "http://localhost:9000/stream".to_string();
        settings.model = "snapshot-1".to_string();
        let provider = CumulativeProvider::from_settings("cumulative", &settings, None).unwrap();
        assert_eq!(provider.dialect.pointer(), DEFAULT_TEXT_POINTER);
        assert_eq!(provider.defaults().timeout.as_secs(), 30);

        settings.text_pointer = Some("text".to_string());
        assert!(CumulativeProvider::from_settings("cumulative", &settings, None).is_err());
    }
}
