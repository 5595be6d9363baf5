//! HTTP plumbing shared by the providers

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;

use super::adapter::ByteStream;
use super::error::StreamError;
use crate::config::ConfigError;

/// Longest response body quoted in a status error
pub const MAX_ERROR_BODY: usize = 512;

/// Build the client every provider uses
///
/// Only the connect phase is bounded here; the overall deadline belongs to
/// the stream pump.
pub(crate) fn build_client(connect_timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Send a prepared POST and hand back the body as a byte stream
///
/// Non-success statuses consume the body and become [`StreamError::Status`].
pub(crate) async fn open_body(request: reqwest::RequestBuilder) -> Result<ByteStream, StreamError> {
    let response = request
        .header(reqwest::header::ACCEPT, "text/event-stream, application/x-ndjson")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StreamError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(StreamError::from))
        .boxed())
}

/// Best human-readable message from an error body
///
/// Understands `{"error":{"message":..}}`, `{"error":".."}` and
/// `{"message":..}`; anything else is quoted, truncated.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = ["/error/message", "/error", "/message"]
            .iter()
            .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}
