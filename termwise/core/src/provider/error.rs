//! Provider error types
//!
//! Two families that never mix: [`ValidationError`] is returned before any
//! network activity, [`StreamError`] is only ever observed as the terminal
//! state of a stream.

use std::time::Duration;

use thiserror::Error;

/// A request that cannot be sent as-is
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Neither the request nor the provider names a model
    #[error("no model specified for provider {provider}")]
    MissingModel {
        /// Provider the request was resolved against
        provider: String,
    },

    /// The request carries no messages
    #[error("request has no messages")]
    EmptyMessages,

    /// Temperature outside the range every supported API accepts
    #[error("temperature {0} is outside 0.0..=2.0")]
    InvalidTemperature(f32),
}

/// Terminal failure of a stream
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The connection could not be established or broke mid-stream
    #[error("connection failed: {0}")]
    Connection(String),

    /// The provider answered with a non-success HTTP status
    #[error("provider returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Provider error message, or the (truncated) response body
        message: String,
    },

    /// The request and stream did not finish within the allotted time
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The provider reported an error inside the stream
    #[error("provider error: {0}")]
    Provider(String),

    /// The response could not be decoded at all
    #[error("invalid response: {0}")]
    Decode(String),

    /// The consumer cancelled before the stream finished
    ///
    /// Never sent through the stream itself; only reported by helpers that
    /// wait for a terminal event.
    #[error("stream cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}
