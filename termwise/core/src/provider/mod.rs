//! LLM Provider Integration
//!
//! Providers turn a [`ResolvedRequest`] into a [`StreamAdapter`], a uniform
//! pull interface over whatever wire format the backend streams.
//!
//! # Wire Formats
//!
//! - **Event deltas** ([`EventDeltaAdapter`]): SSE `data:` events carrying
//!   only new text. Used by `openai` and `anthropic`.
//! - **Cumulative snapshots** ([`SnapshotAdapter`]): SSE events carrying the
//!   whole response so far. Used by `cumulative`.
//! - **Native pull iterator** ([`NativeStreamAdapter`]): decoded events driven
//!   on a worker task into a bounded queue. Used by `ollama`.
//!
//! # Usage
//!
//! ```ignore
//! use termwise_core::provider::{ChatMessage, ChatRequest, Provider};
//!
//! let request = ChatRequest::new(vec![ChatMessage::user("Hello!")]);
//! let resolved = request.resolve(provider.name(), provider.defaults())?;
//! let mut adapter = provider.open_stream(&resolved).await?;
//! while adapter.advance().await {
//!     print!("{}", adapter.current());
//! }
//! ```

mod adapter;
mod credentials;
mod error;
mod http;
mod lines;
mod native;
mod snapshot;
mod sse;
mod traits;

pub mod anthropic;
pub mod cumulative;
pub mod ollama;
pub mod openai;

pub use adapter::{ByteStream, StreamAdapter};
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use error::{StreamError, ValidationError};
pub use http::{error_message, MAX_ERROR_BODY};
pub use lines::LineDecoder;
pub use native::{NativeEvent, NativeSource, NativeStreamAdapter, NATIVE_QUEUE_CAPACITY};
pub use snapshot::SnapshotAdapter;
pub use sse::{DialectEvent, EventDeltaAdapter, SseDialect};
pub use traits::{
    ChatMessage, ChatRequest, Credential, Provider, ProviderDefaults, ProviderKind,
    ResolvedRequest, Role,
};

pub use anthropic::AnthropicProvider;
pub use cumulative::CumulativeProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
