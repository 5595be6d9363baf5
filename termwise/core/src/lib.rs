//! Termwise Core - Terminal Output Capture and LLM Streaming
//!
//! This crate captures a terminal session's recent output and streams it to a
//! selectable LLM provider for a diagnostic or conversational answer. It has
//! no UI of its own; a shell integration, TUI or the bundled `termwise`
//! binary drives it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         UI / Shell hook                           │
//! └───────┬───────────────────────────────────────────▲──────────────┘
//!         │ output lines + TerminalMetadata           │ StreamEvent
//!         ▼                                           │
//! ┌───────────────┐   ┌──────────────────┐   ┌────────┴───────────┐
//! │ CaptureBuffer │──►│ Context Assembler│──►│    StreamPump      │
//! │  (ring, RW)   │   │ sanitize/truncate│   │ deadline, cancel,  │
//! └───────────────┘   │ prompts          │   │ bounded queue (8)  │
//!                     └──────────────────┘   └────────┬───────────┘
//!                                                     │ StreamAdapter
//!                     ┌──────────────────┐   ┌────────┴───────────┐
//!                     │ ProviderRegistry │──►│ Provider           │
//!                     │ tag → constructor│   │ openai / anthropic │
//!                     └──────────────────┘   │ ollama / cumulative│
//!                                            └────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`CaptureBuffer`]: Fixed-capacity ring of recent output lines
//! - [`TerminalContext`]: Sanitized output plus rendered prompts
//! - [`StreamAdapter`]: Uniform pull interface over a provider's stream
//! - [`StreamPump`] / [`StreamHandle`]: Drive a stream on its own task
//! - [`ProviderRegistry`]: Explicit provider constructor table
//! - [`Assistant`]: Facade tying the pipeline together
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use termwise_core::{
//!     load_config, AskRequest, Assistant, EnvCredentials, PromptMode, ProviderRegistry,
//!     StreamEvent,
//! };
//!
//! let assistant = Assistant::new(
//!     load_config()?,
//!     Arc::new(ProviderRegistry::with_builtin()),
//!     Arc::new(EnvCredentials),
//! );
//! assistant.capture().write("error: could not compile `app`");
//!
//! let mut handle = assistant.ask(AskRequest::new(PromptMode::Diagnostic))?;
//! while let Some(event) = handle.next().await {
//!     match event {
//!         StreamEvent::Delta(text) => print!("{text}"),
//!         StreamEvent::Done => break,
//!         StreamEvent::Error(err) => eprintln!("\n{err}"),
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`capture`]: Ring buffer and line-splitting writer
//! - [`context`]: Sanitization, truncation and prompt rendering
//! - [`provider`]: Provider trait, wire adapters and concrete providers
//! - [`registry`]: Provider constructors keyed by tag
//! - [`pump`]: Stream driving, timeouts and cancellation
//! - [`config`]: TOML and environment configuration
//! - [`assistant`]: Facade over all of the above

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assistant;
pub mod capture;
pub mod config;
pub mod context;
pub mod provider;
pub mod pump;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenience
pub use assistant::{AskRequest, AssistError, Assistant};
pub use capture::{CaptureBuffer, CaptureWriter, DEFAULT_CAPTURE_CAPACITY};
pub use context::{
    assemble, strip_ansi, ContextOptions, PromptMode, TerminalContext, TerminalMetadata,
};
pub use provider::{
    ChatMessage, ChatRequest, Credential, CredentialSource, EnvCredentials, Provider,
    ProviderDefaults, ProviderKind, Role, StaticCredentials, StreamAdapter, StreamError,
    ValidationError,
};
pub use pump::{StreamEvent, StreamHandle, StreamOptions, StreamPump, DEFAULT_QUEUE_CAPACITY};
pub use registry::{ProviderConstructor, ProviderRegistry, RegistryError};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, ProviderSettings, TermwiseConfig,
};
