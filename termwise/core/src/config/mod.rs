//! TOML Configuration File Support
//!
//! Centralized configuration loading, with a TOML file at
//! `~/.config/termwise/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. Explicit overrides ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! default_provider = "anthropic"
//!
//! [capture]
//! capacity = 2000
//!
//! [context]
//! max_lines = 100
//! max_bytes = 12000
//!
//! [providers.anthropic]
//! model = "claude-3-5-haiku-latest"
//! max_tokens = 1024
//!
//! # Any OpenAI-compatible endpoint under its own id
//! [providers.groq]
//! kind = "openai"
//! endpoint = "https://api.groq.com/openai/v1/chat/completions"
//! model = "llama-3.1-8b-instant"
//! api_key_env = "GROQ_API_KEY"
//! timeout_secs = 30
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::DEFAULT_CAPTURE_CAPACITY;
use crate::context::ContextOptions;
use crate::provider::{Credential, ProviderDefaults, ProviderKind};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading or applying configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// The HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from an explicit override
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Capture section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureToml {
    /// Number of output lines retained
    pub capacity: Option<usize>,
}

/// Context section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextToml {
    /// Trailing lines sent to the model
    pub max_lines: Option<usize>,
    /// Byte budget for sanitized output
    pub max_bytes: Option<usize>,
}

/// One `[providers.<id>]` table
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderToml {
    /// Wire-protocol family; defaults to the table id
    pub kind: Option<String>,
    /// Full URL requests are POSTed to
    pub endpoint: Option<String>,
    /// Default model
    pub model: Option<String>,
    /// Default temperature
    pub temperature: Option<f32>,
    /// Default max output tokens
    pub max_tokens: Option<u32>,
    /// Request plus stream timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// JSON pointer to the snapshot text (cumulative providers)
    pub text_pointer: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermwiseToml {
    /// Provider used when a request does not name one
    pub default_provider: Option<String>,

    /// Capture buffer section
    pub capture: CaptureToml,

    /// Context assembly section
    pub context: ContextToml,

    /// Provider tables keyed by provider id
    pub providers: BTreeMap<String, ProviderToml>,
}

// =============================================================================
// Provider Settings
// =============================================================================

/// Effective settings for one provider id
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderSettings {
    /// Wire-protocol family
    pub kind: ProviderKind,
    /// Full URL requests are POSTed to
    pub endpoint: String,
    /// Default model
    pub model: String,
    /// Default temperature
    pub temperature: Option<f32>,
    /// Default max output tokens
    pub max_tokens: Option<u32>,
    /// Request plus stream timeout
    pub timeout: Duration,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// JSON pointer to the snapshot text (cumulative providers)
    pub text_pointer: Option<String>,
}

impl ProviderSettings {
    /// Built-in settings for `kind`
    #[must_use]
    pub fn builtin(kind: ProviderKind) -> Self {
        let (endpoint, model, api_key_env, timeout_secs) = match kind {
            ProviderKind::OpenAi => (
                "https://api.openai.com/v1/chat/completions",
                "gpt-4o-mini",
                Some("OPENAI_API_KEY"),
                60,
            ),
            ProviderKind::Anthropic => (
                "https://api.anthropic.com/v1/messages",
                "claude-3-5-haiku-latest",
                Some("ANTHROPIC_API_KEY"),
                60,
            ),
            ProviderKind::Ollama => ("http://localhost:11434/api/chat", "llama3.2", None, 120),
            ProviderKind::Cumulative => ("", "", None, 30),
        };

        Self {
            kind,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(timeout_secs),
            api_key_env: api_key_env.map(String::from),
            text_pointer: None,
        }
    }

    /// Request defaults derived from these settings
    #[must_use]
    pub fn defaults(&self) -> ProviderDefaults {
        ProviderDefaults {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        }
    }

    /// Check required fields before any request is made
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first blank or
    /// out-of-range field.
    pub fn validate(&self, id: &str, credential: Option<&Credential>) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{id}: endpoint URL is required"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{id}: model is required")));
        }
        if self.kind.requires_credential() && credential.map_or(true, Credential::is_blank) {
            return Err(ConfigError::ValidationError(format!(
                "{id}: API key is required"
            )));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{id}: temperature {t} is outside 0.0..=2.0"
                )));
            }
        }
        Ok(())
    }

    fn apply_toml(&mut self, toml: &ProviderToml) {
        if let Some(ref endpoint) = toml.endpoint {
            self.endpoint.clone_from(endpoint);
        }
        if let Some(ref model) = toml.model {
            self.model.clone_from(model);
        }
        if toml.temperature.is_some() {
            self.temperature = toml.temperature;
        }
        if toml.max_tokens.is_some() {
            self.max_tokens = toml.max_tokens;
        }
        if let Some(secs) = toml.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if toml.api_key_env.is_some() {
            self.api_key_env.clone_from(&toml.api_key_env);
        }
        if toml.text_pointer.is_some() {
            self.text_pointer.clone_from(&toml.text_pointer);
        }
    }
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct TermwiseConfig {
    /// Provider used when a request does not name one
    pub default_provider: String,

    /// Capture buffer capacity in lines
    pub capture_capacity: usize,

    /// Context assembly limits
    pub context: ContextOptions,

    /// Provider settings keyed by provider id
    pub providers: BTreeMap<String, ProviderSettings>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for TermwiseConfig {
    fn default() -> Self {
        let providers = ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind.tag().to_string(), ProviderSettings::builtin(kind)))
            .collect();

        Self {
            default_provider: ProviderKind::OpenAi.tag().to_string(),
            capture_capacity: DEFAULT_CAPTURE_CAPACITY,
            context: ContextOptions::default(),
            providers,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl TermwiseConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Settings for `id`
    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&ProviderSettings> {
        self.providers.get(id)
    }

    /// Settings for the default provider
    #[must_use]
    pub fn default_provider_settings(&self) -> Option<&ProviderSettings> {
        self.provider(&self.default_provider)
    }

    fn default_provider_settings_mut(&mut self) -> Option<&mut ProviderSettings> {
        self.providers.get_mut(&self.default_provider)
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    ///
    /// Returns an error when the default provider is not configured or a
    /// context limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.providers.contains_key(&self.default_provider) {
            return Err(ConfigError::ValidationError(format!(
                "default provider '{}' is not configured",
                self.default_provider
            )));
        }
        if self.context.max_lines == 0 || self.context.max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "context limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/termwise/config.toml` or
/// `~/.config/termwise/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("termwise").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or the
/// result fails validation. A missing config file is not an error.
pub fn load_config() -> Result<TermwiseConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// declares an unknown provider kind, or the result fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<TermwiseConfig, ConfigError> {
    let mut config = TermwiseConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: TermwiseToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut TermwiseConfig, toml: &TermwiseToml) -> Result<(), ConfigError> {
    if let Some(ref provider) = toml.default_provider {
        config.default_provider.clone_from(provider);
    }

    if let Some(capacity) = toml.capture.capacity {
        config.capture_capacity = capacity;
    }

    if let Some(max_lines) = toml.context.max_lines {
        config.context.max_lines = max_lines;
    }
    if let Some(max_bytes) = toml.context.max_bytes {
        config.context.max_bytes = max_bytes;
    }

    for (id, table) in &toml.providers {
        let tag = table.kind.as_deref().unwrap_or(id);
        let kind = ProviderKind::from_tag(tag).ok_or_else(|| {
            ConfigError::ValidationError(format!("{id}: unknown provider kind '{tag}'"))
        })?;

        let settings = config
            .providers
            .entry(id.clone())
            .or_insert_with(|| ProviderSettings::builtin(kind));
        if settings.kind != kind {
            *settings = ProviderSettings::builtin(kind);
        }
        settings.apply_toml(table);
    }

    Ok(())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut TermwiseConfig) {
    if let Ok(provider) = std::env::var("TERMWISE_PROVIDER") {
        if !provider.trim().is_empty() {
            config.default_provider = provider.trim().to_string();
            config.source = ConfigSource::Env;
        }
    }
    if let Some(capacity) = env_parse::<usize>("TERMWISE_CAPTURE_CAPACITY") {
        config.capture_capacity = capacity;
        config.source = ConfigSource::Env;
    }
    if let Some(max_lines) = env_parse::<usize>("TERMWISE_MAX_LINES") {
        config.context.max_lines = max_lines;
        config.source = ConfigSource::Env;
    }
    if let Some(max_bytes) = env_parse::<usize>("TERMWISE_MAX_BYTES") {
        config.context.max_bytes = max_bytes;
        config.source = ConfigSource::Env;
    }

    // Per-provider overrides target the default provider
    let model = std::env::var("TERMWISE_MODEL").ok();
    let timeout = env_parse::<u64>("TERMWISE_TIMEOUT_SECS");
    if let Some(settings) = config.default_provider_settings_mut() {
        let mut touched = false;
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            settings.model = model;
            touched = true;
        }
        if let Some(secs) = timeout {
            settings.timeout = Duration::from_secs(secs);
            touched = true;
        }
        if touched {
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// Override Support
// =============================================================================

/// Builder for applying explicit overrides to configuration
///
/// Use this after [`load_config`] to apply caller-supplied values.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Default provider override
    pub provider: Option<String>,

    /// Model override for the default provider
    pub model: Option<String>,

    /// Max lines override
    pub max_lines: Option<usize>,

    /// Max bytes override
    pub max_bytes: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default provider override
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max lines override
    #[must_use]
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = Some(max_lines);
        self
    }

    /// Set max bytes override
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut TermwiseConfig) {
        if self.provider.is_some()
            || self.model.is_some()
            || self.max_lines.is_some()
            || self.max_bytes.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref provider) = self.provider {
            config.default_provider.clone_from(provider);
        }
        if let Some(max_lines) = self.max_lines {
            config.context.max_lines = max_lines;
        }
        if let Some(max_bytes) = self.max_bytes {
            config.context.max_bytes = max_bytes;
        }
        if let Some(ref model) = self.model {
            if let Some(settings) = config.default_provider_settings_mut() {
                settings.model.clone_from(model);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
