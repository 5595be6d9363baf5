//! Provider Registry
//!
//! Maps provider tags to constructors. The registry is built once at startup
//! and passed to whoever needs providers; there is no global instance.
//!
//! # Lookup
//!
//! ```text
//!   build("groq", settings{kind: openai})
//!        │
//!        ├─ constructor registered as "groq"?    ──► use it
//!        └─ constructor registered as "openai"?  ──► use it
//!                                                    else UnknownProvider
//! ```
//!
//! Registering under a provider id therefore overrides the built-in
//! constructor for that id only.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, ProviderSettings, TermwiseConfig};
use crate::provider::{
    AnthropicProvider, Credential, CredentialSource, CumulativeProvider, OllamaProvider,
    OpenAiProvider, Provider, ProviderKind,
};

/// Builds a provider from its id, settings and credential
pub type ProviderConstructor =
    fn(&str, &ProviderSettings, Option<Credential>) -> Result<Arc<dyn Provider>, ConfigError>;

/// Errors from building a provider
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No constructor or settings for the id
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The provider's settings were rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Tag-to-constructor table
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a constructor for every [`ProviderKind`]
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in ProviderKind::ALL {
            registry.register(kind.tag(), builtin_constructor(kind));
        }
        registry
    }

    /// Register a constructor, returning the one it replaces
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        constructor: ProviderConstructor,
    ) -> Option<ProviderConstructor> {
        self.constructors.insert(tag.into(), constructor)
    }

    /// Whether a constructor is registered under `tag`
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Build the provider `id` from explicit settings
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownProvider`] when neither `id` nor the
    /// settings' kind has a constructor, or the constructor's error.
    pub fn build(
        &self,
        id: &str,
        settings: &ProviderSettings,
        credential: Option<Credential>,
    ) -> Result<Arc<dyn Provider>, RegistryError> {
        let constructor = self
            .constructors
            .get(id)
            .or_else(|| self.constructors.get(settings.kind.tag()))
            .ok_or_else(|| RegistryError::UnknownProvider(id.to_string()))?;

        let provider = constructor(id, settings, credential)?;
        tracing::debug!(provider = id, kind = %provider.kind(), "Built provider");
        Ok(provider)
    }

    /// Build the provider `id` as configured, with its credential
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownProvider`] when `id` is not in the
    /// configuration, or any error from [`ProviderRegistry::build`].
    pub fn build_configured(
        &self,
        id: &str,
        config: &TermwiseConfig,
        credentials: &dyn CredentialSource,
    ) -> Result<Arc<dyn Provider>, RegistryError> {
        let settings = config
            .provider(id)
            .ok_or_else(|| RegistryError::UnknownProvider(id.to_string()))?;
        let credential = credentials.credential(id, settings);
        self.build(id, settings, credential)
    }
}

fn builtin_constructor(kind: ProviderKind) -> ProviderConstructor {
    match kind {
        ProviderKind::OpenAi => |id, settings, credential| {
            Ok(Arc::new(OpenAiProvider::from_settings(id, settings, credential)?))
        },
        ProviderKind::Anthropic => |id, settings, credential| {
            Ok(Arc::new(AnthropicProvider::from_settings(
                id, settings, credential,
            )?))
        },
        ProviderKind::Ollama => |id, settings, credential| {
            Ok(Arc::new(OllamaProvider::from_settings(id, settings, credential)?))
        },
        ProviderKind::Cumulative => |id, settings, credential| {
            Ok(Arc::new(CumulativeProvider::from_settings(
                id, settings, credential,
            )?))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticCredentials;
    use crate::test_utils::ScriptedProvider;

    fn scripted(
        id: &str,
        _settings: &ProviderSettings,
        _credential: Option<Credential>,
    ) -> Result<Arc<dyn Provider>, ConfigError> {
        Ok(Arc::new(ScriptedProvider::deltas(id, &["scripted"])))
    }

    #[test]
    fn test_builtin_tags() {
        let registry = ProviderRegistry::with_builtin();
        assert_eq!(registry.tags(), vec!["anthropic", "cumulative", "ollama", "openai"]);
        assert!(ProviderRegistry::new().tags().is_empty());
    }

    #[test]
    fn test_build_by_kind() {
        let registry = ProviderRegistry::with_builtin();
        let mut settings = ProviderSettings::builtin(ProviderKind::OpenAi);
        settings.endpoint = "http://localhost:8080/v1/chat/completions".to_string();

        let provider = registry
            .build(
                "local-gateway",
                &settings,
                Some(Credential::ApiKey("k".to_string())),
            )
            .unwrap();
        assert_eq!(provider.name(), "local-gateway");
        assert_eq!(provider.kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_build_propagates_validation() {
        let registry = ProviderRegistry::with_builtin();
        let settings = ProviderSettings::builtin(ProviderKind::Anthropic);

        let Err(err) = registry.build("anthropic", &settings, None) else {
            panic!("a missing API key should be rejected");
        };
        assert!(matches!(err, RegistryError::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_without_constructor() {
        let registry = ProviderRegistry::new();
        let settings = ProviderSettings::builtin(ProviderKind::Ollama);

        let Err(err) = registry.build("ollama", &settings, None) else {
            panic!("an empty registry should not build ollama");
        };
        assert!(matches!(err, RegistryError::UnknownProvider(id) if id == "ollama"));
    }

    #[test]
    fn test_id_registration_overrides_kind() {
        let mut registry = ProviderRegistry::with_builtin();
        assert!(registry.register("openai", scripted).is_some());

        let settings = ProviderSettings::builtin(ProviderKind::OpenAi);
        let provider = registry.build("openai", &settings, None).unwrap();
        assert_eq!(provider.defaults().model, ScriptedProvider::MODEL);
    }

    #[test]
    fn test_build_configured() {
        let registry = ProviderRegistry::with_builtin();
        let config = TermwiseConfig::default();
        let credentials = StaticCredentials::new();

        let provider = registry
            .build_configured("ollama", &config, &credentials)
            .unwrap();
        assert_eq!(provider.kind(), ProviderKind::Ollama);

        let Err(err) = registry.build_configured("missing", &config, &credentials) else {
            panic!("an unconfigured id should be rejected");
        };
        assert!(matches!(err, RegistryError::UnknownProvider(_)));
    }
}
