//! Credential sources
//!
//! The core does not acquire or refresh secrets. Whatever owns that (a key in
//! the environment, an OAuth flow, a keychain) implements
//! [`CredentialSource`] and hands the result over as an opaque
//! [`Credential`].

use std::collections::HashMap;

use super::traits::Credential;
use crate::config::ProviderSettings;

/// Supplies the credential for a provider id
pub trait CredentialSource: Send + Sync {
    /// Credential for `id`, or `None` if there is none
    fn credential(&self, id: &str, settings: &ProviderSettings) -> Option<Credential>;
}

/// Reads API keys from the variable named by `api_key_env`
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn credential(&self, id: &str, settings: &ProviderSettings) -> Option<Credential> {
        let var = settings.api_key_env.as_deref()?;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Some(Credential::ApiKey(key.trim().to_string())),
            _ => {
                tracing::debug!(provider = id, var, "No API key in environment");
                None
            }
        }
    }
}

/// Fixed credentials keyed by provider id
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    credentials: HashMap<String, Credential>,
}

impl StaticCredentials {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential for `id`
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, credential: Credential) -> Self {
        self.credentials.insert(id.into(), credential);
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(&self, id: &str, _settings: &ProviderSettings) -> Option<Credential> {
        self.credentials.get(id).cloned()
    }
}
