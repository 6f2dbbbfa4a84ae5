//! Settings accessor for per-provider configuration.
//!
//! The application owns settings persistence. Strategies only see the
//! [`SettingsAccessor`] trait, which exposes the values they read.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tallybar_core::ProviderKind;
use tracing::debug;

// ============================================================================
// Settings Accessor
// ============================================================================

/// Read/write access to provider settings.
pub trait SettingsAccessor: Send + Sync {
    /// Returns the stored API token for a provider.
    fn api_token(&self, provider: ProviderKind) -> Option<String>;

    /// Stores an API token. Values are trimmed; an empty value clears it.
    fn set_api_token(&self, provider: ProviderKind, token: Option<&str>);
}

// ============================================================================
// Provider Settings
// ============================================================================

/// Stored settings for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API token entered by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

// ============================================================================
// In-Memory Settings
// ============================================================================

/// Settings store kept in memory.
///
/// Serializable so an embedding application can persist it however it likes.
#[derive(Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemorySettings {
    providers: RwLock<BTreeMap<ProviderKind, ProviderSettings>>,
}

impl InMemorySettings {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a token for one provider.
    pub fn with_token(provider: ProviderKind, token: &str) -> Self {
        let settings = Self::new();
        settings.set_api_token(provider, Some(token));
        settings
    }

    /// Returns a copy of one provider's settings.
    pub fn provider(&self, provider: ProviderKind) -> ProviderSettings {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&provider)
            .cloned()
            .unwrap_or_default()
    }
}

impl SettingsAccessor for InMemorySettings {
    fn api_token(&self, provider: ProviderKind) -> Option<String> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&provider)
            .and_then(|s| s.api_token.clone())
    }

    fn set_api_token(&self, provider: ProviderKind, token: Option<&str>) {
        let cleaned = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        // Entries are replaced whole, so a poisoned map is still consistent.
        let mut map = self.providers.write().unwrap_or_else(PoisonError::into_inner);

        debug!(provider = %provider, configured = cleaned.is_some(), "Updating API token");
        match cleaned {
            Some(token) => {
                map.entry(provider).or_default().api_token = Some(token);
            }
            None => {
                if let Some(entry) = map.get_mut(&provider) {
                    entry.api_token = None;
                }
                map.retain(|_, s| *s != ProviderSettings::default());
            }
        }
    }
}

impl std::fmt::Debug for InMemorySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let configured: Vec<ProviderKind> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        f.debug_struct("InMemorySettings")
            .field("configured", &configured)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
