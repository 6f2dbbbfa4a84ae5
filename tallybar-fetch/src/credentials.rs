//! Credential resolution for API-token strategies.
//!
//! Precedence is fixed: environment variables first, in declared order,
//! then the settings store. A missing credential is `None`, never an error.

use std::fmt;

use tallybar_core::ProviderKind;
use tracing::debug;

use crate::context::{Environment, ProviderFetchContext};
use crate::settings::SettingsAccessor;

// ============================================================================
// Credential
// ============================================================================

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// An environment variable.
    Environment,
    /// The settings store.
    Settings,
}

impl CredentialSource {
    /// Short label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "env",
            Self::Settings => "settings",
        }
    }
}

/// A resolved secret.
///
/// The value never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    source: CredentialSource,
}

impl Credential {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    /// Returns the secret. Only call this to put it on the wire.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Where the credential was found.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Formats an `Authorization: Bearer` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Resolves a provider's API token.
pub fn resolve_token(
    provider: ProviderKind,
    env_keys: &[&str],
    env: &Environment,
    settings: &dyn SettingsAccessor,
) -> Option<Credential> {
    for key in env_keys {
        if let Some(value) = env.get(key).and_then(non_empty) {
            debug!(provider = %provider, source = "env", configured = true, "Resolved API token");
            return Some(Credential::new(value, CredentialSource::Environment));
        }
    }

    let stored = settings.api_token(provider);
    if let Some(value) = stored.as_deref().and_then(non_empty) {
        debug!(provider = %provider, source = "settings", configured = true, "Resolved API token");
        return Some(Credential::new(value, CredentialSource::Settings));
    }

    debug!(provider = %provider, configured = false, "No API token configured");
    None
}

/// Returns true if a token resolves for the provider.
pub fn is_configured(
    provider: ProviderKind,
    env_keys: &[&str],
    env: &Environment,
    settings: &dyn SettingsAccessor,
) -> bool {
    resolve_token(provider, env_keys, env, settings).is_some()
}

// ============================================================================
// Token Resolver
// ============================================================================

/// A provider's token lookup rules, bound once per provider module.
#[derive(Debug, Clone, Copy)]
pub struct TokenResolver {
    provider: ProviderKind,
    env_keys: &'static [&'static str],
}

impl TokenResolver {
    /// Creates a resolver for a provider and its environment variable names.
    pub const fn new(provider: ProviderKind, env_keys: &'static [&'static str]) -> Self {
        Self { provider, env_keys }
    }

    /// Environment variable names, in precedence order.
    pub fn env_keys(&self) -> &'static [&'static str] {
        self.env_keys
    }

    /// Resolves the token from a fetch context.
    pub fn resolve(&self, ctx: &ProviderFetchContext) -> Option<Credential> {
        resolve_token(self.provider, self.env_keys, &ctx.env, ctx.settings.as_ref())
    }

    /// Returns true if a token resolves from the fetch context.
    pub fn is_configured(&self, ctx: &ProviderFetchContext) -> bool {
        self.resolve(ctx).is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::InMemorySettings;

    const KEYS: &[&str] = &["WARP_API_KEY", "WARP_TOKEN"];

    #[test]
    fn test_env_wins_over_settings() {
        let env = Environment::new().with_var("WARP_API_KEY", "from-env");
        let settings = InMemorySettings::with_token(ProviderKind::Warp, "from-settings");

        let cred = resolve_token(ProviderKind::Warp, KEYS, &env, &settings).unwrap();
        assert_eq!(cred.expose(), "from-env");
        assert_eq!(cred.source(), CredentialSource::Environment);
    }

    #[test]
    fn test_env_only() {
        let env = Environment::new().with_var("WARP_TOKEN", " second ");
        let settings = InMemorySettings::new();

        let cred = resolve_token(ProviderKind::Warp, KEYS, &env, &settings).unwrap();
        assert_eq!(cred.expose(), "second");
    }

    #[test]
    fn test_settings_only() {
        let env = Environment::new();
        let settings = InMemorySettings::with_token(ProviderKind::Warp, "from-settings");

        let cred = resolve_token(ProviderKind::Warp, KEYS, &env, &settings).unwrap();
        assert_eq!(cred.expose(), "from-settings");
        assert_eq!(cred.source(), CredentialSource::Settings);
    }

    #[test]
    fn test_neither_is_none() {
        let env = Environment::new();
        let settings = InMemorySettings::new();
        assert!(resolve_token(ProviderKind::Warp, KEYS, &env, &settings).is_none());
        assert!(!is_configured(ProviderKind::Warp, KEYS, &env, &settings));
    }

    #[test]
    fn test_blank_env_falls_through() {
        let env = Environment::new()
            .with_var("WARP_API_KEY", "   ")
            .with_var("WARP_TOKEN", "");
        let settings = InMemorySettings::with_token(ProviderKind::Warp, "stored");

        let cred = resolve_token(ProviderKind::Warp, KEYS, &env, &settings).unwrap();
        assert_eq!(cred.expose(), "stored");
    }

    #[test]
    fn test_declared_order() {
        let env = Environment::new()
            .with_var("WARP_API_KEY", "first")
            .with_var("WARP_TOKEN", "second");
        let settings = InMemorySettings::new();

        let cred = resolve_token(ProviderKind::Warp, KEYS, &env, &settings).unwrap();
        assert_eq!(cred.expose(), "first");
    }

    #[test]
    fn test_redacted_output() {
        let cred = Credential::new("sk-or-secret", CredentialSource::Environment);
        assert!(!format!("{cred:?}").contains("sk-or-secret"));
        assert_eq!(cred.to_string(), "[REDACTED]");
        assert_eq!(cred.bearer(), "Bearer sk-or-secret");
    }
}
