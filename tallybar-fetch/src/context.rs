//! Fetch context handed to strategies.
//!
//! A context is created per fetch request. It carries the provider and
//! requested mode, an environment snapshot, the settings accessor, and the
//! shared transports.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tallybar_core::{CoreError, ProviderKind};

use crate::host::{http::HttpClient, process::ProcessRunner};
use crate::settings::{InMemorySettings, SettingsAccessor};

/// Default transport timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Source Mode
// ============================================================================

/// Which family of strategies the caller asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Let the provider pick its preferred chain.
    #[default]
    Auto,
    /// Web-session strategies.
    Web,
    /// CLI / local application strategies.
    Cli,
    /// OAuth strategies.
    OAuth,
    /// API token strategies.
    Api,
}

impl SourceMode {
    /// Returns all source modes.
    pub fn all() -> &'static [SourceMode] {
        &[Self::Auto, Self::Web, Self::Cli, Self::OAuth, Self::Api]
    }

    /// Returns the lowercase name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Web => "web",
            Self::Cli => "cli",
            Self::OAuth => "oauth",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str() == needle)
            .ok_or_else(|| CoreError::InvalidData(format!("unknown source mode: {s}")))
    }
}

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Timeout for individual HTTP requests and subprocesses.
    pub timeout: Duration,
    /// Deadline applied to a whole fetch when the caller gives none.
    pub default_deadline: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_deadline: None,
        }
    }
}

impl FetchSettings {
    /// Sets the transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default deadline.
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = Some(deadline);
        self
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Snapshot of environment variables taken when a fetch starts.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Returns a variable's value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Sets a variable, returning the updated snapshot.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Number of variables in the snapshot.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Values may hold API keys, so only the size is printed.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("vars", &self.vars.len())
            .finish()
    }
}

// ============================================================================
// Provider Fetch Context
// ============================================================================

/// Context provided to fetch strategies.
#[derive(Clone)]
pub struct ProviderFetchContext {
    /// Provider being fetched.
    pub provider: ProviderKind,
    /// Requested source mode.
    pub source_mode: SourceMode,
    /// Environment snapshot.
    pub env: Environment,
    /// Settings accessor.
    pub settings: Arc<dyn SettingsAccessor>,
    /// HTTP client with tracing.
    pub http: Arc<HttpClient>,
    /// Process runner for local tools.
    pub process: Arc<ProcessRunner>,
    /// Fetch settings.
    pub fetch_settings: FetchSettings,
}

impl ProviderFetchContext {
    /// Creates a builder for the given provider.
    pub fn builder(provider: ProviderKind) -> ProviderFetchContextBuilder {
        ProviderFetchContextBuilder::new(provider)
    }

    /// Returns the transport timeout.
    pub fn timeout(&self) -> Duration {
        self.fetch_settings.timeout
    }
}

impl fmt::Debug for ProviderFetchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderFetchContext")
            .field("provider", &self.provider)
            .field("source_mode", &self.source_mode)
            .field("env", &self.env)
            .field("fetch_settings", &self.fetch_settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Provider Fetch Context Builder
// ============================================================================

/// Builder for constructing a [`ProviderFetchContext`].
pub struct ProviderFetchContextBuilder {
    provider: ProviderKind,
    source_mode: SourceMode,
    env: Option<Environment>,
    settings: Option<Arc<dyn SettingsAccessor>>,
    http: Option<Arc<HttpClient>>,
    process: Option<Arc<ProcessRunner>>,
    fetch_settings: FetchSettings,
}

impl ProviderFetchContextBuilder {
    /// Creates a new builder.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            source_mode: SourceMode::Auto,
            env: None,
            settings: None,
            http: None,
            process: None,
            fetch_settings: FetchSettings::default(),
        }
    }

    /// Sets the source mode.
    pub fn source_mode(mut self, mode: SourceMode) -> Self {
        self.source_mode = mode;
        self
    }

    /// Sets the environment snapshot.
    pub fn env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Sets the settings accessor.
    pub fn settings(mut self, settings: Arc<dyn SettingsAccessor>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the process runner.
    pub fn process(mut self, process: Arc<ProcessRunner>) -> Self {
        self.process = Some(process);
        self
    }

    /// Sets the fetch settings.
    pub fn fetch_settings(mut self, fetch_settings: FetchSettings) -> Self {
        self.fetch_settings = fetch_settings;
        self
    }

    /// Builds the context.
    ///
    /// Without an explicit environment the process environment is
    /// snapshotted. Without settings an empty in-memory store is used.
    pub fn build(self) -> ProviderFetchContext {
        let timeout = self.fetch_settings.timeout;
        ProviderFetchContext {
            provider: self.provider,
            source_mode: self.source_mode,
            env: self.env.unwrap_or_else(Environment::from_process),
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(InMemorySettings::new())),
            http: self
                .http
                .unwrap_or_else(|| Arc::new(HttpClient::with_timeout(timeout))),
            process: self
                .process
                .unwrap_or_else(|| Arc::new(ProcessRunner::with_timeout(timeout))),
            fetch_settings: self.fetch_settings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
