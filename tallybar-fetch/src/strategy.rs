//! Fetch strategy trait and types.
//!
//! A strategy represents one method of fetching usage data from a provider.
//! Providers can have multiple strategies (local probe, API token, etc.)
//! that are tried in the order their fetch plan returns them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tallybar_core::UsageSnapshot;

use crate::context::ProviderFetchContext;
use crate::error::FetchError;

// ============================================================================
// Fetch Kind
// ============================================================================

/// The kind of fetch mechanism a strategy uses.
///
/// This is a diagnostic tag. The pipeline never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// CLI tool
    Cli,
    /// Web session
    Web,
    /// OAuth token authentication
    OAuth,
    /// API token authentication
    ApiToken,
    /// Local file/process probing
    LocalProbe,
    /// Web dashboard scraping
    WebDashboard,
}

impl FetchKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cli => "CLI",
            Self::Web => "Web",
            Self::OAuth => "OAuth",
            Self::ApiToken => "API Token",
            Self::LocalProbe => "Local Probe",
            Self::WebDashboard => "Web Dashboard",
        }
    }

    /// Label recorded in `UsageSnapshot::source` for this kind.
    pub fn source_label(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Web | Self::WebDashboard => "web",
            Self::OAuth => "oauth",
            Self::ApiToken => "api",
            Self::LocalProbe => "local",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Fetch Strategy Trait
// ============================================================================

/// A strategy for fetching usage data from a provider.
///
/// ## Implementing a Strategy
///
/// ```ignore
/// struct WarpApiStrategy;
///
/// #[async_trait]
/// impl FetchStrategy for WarpApiStrategy {
///     fn id(&self) -> &str {
///         "warp.api"
///     }
///
///     fn kind(&self) -> FetchKind {
///         FetchKind::ApiToken
///     }
///
///     async fn is_available(&self, ctx: &ProviderFetchContext) -> bool {
///         TOKENS.is_configured(ctx)
///     }
///
///     async fn fetch(&self, ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
///         // Call the API and normalize the response
///     }
/// }
/// ```
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Unique identifier for this strategy (e.g., "warp.api", "jetbrains.local").
    ///
    /// Format: `{provider}.{method}`
    fn id(&self) -> &str;

    /// The kind of fetch this strategy uses.
    fn kind(&self) -> FetchKind;

    /// Label stamped into the snapshot's `source` on success.
    fn source_label(&self) -> &'static str {
        self.kind().source_label()
    }

    /// Human-readable name for this strategy.
    fn display_name(&self) -> String {
        format!("{} ({})", self.id(), self.kind().display_name())
    }

    /// Check if this strategy can run right now.
    ///
    /// This should be a quick check without network traffic:
    /// - API token strategy: a credential resolves
    /// - Local probe: the quota file exists or the process is running
    async fn is_available(&self, ctx: &ProviderFetchContext) -> bool;

    /// Fetch and normalize usage data.
    async fn fetch(&self, ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError>;

    /// Whether the next strategy may be tried after this one failed.
    fn should_fallback(&self, error: &FetchError, _ctx: &ProviderFetchContext) -> bool {
        match error {
            // Waiting is the fix, another strategy would hit the same limit
            FetchError::RateLimited { .. } => false,
            // Likely a config issue the user has to see
            FetchError::AuthenticationFailed(_) => false,
            _ => true,
        }
    }
}

// ============================================================================
// Strategy Info
// ============================================================================

/// Information about a strategy (for reporting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Strategy ID.
    pub id: String,
    /// Strategy kind.
    pub kind: FetchKind,
    /// Whether the strategy is available.
    pub available: bool,
}

impl StrategyInfo {
    /// Creates strategy info from a strategy implementation.
    pub async fn from_strategy(strategy: &dyn FetchStrategy, ctx: &ProviderFetchContext) -> Self {
        Self {
            id: strategy.id().to_string(),
            kind: strategy.kind(),
            available: strategy.is_available(ctx).await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
