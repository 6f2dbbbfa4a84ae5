//! Warp fetch strategies.

use async_trait::async_trait;
use tallybar_core::{ProviderKind, UsageSnapshot};
use tallybar_fetch::{FetchError, FetchKind, FetchStrategy, ProviderFetchContext, TokenResolver};
use tracing::{debug, instrument};

use super::api::{DEFAULT_ENDPOINT, WarpClient, build_snapshot};
use super::error::WarpError;

pub(crate) const TOKENS: TokenResolver =
    TokenResolver::new(ProviderKind::Warp, &["WARP_API_KEY", "WARP_TOKEN"]);

/// Fetch strategy that queries Warp's request limits with an API key.
pub struct WarpApiStrategy {
    endpoint: String,
}

impl WarpApiStrategy {
    /// Creates a strategy against the public endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Creates a strategy against another GraphQL endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for WarpApiStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for WarpApiStrategy {
    fn id(&self) -> &str {
        "warp.api"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::ApiToken
    }

    async fn is_available(&self, ctx: &ProviderFetchContext) -> bool {
        TOKENS.is_configured(ctx)
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
        let credential = TOKENS.resolve(ctx).ok_or(WarpError::MissingApiKey)?;
        debug!(source = %credential.source().as_str(), "Fetching Warp usage via API key");

        let usage = WarpClient::new(&ctx.http, &self.endpoint)
            .usage(&credential)
            .await?;
        Ok(build_snapshot(&usage))
    }
}
