//! OpenRouter fetch strategies.

use async_trait::async_trait;
use tallybar_core::{ProviderKind, UsageSnapshot};
use tallybar_fetch::{FetchError, FetchKind, FetchStrategy, ProviderFetchContext, TokenResolver};
use tracing::{debug, instrument};

use super::api::{DEFAULT_BASE_URL, OpenRouterClient, build_snapshot};
use super::error::OpenRouterError;

/// Where the OpenRouter key is looked up.
pub(crate) const TOKENS: TokenResolver =
    TokenResolver::new(ProviderKind::OpenRouter, &["OPENROUTER_API_KEY"]);

/// Fetch strategy that reads OpenRouter credits with an API key.
pub struct OpenRouterApiStrategy {
    base_url: String,
}

impl OpenRouterApiStrategy {
    /// Creates a strategy against the public API.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a strategy against another base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for OpenRouterApiStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for OpenRouterApiStrategy {
    fn id(&self) -> &str {
        "openrouter.api"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::ApiToken
    }

    async fn is_available(&self, ctx: &ProviderFetchContext) -> bool {
        TOKENS.is_configured(ctx)
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
        debug!("Fetching OpenRouter usage via API key");

        let credential = TOKENS.resolve(ctx).ok_or(OpenRouterError::MissingApiKey)?;
        let client = OpenRouterClient::new(&ctx.http, &self.base_url);

        let credits = client.credits(&credential).await?;

        // Per-key figures are a bonus; the credit balance alone is a valid result.
        let key = match client.key_info(&credential).await {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(error = %e, "Key usage unavailable");
                None
            }
        };

        Ok(build_snapshot(&credits, key.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fetch_error, serve_canned, token_context};
    use std::sync::Arc;
    use tallybar_fetch::{Environment, InMemorySettings};

    #[tokio::test]
    async fn test_availability_follows_credentials() {
        let strategy = OpenRouterApiStrategy::new();
        assert_eq!(strategy.id(), "openrouter.api");
        assert_eq!(strategy.source_label(), "api");

        let without = ProviderFetchContext::builder(ProviderKind::OpenRouter)
            .env(Environment::new())
            .build();
        assert!(!strategy.is_available(&without).await);

        let with = ProviderFetchContext::builder(ProviderKind::OpenRouter)
            .env(Environment::new())
            .settings(Arc::new(InMemorySettings::with_token(ProviderKind::OpenRouter, "sk-or-1")))
            .build();
        assert!(strategy.is_available(&with).await);
    }

    #[tokio::test]
    async fn test_missing_key_maps_to_missing_credentials() {
        let strategy = OpenRouterApiStrategy::new();
        let ctx = ProviderFetchContext::builder(ProviderKind::OpenRouter)
            .env(Environment::new())
            .build();

        let err = strategy.fetch(&ctx).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingCredentials(_)));
        assert!(strategy.should_fallback(&err, &ctx));
    }

    #[tokio::test]
    async fn test_http_status_decides_fallback() {
        let ctx = token_context(ProviderKind::OpenRouter);

        let url = serve_canned(401, &[], r#"{"error": "bad key"}"#).await;
        let (err, fallback) = fetch_error(&OpenRouterApiStrategy::with_base_url(url), &ctx).await;
        assert!(matches!(err, FetchError::AuthenticationFailed(_)));
        assert!(!fallback);

        let url = serve_canned(403, &[], "{}").await;
        let (err, fallback) = fetch_error(&OpenRouterApiStrategy::with_base_url(url), &ctx).await;
        assert!(matches!(err, FetchError::AuthenticationFailed(_)));
        assert!(!fallback);

        let url = serve_canned(429, &[("retry-after", "7")], "{}").await;
        let (err, fallback) = fetch_error(&OpenRouterApiStrategy::with_base_url(url), &ctx).await;
        assert!(matches!(err, FetchError::RateLimited { retry_after: Some(7) }));
        assert!(!fallback);

        let url = serve_canned(500, &[], "oops").await;
        let (err, fallback) = fetch_error(&OpenRouterApiStrategy::with_base_url(url), &ctx).await;
        assert!(matches!(err, FetchError::InvalidResponse(ref msg) if msg.contains("500")));
        assert!(fallback);
    }

    #[tokio::test]
    async fn test_successful_fetch_reads_credits() {
        let url = serve_canned(200, &[], r#"{"data": {"total_credits": 50.0, "total_usage": 12.5}}"#).await;
        let strategy = OpenRouterApiStrategy::with_base_url(url);

        let snapshot = strategy.fetch(&token_context(ProviderKind::OpenRouter)).await.unwrap();
        let cost = snapshot.cost.unwrap();
        assert_eq!(cost.used, 12.5);
        assert_eq!(cost.limit, Some(50.0));
    }
}
