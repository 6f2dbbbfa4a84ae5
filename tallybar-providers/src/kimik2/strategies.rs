//! Kimi K2 fetch strategies.

use async_trait::async_trait;
use tallybar_core::{ProviderKind, UsageSnapshot};
use tallybar_fetch::{FetchError, FetchKind, FetchStrategy, ProviderFetchContext, TokenResolver};
use tracing::{debug, instrument};

use super::api::{DEFAULT_CREDITS_URL, KimiK2Client, build_snapshot};
use super::error::KimiK2Error;

pub(crate) const TOKENS: TokenResolver = TokenResolver::new(
    ProviderKind::KimiK2,
    &["KIMI_K2_API_KEY", "KIMI_API_KEY", "KIMI_KEY"],
);

/// Fetch strategy that reads the Kimi K2 credit balance with an API key.
pub struct KimiK2ApiStrategy {
    url: String,
}

impl KimiK2ApiStrategy {
    /// Creates a strategy against the public endpoint.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_CREDITS_URL)
    }

    /// Creates a strategy against another credits URL.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for KimiK2ApiStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for KimiK2ApiStrategy {
    fn id(&self) -> &str {
        "kimik2.api"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::ApiToken
    }

    async fn is_available(&self, ctx: &ProviderFetchContext) -> bool {
        TOKENS.is_configured(ctx)
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
        debug!("Fetching Kimi K2 credits");

        let credential = TOKENS.resolve(ctx).ok_or(KimiK2Error::MissingApiKey)?;
        let credits = KimiK2Client::new(&ctx.http, &self.url)
            .credits(&credential)
            .await?;
        Ok(build_snapshot(&credits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fetch_error, serve_canned, token_context};
    use tallybar_fetch::Environment;

    #[test]
    fn test_env_key_order() {
        let ctx = ProviderFetchContext::builder(ProviderKind::KimiK2)
            .env(
                Environment::new()
                    .with_var("KIMI_KEY", "third")
                    .with_var("KIMI_API_KEY", "second"),
            )
            .build();
        assert_eq!(TOKENS.resolve(&ctx).unwrap().expose(), "second");
    }

    #[tokio::test]
    async fn test_unavailable_without_key() {
        let ctx = ProviderFetchContext::builder(ProviderKind::KimiK2)
            .env(Environment::new())
            .build();
        assert!(!KimiK2ApiStrategy::new().is_available(&ctx).await);
    }

    #[tokio::test]
    async fn test_http_status_decides_fallback() {
        let ctx = token_context(ProviderKind::KimiK2);

        let url = serve_canned(403, &[], "{}").await;
        let (err, fallback) = fetch_error(&KimiK2ApiStrategy::with_url(url), &ctx).await;
        assert!(matches!(err, FetchError::AuthenticationFailed(_)));
        assert!(!fallback);

        let url = serve_canned(429, &[("retry-after", "7")], "{}").await;
        let (err, fallback) = fetch_error(&KimiK2ApiStrategy::with_url(url), &ctx).await;
        assert!(matches!(err, FetchError::RateLimited { retry_after: Some(7) }));
        assert!(!fallback);

        let url = serve_canned(503, &[], "{}").await;
        let (err, fallback) = fetch_error(&KimiK2ApiStrategy::with_url(url), &ctx).await;
        assert!(matches!(err, FetchError::InvalidResponse(ref msg) if msg.contains("503")));
        assert!(fallback);
    }

    #[tokio::test]
    async fn test_fetch_maps_credits() {
        let url = serve_canned(200, &[], r#"{"data": {"consumed": 30, "remaining": 70}}"#).await;
        let snapshot = KimiK2ApiStrategy::with_url(url)
            .fetch(&token_context(ProviderKind::KimiK2))
            .await
            .unwrap();
        let weekly = snapshot.weekly.unwrap();
        assert_eq!(weekly.used, 30.0);
        assert_eq!(weekly.limit, Some(100.0));
    }
}
