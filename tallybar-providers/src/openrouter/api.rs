//! OpenRouter API client and response mapping.

use serde::Deserialize;
use tallybar_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageCost, UsageSnapshot, UsageWindow};
use tallybar_fetch::{Credential, HttpClient, ResponseExt};
use tracing::{debug, instrument};

use super::error::OpenRouterError;

// ============================================================================
// Constants
// ============================================================================

/// OpenRouter API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const CREDITS_ENDPOINT: &str = "/credits";
const KEY_ENDPOINT: &str = "/key";

const DAY_MINUTES: u32 = 24 * 60;
const WEEK_MINUTES: u32 = 7 * DAY_MINUTES;
const MONTH_MINUTES: u32 = 30 * DAY_MINUTES;

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Account-wide credit balance from `/credits`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenRouterCredits {
    /// Credits purchased, in USD.
    pub total_credits: f64,
    /// Credits spent, in USD.
    pub total_usage: f64,
}

impl OpenRouterCredits {
    /// Remaining balance in USD.
    pub fn balance(&self) -> f64 {
        (self.total_credits - self.total_usage).max(0.0)
    }
}

/// Per-key usage from `/key`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OpenRouterKeyInfo {
    /// Key label (a masked form of the key).
    #[serde(default)]
    pub label: Option<String>,
    /// Spending cap for this key, if any.
    #[serde(default)]
    pub limit: Option<f64>,
    /// Spend left under the cap.
    #[serde(default)]
    pub limit_remaining: Option<f64>,
    /// Lifetime spend on this key.
    #[serde(default)]
    pub usage: f64,
    /// Spend today (UTC).
    #[serde(default)]
    pub usage_daily: Option<f64>,
    /// Spend this week (UTC).
    #[serde(default)]
    pub usage_weekly: Option<f64>,
    /// Spend this month (UTC).
    #[serde(default)]
    pub usage_monthly: Option<f64>,
    /// Whether the account has never purchased credits.
    #[serde(default)]
    pub is_free_tier: bool,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a `/credits` response body.
pub fn parse_credits(body: &str) -> Result<OpenRouterCredits, OpenRouterError> {
    serde_json::from_str::<Envelope<OpenRouterCredits>>(body)
        .map(|e| e.data)
        .map_err(|e| OpenRouterError::InvalidResponse(format!("credits: {e}")))
}

/// Parses a `/key` response body.
pub fn parse_key_info(body: &str) -> Result<OpenRouterKeyInfo, OpenRouterError> {
    serde_json::from_str::<Envelope<OpenRouterKeyInfo>>(body)
        .map(|e| e.data)
        .map_err(|e| OpenRouterError::InvalidResponse(format!("key: {e}")))
}

/// Builds the normalized snapshot.
///
/// Spend is in USD: today's spend is the session window, this week's spend
/// the weekly window, and the key cap (or the month, without a cap) the
/// secondary window.
pub fn build_snapshot(credits: &OpenRouterCredits, key: Option<&OpenRouterKeyInfo>) -> UsageSnapshot {
    let mut snapshot = UsageSnapshot::new();
    snapshot.cost = Some(UsageCost::usd(credits.total_usage, Some(credits.total_credits)));

    let mut identity = ProviderIdentity::new(ProviderKind::OpenRouter);
    identity.login_method = Some(LoginMethod::ApiKey);

    if let Some(key) = key {
        snapshot.session = key
            .usage_daily
            .map(|used| UsageWindow::new(used).spanning(DAY_MINUTES).labeled("Today"));
        snapshot.weekly = key
            .usage_weekly
            .map(|used| UsageWindow::new(used).spanning(WEEK_MINUTES).labeled("This week"));
        snapshot.secondary = match key.limit {
            Some(limit) => Some(UsageWindow::with_limit(key.usage, limit).labeled("Key limit")),
            None => key
                .usage_monthly
                .map(|used| UsageWindow::new(used).spanning(MONTH_MINUTES).labeled("This month")),
        };

        if key.is_free_tier {
            identity.plan_name = Some("Free".to_string());
        }
    }

    snapshot.identity = Some(identity);
    snapshot
}

// ============================================================================
// API Client
// ============================================================================

/// OpenRouter API client over the shared HTTP client.
#[derive(Debug)]
pub struct OpenRouterClient<'a> {
    http: &'a HttpClient,
    base_url: &'a str,
}

impl<'a> OpenRouterClient<'a> {
    /// Creates a client.
    pub fn new(http: &'a HttpClient, base_url: &'a str) -> Self {
        Self { http, base_url }
    }

    /// Fetches the account credit balance.
    #[instrument(skip(self, credential))]
    pub async fn credits(&self, credential: &Credential) -> Result<OpenRouterCredits, OpenRouterError> {
        let body = self.get(CREDITS_ENDPOINT, credential).await?;
        parse_credits(&body)
    }

    /// Fetches usage for the key itself.
    #[instrument(skip(self, credential))]
    pub async fn key_info(&self, credential: &Credential) -> Result<OpenRouterKeyInfo, OpenRouterError> {
        let body = self.get(KEY_ENDPOINT, credential).await?;
        parse_key_info(&body)
    }

    async fn get(&self, endpoint: &str, credential: &Credential) -> Result<String, OpenRouterError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint);
        let response = self.http.get_with_bearer(&url, credential).await?;
        let status = response.status();

        if response.is_unauthorized() {
            return Err(OpenRouterError::Unauthorized(status.as_u16()));
        }
        if response.is_rate_limited() {
            return Err(OpenRouterError::RateLimited {
                retry_after: response.retry_after_secs(),
            });
        }
        if !status.is_success() {
            return Err(OpenRouterError::Api(status.as_u16()));
        }

        let body = response.text().await?;
        debug!(endpoint, len = body.len(), "OpenRouter response received");
        Ok(body)
    }
}

// ============================================================================
// Tests
// ============================================================================
