//! Kimi K2 credits client and lenient response parsing.

use serde::Deserialize;
use serde_json::Value;
use tallybar_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageCost, UsageSnapshot, UsageWindow};
use tallybar_fetch::{Credential, HttpClient, ResponseExt};
use tracing::{debug, instrument};

use super::error::KimiK2Error;

// ============================================================================
// Constants
// ============================================================================

/// Kimi K2 credits endpoint.
pub const DEFAULT_CREDITS_URL: &str = "https://kimi-k2.ai/api/user/credits";

const CONSUMED_KEYS: &[&str] = &[
    "total_credits_consumed",
    "credits_consumed",
    "consumed_credits",
    "consumed",
    "used_credits",
    "used",
];

const REMAINING_KEYS: &[&str] = &[
    "credits_remaining",
    "remaining_credits",
    "remaining",
    "balance",
    "available_credits",
];

const TOTAL_KEYS: &[&str] = &["total_credits", "credits_total", "total", "limit"];

/// Objects that have been seen wrapping the figures.
const CONTAINERS: &[&str] = &["data", "usage", "credits", "balance"];

// ============================================================================
// Parsed Credits
// ============================================================================

/// Credit figures extracted from the response.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KimiK2Credits {
    /// Credits consumed so far.
    pub consumed: Option<f64>,
    /// Credits left.
    pub remaining: Option<f64>,
    /// Credits purchased in total.
    pub total: Option<f64>,
}

impl KimiK2Credits {
    /// Credits purchased, derived from consumed + remaining when the total
    /// is not reported.
    pub fn effective_total(&self) -> Option<f64> {
        self.total.or(match (self.consumed, self.remaining) {
            (Some(c), Some(r)) => Some(c + r),
            _ => None,
        })
    }

    /// Credits consumed, derived from total - remaining when not reported.
    pub fn effective_consumed(&self) -> f64 {
        self.consumed
            .or(match (self.total, self.remaining) {
                (Some(t), Some(r)) => Some((t - r).max(0.0)),
                _ => None,
            })
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberValue {
    Number(f64),
    String(String),
}

impl NumberValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberValue::Number(n) => Some(*n),
            NumberValue::String(s) => s.trim().parse().ok(),
        }
    }
}

fn number(value: &Value) -> Option<f64> {
    NumberValue::deserialize(value).ok()?.as_f64()
}

/// Finds the first of `keys` holding a number, in `root` or one level of
/// known wrapper objects (searched breadth first).
fn lookup(root: &Value, keys: &[&str]) -> Option<f64> {
    let mut scopes = vec![root];
    for name in CONTAINERS {
        if let Some(inner) = root.get(*name).filter(|v| v.is_object()) {
            scopes.push(inner);
            for nested in CONTAINERS {
                if let Some(deeper) = inner.get(*nested).filter(|v| v.is_object()) {
                    scopes.push(deeper);
                }
            }
        }
    }

    scopes
        .into_iter()
        .find_map(|scope| keys.iter().find_map(|key| scope.get(*key).and_then(number)))
}

/// Parses the credits response body.
pub fn parse_credits(body: &str) -> Result<KimiK2Credits, KimiK2Error> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| KimiK2Error::InvalidResponse(format!("credits: {e}")))?;

    let credits = KimiK2Credits {
        consumed: lookup(&root, CONSUMED_KEYS),
        remaining: lookup(&root, REMAINING_KEYS),
        total: lookup(&root, TOTAL_KEYS),
    };

    if credits.consumed.is_none() && credits.remaining.is_none() {
        return Err(KimiK2Error::InvalidResponse(
            "no consumed or remaining credit figures".to_string(),
        ));
    }
    Ok(credits)
}

/// Builds the normalized snapshot: credits consumed against credits
/// purchased, as both the weekly window and the cost.
pub fn build_snapshot(credits: &KimiK2Credits) -> UsageSnapshot {
    let used = credits.effective_consumed();
    let total = credits.effective_total();

    let window = match total {
        Some(total) => UsageWindow::with_limit(used, total),
        None => UsageWindow::new(used),
    };

    let mut snapshot = UsageSnapshot::new();
    snapshot.weekly = Some(window.labeled("Credits"));
    snapshot.cost = Some(UsageCost::credits(used, total));

    let mut identity = ProviderIdentity::new(ProviderKind::KimiK2);
    identity.login_method = Some(LoginMethod::ApiKey);
    snapshot.identity = Some(identity);

    snapshot
}

// ============================================================================
// API Client
// ============================================================================

/// Kimi K2 credits client over the shared HTTP client.
#[derive(Debug)]
pub struct KimiK2Client<'a> {
    http: &'a HttpClient,
    url: &'a str,
}

impl<'a> KimiK2Client<'a> {
    /// Creates a client.
    pub fn new(http: &'a HttpClient, url: &'a str) -> Self {
        Self { http, url }
    }

    /// Fetches the credit figures.
    #[instrument(skip(self, credential))]
    pub async fn credits(&self, credential: &Credential) -> Result<KimiK2Credits, KimiK2Error> {
        let response = self.http.get_with_bearer(self.url, credential).await?;
        let status = response.status();

        if response.is_unauthorized() {
            return Err(KimiK2Error::Unauthorized(status.as_u16()));
        }
        if response.is_rate_limited() {
            return Err(KimiK2Error::RateLimited {
                retry_after: response.retry_after_secs(),
            });
        }
        if !status.is_success() {
            return Err(KimiK2Error::Api(status.as_u16()));
        }

        let body = response.text().await?;
        debug!(len = body.len(), "Kimi K2 response received");
        parse_credits(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_shape() {
        let credits =
            parse_credits(r#"{"total_credits_consumed": 25, "credits_remaining": 75}"#).unwrap();
        assert_eq!(credits.consumed, Some(25.0));
        assert_eq!(credits.effective_total(), Some(100.0));

        let snapshot = build_snapshot(&credits);
        let weekly = snapshot.weekly.unwrap();
        assert_eq!(weekly.used_percent(), Some(25.0));
        assert_eq!(snapshot.cost.unwrap().remaining(), Some(75.0));
    }

    #[test]
    fn test_nested_shape_with_string_numbers() {
        let body = r#"{"data": {"usage": {"consumed": "40.5", "remaining": "59.5"}}}"#;
        let credits = parse_credits(body).unwrap();
        assert_eq!(credits.consumed, Some(40.5));
        assert_eq!(credits.remaining, Some(59.5));
        assert_eq!(credits.effective_total(), Some(100.0));
    }

    #[test]
    fn test_remaining_only_with_total() {
        let body = r#"{"data": {"total_credits": 200, "balance": 150}}"#;
        let credits = parse_credits(body).unwrap();
        assert!(credits.consumed.is_none());
        assert_eq!(credits.effective_consumed(), 50.0);

        let snapshot = build_snapshot(&credits);
        assert_eq!(snapshot.weekly.unwrap().limit, Some(200.0));
    }

    #[test]
    fn test_consumed_only() {
        let credits = parse_credits(r#"{"credits": {"used": 12}}"#).unwrap();
        let snapshot = build_snapshot(&credits);
        let weekly = snapshot.weekly.unwrap();
        assert_eq!(weekly.used, 12.0);
        assert!(weekly.limit.is_none());
    }

    #[test]
    fn test_no_figures_is_invalid() {
        assert!(matches!(
            parse_credits(r#"{"data": {"email": "a@b.c"}}"#),
            Err(KimiK2Error::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_credits(r#"{"remaining": "n/a"}"#),
            Err(KimiK2Error::InvalidResponse(_))
        ));
        assert!(matches!(parse_credits("not json"), Err(KimiK2Error::InvalidResponse(_))));
    }
}
