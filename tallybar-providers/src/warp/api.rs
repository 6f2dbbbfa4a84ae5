//! Warp GraphQL client and response mapping.

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tallybar_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageSnapshot, UsageWindow};
use tallybar_fetch::{Credential, HttpClient, ResponseExt};
use tracing::{debug, instrument};

use super::error::WarpError;

// ============================================================================
// Constants
// ============================================================================

/// Warp GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://app.warp.dev/graphql/v2?op=GetRequestLimitInfo";

const OPERATION_NAME: &str = "GetRequestLimitInfo";

const QUERY: &str = r"query GetRequestLimitInfo($requestContext: RequestContext!) {
  user(requestContext: $requestContext) {
    __typename
    ... on UserOutput {
      user {
        requestLimitInfo {
          isUnlimited
          nextRefreshTime
          requestLimit
          requestsUsedSinceLastRefresh
        }
        bonusGrants {
          requestCreditsGranted
          requestCreditsRemaining
          expiration
        }
      }
    }
  }
}";

const CLIENT_ID: &str = "warp-app";

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    user: Option<UserOutput>,
}

#[derive(Debug, Deserialize)]
struct UserOutput {
    #[serde(rename = "__typename", default)]
    typename: Option<String>,
    user: Option<WarpUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WarpUser {
    request_limit_info: Option<WarpRequestLimits>,
    #[serde(default)]
    bonus_grants: Vec<WarpBonusGrant>,
}

/// Request allowance for the current refresh period.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarpRequestLimits {
    /// Whether the plan has no request cap.
    #[serde(default)]
    pub is_unlimited: bool,
    /// When the counter resets.
    #[serde(default)]
    pub next_refresh_time: Option<DateTime<Utc>>,
    /// Requests allowed per period.
    #[serde(default)]
    pub request_limit: f64,
    /// Requests consumed since the last reset.
    #[serde(default)]
    pub requests_used_since_last_refresh: f64,
}

/// One-off request credits granted on top of the plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarpBonusGrant {
    /// Credits granted.
    #[serde(default)]
    pub request_credits_granted: f64,
    /// Credits still unused.
    #[serde(default)]
    pub request_credits_remaining: f64,
    /// When the grant lapses.
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

/// Parsed result of the request limit query.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpUsage {
    /// Plan allowance.
    pub limits: WarpRequestLimits,
    /// Bonus grants, possibly empty.
    pub bonus_grants: Vec<WarpBonusGrant>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses the GraphQL response body.
///
/// Usable data wins over `errors`: a partial success still yields usage.
pub fn parse_usage(body: &str) -> Result<WarpUsage, WarpError> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| WarpError::InvalidResponse(format!("graphql: {e}")))?;

    let output = match response.data.and_then(|d| d.user) {
        Some(UserOutput {
            user:
                Some(WarpUser {
                    request_limit_info: Some(limits),
                    bonus_grants,
                }),
            ..
        }) => {
            for error in &response.errors {
                debug!(message = %error.message, "Ignoring GraphQL error next to usable data");
            }
            return Ok(WarpUsage {
                limits,
                bonus_grants,
            });
        }
        other => other,
    };

    if let Some(first) = response.errors.first() {
        let lower = first.message.to_lowercase();
        if lower.contains("unauthorized") || lower.contains("unauthenticated") {
            return Err(WarpError::Unauthorized(first.message.clone()));
        }
        return Err(WarpError::GraphQl(first.message.clone()));
    }

    let output = output.ok_or_else(|| WarpError::InvalidResponse("missing user".to_string()))?;

    if output.user.is_none() {
        // Anything other than UserOutput is the server's way of saying the
        // caller is not signed in.
        let typename = output.typename.unwrap_or_else(|| "unknown".to_string());
        return Err(WarpError::Unauthorized(typename));
    }

    Err(WarpError::InvalidResponse("missing requestLimitInfo".to_string()))
}

/// Builds the normalized snapshot.
///
/// The plan allowance is the weekly window. Bonus grants are summed into
/// the secondary window, which resets when the earliest live grant expires.
pub fn build_snapshot(usage: &WarpUsage) -> UsageSnapshot {
    let limits = &usage.limits;
    let mut snapshot = UsageSnapshot::new();

    let weekly = if limits.is_unlimited {
        UsageWindow::new(limits.requests_used_since_last_refresh).labeled("Unlimited")
    } else {
        UsageWindow::with_limit(limits.requests_used_since_last_refresh, limits.request_limit)
            .labeled("Requests")
    };
    snapshot.weekly = Some(weekly.resetting_at(limits.next_refresh_time));

    if !usage.bonus_grants.is_empty() {
        let granted: f64 = usage.bonus_grants.iter().map(|g| g.request_credits_granted).sum();
        let remaining: f64 = usage.bonus_grants.iter().map(|g| g.request_credits_remaining).sum();
        let next_expiry = usage
            .bonus_grants
            .iter()
            .filter(|g| g.request_credits_remaining > 0.0)
            .filter_map(|g| g.expiration)
            .min();

        snapshot.secondary = Some(
            UsageWindow::with_limit((granted - remaining).max(0.0), granted)
                .resetting_at(next_expiry)
                .labeled("Bonus credits"),
        );
    }

    let mut identity = ProviderIdentity::new(ProviderKind::Warp);
    identity.login_method = Some(LoginMethod::ApiKey);
    if limits.is_unlimited {
        identity.plan_name = Some("Unlimited".to_string());
    }
    snapshot.identity = Some(identity);

    snapshot
}

// ============================================================================
// API Client
// ============================================================================

/// Warp GraphQL client over the shared HTTP client.
#[derive(Debug)]
pub struct WarpClient<'a> {
    http: &'a HttpClient,
    endpoint: &'a str,
}

impl<'a> WarpClient<'a> {
    /// Creates a client.
    pub fn new(http: &'a HttpClient, endpoint: &'a str) -> Self {
        Self { http, endpoint }
    }

    /// Runs the request limit query.
    #[instrument(skip(self, credential))]
    pub async fn usage(&self, credential: &Credential) -> Result<WarpUsage, WarpError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&credential.bearer())
            .map_err(|_| WarpError::Unauthorized("API key is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert("x-warp-client-id", HeaderValue::from_static(CLIENT_ID));

        let body = json!({
            "operationName": OPERATION_NAME,
            "query": QUERY,
            "variables": {
                "requestContext": {
                    "clientContext": {},
                    "osContext": {}
                }
            }
        });

        let response = self
            .http
            .post_json_with_headers(self.endpoint, headers, &body)
            .await?;
        let status = response.status();

        if response.is_unauthorized() {
            return Err(WarpError::Unauthorized(format!("HTTP {}", status.as_u16())));
        }
        if response.is_rate_limited() {
            return Err(WarpError::RateLimited {
                retry_after: response.retry_after_secs(),
            });
        }
        if !status.is_success() {
            return Err(WarpError::Api(status.as_u16()));
        }

        let text = response.text().await?;
        debug!(len = text.len(), "Warp response received");
        parse_usage(&text)
    }
}

// ============================================================================
// Tests
// ============================================================================
