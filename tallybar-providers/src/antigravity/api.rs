//! Language server API client.
//!
//! The server speaks Connect-style JSON over HTTPS on loopback with a
//! self-signed certificate.

use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tallybar_fetch::HttpClient;
use tracing::{debug, instrument};

use super::error::AntigravityError;
use super::quota::{AccountQuotas, ModelQuota};

// ============================================================================
// Constants
// ============================================================================

const SERVICE: &str = "/exa.language_server_pb.LanguageServerService";
const GET_USER_STATUS: &str = "GetUserStatus";
const GET_COMMAND_MODEL_CONFIGS: &str = "GetCommandModelConfigs";
const GET_UNLEASH_DATA: &str = "GetUnleashData";

const CSRF_HEADER: &str = "x-codeium-csrf-token";

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatusResponse {
    code: Option<CodeValue>,
    user_status: Option<UserStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandModelConfigResponse {
    code: Option<CodeValue>,
    client_model_configs: Option<Vec<ModelConfig>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatus {
    email: Option<String>,
    plan_status: Option<PlanStatus>,
    cascade_model_config_data: Option<ModelConfigData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanStatus {
    plan_info: Option<PlanInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanInfo {
    plan_name: Option<String>,
    plan_display_name: Option<String>,
    display_name: Option<String>,
    product_name: Option<String>,
}

impl PlanInfo {
    fn preferred_name(&self) -> Option<&str> {
        [
            &self.plan_display_name,
            &self.display_name,
            &self.product_name,
            &self.plan_name,
        ]
        .into_iter()
        .find_map(|name| name.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelConfigData {
    client_model_configs: Option<Vec<ModelConfig>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelConfig {
    label: String,
    model_or_alias: Option<ModelAlias>,
    quota_info: Option<QuotaInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelAlias {
    model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotaInfo {
    remaining_fraction: Option<f64>,
    reset_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodeValue {
    Int(i64),
    String(String),
}

impl CodeValue {
    fn is_ok(&self) -> bool {
        match self {
            CodeValue::Int(v) => *v == 0,
            CodeValue::String(s) => {
                let lower = s.to_lowercase();
                lower == "ok" || lower == "success" || lower == "0"
            }
        }
    }
}

fn check_code(code: Option<&CodeValue>) -> Result<(), AntigravityError> {
    match code {
        Some(code) if !code.is_ok() => Err(AntigravityError::Api(format!("code {code:?}"))),
        _ => Ok(()),
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_reset_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn quotas_from(configs: Vec<ModelConfig>) -> Vec<ModelQuota> {
    configs
        .into_iter()
        .filter_map(|config| {
            let quota = config.quota_info?;
            Some(ModelQuota {
                model_id: config
                    .model_or_alias
                    .map(|m| m.model)
                    .unwrap_or_else(|| config.label.clone()),
                label: config.label,
                remaining_fraction: quota.remaining_fraction,
                reset_time: quota.reset_time.as_deref().and_then(parse_reset_time),
            })
        })
        .collect()
}

/// Parses a `GetUserStatus` body.
pub fn parse_user_status(body: &str) -> Result<AccountQuotas, AntigravityError> {
    let response: UserStatusResponse = serde_json::from_str(body)
        .map_err(|e| AntigravityError::InvalidResponse(format!("{GET_USER_STATUS}: {e}")))?;
    check_code(response.code.as_ref())?;

    let status = response
        .user_status
        .ok_or_else(|| AntigravityError::InvalidResponse("missing userStatus".to_string()))?;

    let plan = status
        .plan_status
        .and_then(|p| p.plan_info)
        .and_then(|info| info.preferred_name().map(String::from));
    let models = status
        .cascade_model_config_data
        .and_then(|d| d.client_model_configs)
        .unwrap_or_default();

    Ok(AccountQuotas {
        models: quotas_from(models),
        email: status.email,
        plan,
    })
}

/// Parses a `GetCommandModelConfigs` body. Carries no account details.
pub fn parse_command_model_configs(body: &str) -> Result<AccountQuotas, AntigravityError> {
    let response: CommandModelConfigResponse = serde_json::from_str(body).map_err(|e| {
        AntigravityError::InvalidResponse(format!("{GET_COMMAND_MODEL_CONFIGS}: {e}"))
    })?;
    check_code(response.code.as_ref())?;

    Ok(AccountQuotas {
        models: quotas_from(response.client_model_configs.unwrap_or_default()),
        email: None,
        plan: None,
    })
}

fn request_metadata() -> Value {
    json!({
        "metadata": {
            "ideName": "antigravity",
            "extensionName": "antigravity",
            "ideVersion": "unknown",
            "locale": "en"
        }
    })
}

// ============================================================================
// API Client
// ============================================================================

/// Client for one language server instance.
#[derive(Debug)]
pub struct LanguageServerClient<'a> {
    http: &'a HttpClient,
    port: u16,
    csrf_token: &'a str,
}

impl<'a> LanguageServerClient<'a> {
    /// Creates a client for a port.
    pub fn new(http: &'a HttpClient, port: u16, csrf_token: &'a str) -> Self {
        Self {
            http,
            port,
            csrf_token,
        }
    }

    /// Returns the first port in `ports` that answers a cheap request.
    pub async fn first_responsive(
        http: &'a HttpClient,
        ports: &[u16],
        csrf_token: &'a str,
    ) -> Result<LanguageServerClient<'a>, AntigravityError> {
        for &port in ports {
            let client = Self::new(http, port, csrf_token);
            match client.ping().await {
                Ok(()) => return Ok(client),
                Err(e) => debug!(port, error = %e, "Port did not answer"),
            }
        }
        Err(AntigravityError::PortDetectionFailed("no working API port".to_string()))
    }

    /// Fetches quotas, preferring `GetUserStatus` and falling back to
    /// `GetCommandModelConfigs`.
    #[instrument(skip(self), fields(port = self.port))]
    pub async fn quotas(&self) -> Result<AccountQuotas, AntigravityError> {
        match self.call(GET_USER_STATUS, &request_metadata()).await {
            Ok(body) => match parse_user_status(&body) {
                Ok(quotas) if !quotas.models.is_empty() => return Ok(quotas),
                Ok(_) => debug!("User status carried no model quotas"),
                Err(e) => debug!(error = %e, "User status unusable"),
            },
            Err(e) => debug!(error = %e, "User status request failed"),
        }

        let body = self
            .call(GET_COMMAND_MODEL_CONFIGS, &request_metadata())
            .await?;
        parse_command_model_configs(&body)
    }

    async fn ping(&self) -> Result<(), AntigravityError> {
        let body = json!({
            "context": {
                "properties": {
                    "ide": "antigravity",
                    "installationId": "tallybar"
                }
            }
        });
        self.call(GET_UNLEASH_DATA, &body).await.map(|_| ())
    }

    async fn call(&self, method: &str, body: &Value) -> Result<String, AntigravityError> {
        let url = format!("https://127.0.0.1:{}{SERVICE}/{method}", self.port);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("connect-protocol-version", HeaderValue::from_static("1"));
        headers.insert(
            CSRF_HEADER,
            HeaderValue::from_str(self.csrf_token)
                .map_err(|_| AntigravityError::Api("CSRF token is not a valid header".to_string()))?,
        );

        let response = self.http.post_json_with_headers(&url, headers, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AntigravityError::Api(format!("{method} returned HTTP {status}")));
        }
        Ok(response.text().await?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_status() {
        let body = r#"{
            "code": 0,
            "userStatus": {
                "email": "dev@example.com",
                "planStatus": {"planInfo": {"planName": "pro", "planDisplayName": "Pro Plan"}},
                "cascadeModelConfigData": {
                    "clientModelConfigs": [
                        {
                            "label": "Claude Sonnet 4.5",
                            "modelOrAlias": {"model": "MODEL_CLAUDE"},
                            "quotaInfo": {"remainingFraction": 0.75, "resetTime": "2026-10-15T18:00:00Z"}
                        },
                        {"label": "No quota model", "modelOrAlias": {"model": "X"}}
                    ]
                }
            }
        }"#;

        let quotas = parse_user_status(body).unwrap();
        assert_eq!(quotas.email.as_deref(), Some("dev@example.com"));
        assert_eq!(quotas.plan.as_deref(), Some("Pro Plan"));
        assert_eq!(quotas.models.len(), 1);
        assert_eq!(quotas.models[0].model_id, "MODEL_CLAUDE");
        assert!(quotas.models[0].reset_time.is_some());
    }

    #[test]
    fn test_error_code_rejected() {
        assert!(matches!(
            parse_user_status(r#"{"code": "permission_denied"}"#),
            Err(AntigravityError::Api(_))
        ));
        assert!(matches!(
            parse_command_model_configs(r#"{"code": 7}"#),
            Err(AntigravityError::Api(_))
        ));
    }

    #[test]
    fn test_parse_command_model_configs() {
        let body = r#"{"code": "OK", "clientModelConfigs": [
            {"label": "Gemini 3 Flash", "quotaInfo": {"remainingFraction": 0.5, "resetTime": "1760551200"}}
        ]}"#;
        let quotas = parse_command_model_configs(body).unwrap();
        assert!(quotas.email.is_none());
        assert_eq!(quotas.models[0].model_id, "Gemini 3 Flash");
        assert!(quotas.models[0].reset_time.is_some());
    }

    #[test]
    fn test_parse_reset_time() {
        assert!(parse_reset_time("2024-01-15T12:00:00Z").is_some());
        assert!(parse_reset_time("1705320000").is_some());
        assert!(parse_reset_time("soon").is_none());
    }

    #[test]
    fn test_missing_user_status() {
        assert!(matches!(
            parse_user_status(r#"{"code": 0}"#),
            Err(AntigravityError::InvalidResponse(_))
        ));
    }
}
