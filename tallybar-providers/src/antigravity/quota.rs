//! Per-model quotas and their mapping onto usage windows.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tallybar_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageSnapshot, UsageWindow};

use super::error::AntigravityError;

/// Quota for a single model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelQuota {
    /// Human-readable label (e.g. "Claude Sonnet 4.5").
    pub label: String,
    /// Model identifier.
    pub model_id: String,
    /// Remaining fraction (0.0 to 1.0).
    pub remaining_fraction: Option<f64>,
    /// When this quota resets.
    pub reset_time: Option<DateTime<Utc>>,
}

impl ModelQuota {
    /// Remaining percentage (0-100). A missing fraction counts as exhausted.
    pub fn remaining_percent(&self) -> f64 {
        self.remaining_fraction
            .map_or(0.0, |f| (f * 100.0).clamp(0.0, 100.0))
    }

    /// Used percentage (0-100).
    pub fn used_percent(&self) -> f64 {
        100.0 - self.remaining_percent()
    }

    fn window(&self) -> UsageWindow {
        UsageWindow::percent(self.used_percent())
            .resetting_at(self.reset_time)
            .labeled(self.label.clone())
    }
}

/// Everything one language server call reports.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountQuotas {
    /// Model quotas in server order.
    pub models: Vec<ModelQuota>,
    /// Signed-in account.
    pub email: Option<String>,
    /// Plan display name.
    pub plan: Option<String>,
}

fn is_claude_without_thinking(lower: &str) -> bool {
    lower.contains("claude") && !lower.contains("thinking")
}

fn is_gemini_pro_low(lower: &str) -> bool {
    lower.contains("pro") && lower.contains("low")
}

fn is_gemini_flash(lower: &str) -> bool {
    lower.contains("gemini") && lower.contains("flash")
}

/// Orders models for display: Claude, then Gemini Pro (low), then Gemini
/// Flash. When none of those are present, the most used models come first.
pub fn select_models(models: &[ModelQuota]) -> Vec<&ModelQuota> {
    let preferred: [fn(&str) -> bool; 3] =
        [is_claude_without_thinking, is_gemini_pro_low, is_gemini_flash];

    let mut ordered: Vec<&ModelQuota> = Vec::new();
    for is_match in preferred {
        let found = models
            .iter()
            .find(|m| is_match(&m.label.to_lowercase()) && !ordered.contains(m));
        if let Some(model) = found {
            ordered.push(model);
        }
    }

    if ordered.is_empty() {
        ordered = models.iter().collect();
        ordered.sort_by(|a, b| {
            b.used_percent()
                .partial_cmp(&a.used_percent())
                .unwrap_or(Ordering::Equal)
        });
    }
    ordered
}

/// Builds the normalized snapshot: the first three selected models become
/// the session, weekly and secondary windows, in that order.
pub fn build_snapshot(quotas: &AccountQuotas) -> Result<UsageSnapshot, AntigravityError> {
    let ordered = select_models(&quotas.models);
    if ordered.is_empty() {
        return Err(AntigravityError::NoQuotas);
    }

    let mut snapshot = UsageSnapshot::new();
    snapshot.session = ordered.first().map(|m| m.window());
    snapshot.weekly = ordered.get(1).map(|m| m.window());
    snapshot.secondary = ordered.get(2).map(|m| m.window());

    let mut identity = ProviderIdentity::new(ProviderKind::Antigravity);
    identity.account_email.clone_from(&quotas.email);
    identity.plan_name.clone_from(&quotas.plan);
    identity.login_method = Some(LoginMethod::LocalApp);
    snapshot.identity = Some(identity);

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(label: &str, remaining: Option<f64>) -> ModelQuota {
        ModelQuota {
            label: label.to_string(),
            model_id: label.to_lowercase(),
            remaining_fraction: remaining,
            reset_time: None,
        }
    }

    #[test]
    fn test_percentages() {
        let m = model("Claude", Some(0.75));
        assert_eq!(m.remaining_percent(), 75.0);
        assert_eq!(m.used_percent(), 25.0);

        let exhausted = model("Claude", None);
        assert_eq!(exhausted.used_percent(), 100.0);

        let odd = model("Claude", Some(1.5));
        assert_eq!(odd.used_percent(), 0.0);
    }

    #[test]
    fn test_preferred_order() {
        let models = vec![
            model("Gemini 3 Flash", Some(0.5)),
            model("GPT-OSS 120B", Some(0.1)),
            model("Gemini 3 Pro (Low)", Some(0.9)),
            model("Claude Sonnet 4.5 Thinking", Some(0.2)),
            model("Claude Sonnet 4.5", Some(0.3)),
        ];
        let labels: Vec<_> = select_models(&models).iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Claude Sonnet 4.5", "Gemini 3 Pro (Low)", "Gemini 3 Flash"]);
    }

    #[test]
    fn test_fallback_sorts_by_usage() {
        let models = vec![model("A", Some(0.9)), model("B", Some(0.2)), model("C", Some(0.5))];
        let labels: Vec<_> = select_models(&models).iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_snapshot_windows() {
        let quotas = AccountQuotas {
            models: vec![model("Claude Sonnet 4.5", Some(0.75)), model("Gemini 3 Flash", Some(1.0))],
            email: Some("dev@example.com".to_string()),
            plan: Some("Pro".to_string()),
        };
        let snapshot = build_snapshot(&quotas).unwrap();

        let session = snapshot.session.unwrap();
        assert_eq!(session.used, 25.0);
        assert_eq!(session.limit, Some(100.0));
        assert_eq!(session.label.as_deref(), Some("Claude Sonnet 4.5"));
        assert_eq!(snapshot.weekly.unwrap().used, 0.0);
        assert!(snapshot.secondary.is_none());

        let identity = snapshot.identity.unwrap();
        assert_eq!(identity.account_email.as_deref(), Some("dev@example.com"));
        assert_eq!(identity.login_method, Some(LoginMethod::LocalApp));
    }

    #[test]
    fn test_no_models() {
        assert!(matches!(
            build_snapshot(&AccountQuotas::default()),
            Err(AntigravityError::NoQuotas)
        ));
    }
}
