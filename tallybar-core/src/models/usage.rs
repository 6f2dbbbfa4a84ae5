//! Usage-related types.
//!
//! This module contains the normalized usage model every provider converges to:
//! - [`UsageSnapshot`] - Main container with session, weekly and secondary windows
//! - [`UsageWindow`] - Individual usage window
//! - [`UsageCost`] - Spend figure for credit-based providers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderIdentity;
use crate::error::CoreError;

// ============================================================================
// Usage Snapshot
// ============================================================================

/// Normalized result of a successful fetch.
///
/// - **Session** = short window (requests today, session quota, ...)
/// - **Weekly** = weekly/monthly/refill window
/// - **Secondary** = optional extra metric (second model tier, bonus credits)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Session usage window.
    pub session: Option<UsageWindow>,
    /// Weekly/refill usage window.
    pub weekly: Option<UsageWindow>,
    /// Secondary metric window.
    pub secondary: Option<UsageWindow>,
    /// Spend figure, for providers that bill in credits or currency.
    pub cost: Option<UsageCost>,
    /// Label of the strategy kind that produced this snapshot ("local", "api", ...).
    #[serde(default)]
    pub source: String,
    /// When this snapshot was fetched.
    pub updated_at: DateTime<Utc>,
    /// Account identity for this provider.
    pub identity: Option<ProviderIdentity>,
}

impl UsageSnapshot {
    /// Creates a new empty usage snapshot.
    pub fn new() -> Self {
        Self {
            session: None,
            weekly: None,
            secondary: None,
            cost: None,
            source: String::new(),
            updated_at: Utc::now(),
            identity: None,
        }
    }

    /// Returns true if this snapshot is stale (older than threshold).
    pub fn is_stale(&self, threshold: Duration) -> bool {
        Utc::now() - self.updated_at > threshold
    }

    /// Returns true if any window with a known limit is above 80%.
    pub fn is_approaching_limit(&self) -> bool {
        self.windows().any(UsageWindow::is_approaching_limit)
    }

    /// Returns the highest known usage percentage across all windows.
    pub fn max_usage_percent(&self) -> Option<f64> {
        self.windows()
            .filter_map(UsageWindow::used_percent)
            .fold(None, |max, pct| Some(max.map_or(pct, |m: f64| m.max(pct))))
    }

    /// Returns true if any window or cost data is present.
    pub fn has_data(&self) -> bool {
        self.windows().next().is_some() || self.cost.is_some()
    }

    /// Returns true if the source label has been stamped.
    pub fn has_source(&self) -> bool {
        !self.source.trim().is_empty()
    }

    fn windows(&self) -> impl Iterator<Item = &UsageWindow> {
        [&self.session, &self.weekly, &self.secondary]
            .into_iter()
            .flatten()
    }
}

impl Default for UsageSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageSnapshot {
    /// Validates the snapshot data.
    ///
    /// Every numeric field must be finite and non-negative. This should be
    /// called after parsing provider responses to catch malformed data.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` naming the offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(ref session) = self.session {
            session
                .validate()
                .map_err(|e| CoreError::InvalidData(format!("session window: {e}")))?;
        }
        if let Some(ref weekly) = self.weekly {
            weekly
                .validate()
                .map_err(|e| CoreError::InvalidData(format!("weekly window: {e}")))?;
        }
        if let Some(ref secondary) = self.secondary {
            secondary
                .validate()
                .map_err(|e| CoreError::InvalidData(format!("secondary window: {e}")))?;
        }
        if let Some(ref cost) = self.cost {
            cost.validate()
                .map_err(|e| CoreError::InvalidData(format!("cost: {e}")))?;
        }
        Ok(())
    }

    /// Clamps every numeric field into its valid range.
    ///
    /// Unlike `validate()`, this fixes invalid values instead of returning
    /// an error. Use when you want to be lenient with buggy responses.
    pub fn sanitize(&mut self) {
        for window in [&mut self.session, &mut self.weekly, &mut self.secondary]
            .into_iter()
            .flatten()
        {
            window.sanitize();
        }
        if let Some(ref mut cost) = self.cost {
            cost.sanitize();
        }
    }
}

// ============================================================================
// Usage Window
// ============================================================================

/// A single usage window.
///
/// `used` is in provider units (requests, credits, or percent when `limit`
/// is 100). `limit` is optional because some providers only report
/// consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Amount consumed in this window.
    pub used: f64,
    /// Allowance for this window, when known.
    pub limit: Option<f64>,
    /// Window duration in minutes (1440 = 1 day, 10080 = 1 week).
    pub window_minutes: Option<u32>,
    /// When this window resets.
    pub resets_at: Option<DateTime<Utc>>,
    /// Short label for the window (e.g. a model name).
    pub label: Option<String>,
}

impl UsageWindow {
    /// Creates a window with only a consumed amount.
    pub fn new(used: f64) -> Self {
        Self {
            used,
            limit: None,
            window_minutes: None,
            resets_at: None,
            label: None,
        }
    }

    /// Creates a window with a consumed amount and a limit.
    pub fn with_limit(used: f64, limit: f64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(used)
        }
    }

    /// Creates a window expressed directly as a percentage (limit = 100).
    pub fn percent(used_percent: f64) -> Self {
        Self::with_limit(used_percent, 100.0)
    }

    /// Sets the reset time.
    #[must_use]
    pub fn resetting_at(mut self, resets_at: Option<DateTime<Utc>>) -> Self {
        self.resets_at = resets_at;
        self
    }

    /// Sets the window length in minutes.
    #[must_use]
    pub fn spanning(mut self, window_minutes: u32) -> Self {
        self.window_minutes = Some(window_minutes);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns used / limit as a percentage, when a positive limit is known.
    pub fn used_percent(&self) -> Option<f64> {
        self.limit
            .filter(|limit| *limit > 0.0)
            .map(|limit| (self.used / limit) * 100.0)
    }

    /// Returns the remaining allowance, when a limit is known.
    pub fn remaining(&self) -> Option<f64> {
        self.limit.map(|limit| (limit - self.used).max(0.0))
    }

    /// Returns true if usage is at or over the limit.
    pub fn is_over_limit(&self) -> bool {
        self.used_percent().is_some_and(|pct| pct >= 100.0)
    }

    /// Returns true if usage is approaching the limit (>80%).
    pub fn is_approaching_limit(&self) -> bool {
        self.used_percent().is_some_and(|pct| pct > 80.0)
    }

    /// Returns time until reset, if known.
    pub fn time_until_reset(&self) -> Option<Duration> {
        self.resets_at.map(|reset| reset - Utc::now())
    }

    /// Validates the window data.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` if `used` or `limit` is negative or
    /// not finite.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_amount("used", self.used)?;
        if let Some(limit) = self.limit {
            check_amount("limit", limit)?;
        }
        Ok(())
    }

    /// Replaces NaN/Infinity with 0.0 and clamps negatives to 0.0.
    pub fn sanitize(&mut self) {
        self.used = clamp_amount(self.used);
        self.limit = self.limit.map(clamp_amount);
    }
}

impl Default for UsageWindow {
    fn default() -> Self {
        Self::new(0.0)
    }
}

// ============================================================================
// Usage Cost
// ============================================================================

/// Spend reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCost {
    /// Amount spent.
    pub used: f64,
    /// Spending cap or purchased total, when known.
    pub limit: Option<f64>,
    /// ISO currency code, or "credits" for provider-specific units.
    pub currency_code: String,
}

impl UsageCost {
    /// Creates a USD cost figure.
    pub fn usd(used: f64, limit: Option<f64>) -> Self {
        Self {
            used,
            limit,
            currency_code: "USD".to_string(),
        }
    }

    /// Creates a cost figure in provider credits.
    pub fn credits(used: f64, limit: Option<f64>) -> Self {
        Self {
            used,
            limit,
            currency_code: "credits".to_string(),
        }
    }

    /// Returns the remaining balance, when a limit is known.
    pub fn remaining(&self) -> Option<f64> {
        self.limit.map(|limit| (limit - self.used).max(0.0))
    }

    /// Validates the cost figure.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` for negative or non-finite amounts.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_amount("used", self.used)?;
        if let Some(limit) = self.limit {
            check_amount("limit", limit)?;
        }
        Ok(())
    }

    /// Clamps amounts to valid values.
    pub fn sanitize(&mut self) {
        self.used = clamp_amount(self.used);
        self.limit = self.limit.map(clamp_amount);
    }
}

fn check_amount(field: &str, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::InvalidData(format!(
            "{field} is not a finite number"
        )));
    }
    if value < 0.0 {
        return Err(CoreError::InvalidData(format!(
            "{field} {value} is negative"
        )));
    }
    Ok(())
}

fn clamp_amount(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_window_percent() {
        let window = UsageWindow::with_limit(75.0, 300.0);
        assert_eq!(window.used_percent(), Some(25.0));
        assert_eq!(window.remaining(), Some(225.0));
        assert!(!window.is_approaching_limit());

        let high = UsageWindow::percent(85.0);
        assert!(high.is_approaching_limit());
    }

    #[test]
    fn test_usage_window_without_limit() {
        let window = UsageWindow::new(12.0);
        assert_eq!(window.used_percent(), None);
        assert_eq!(window.remaining(), None);
        assert!(!window.is_over_limit());
    }

    #[test]
    fn test_usage_window_zero_limit() {
        let window = UsageWindow::with_limit(5.0, 0.0);
        assert_eq!(window.used_percent(), None);
        assert_eq!(window.remaining(), Some(0.0));
    }

    #[test]
    fn test_usage_window_over_limit() {
        let window = UsageWindow::with_limit(120.0, 100.0);
        assert_eq!(window.remaining(), Some(0.0));
        assert!(window.is_over_limit());
    }

    #[test]
    fn test_snapshot_max_usage() {
        let mut snapshot = UsageSnapshot::new();
        assert_eq!(snapshot.max_usage_percent(), None);

        snapshot.session = Some(UsageWindow::percent(50.0));
        snapshot.weekly = Some(UsageWindow::with_limit(170.0, 200.0));
        snapshot.secondary = Some(UsageWindow::new(999.0));

        assert_eq!(snapshot.max_usage_percent(), Some(85.0));
        assert!(snapshot.is_approaching_limit());
    }

    #[test]
    fn test_snapshot_has_data() {
        let mut snapshot = UsageSnapshot::new();
        assert!(!snapshot.has_data());
        assert!(!snapshot.has_source());

        snapshot.cost = Some(UsageCost::usd(1.5, None));
        assert!(snapshot.has_data());

        snapshot.source = "api".to_string();
        assert!(snapshot.has_source());
    }

    #[test]
    fn test_cost_remaining() {
        let cost = UsageCost::usd(7.5, Some(10.0));
        assert_eq!(cost.remaining(), Some(2.5));
        assert_eq!(UsageCost::credits(3.0, None).currency_code, "credits");
    }

    // ==========================================================================
    // Validation
    // ==========================================================================

    #[test]
    fn test_window_validate() {
        assert!(UsageWindow::new(0.0).validate().is_ok());
        assert!(UsageWindow::with_limit(340.0, 100.0).validate().is_ok());

        assert!(UsageWindow::new(-1.0).validate().is_err());
        assert!(UsageWindow::new(f64::NAN).validate().is_err());
        assert!(UsageWindow::with_limit(1.0, f64::INFINITY).validate().is_err());
        assert!(UsageWindow::with_limit(1.0, -5.0).validate().is_err());
    }

    #[test]
    fn test_window_sanitize() {
        let mut window = UsageWindow::with_limit(-10.0, f64::NAN);
        window.sanitize();
        assert_eq!(window.used, 0.0);
        assert_eq!(window.limit, Some(0.0));
    }

    #[test]
    fn test_snapshot_validate_names_field() {
        let mut snapshot = UsageSnapshot::new();
        snapshot.session = Some(UsageWindow::new(12.0));
        assert!(snapshot.validate().is_ok());

        snapshot.cost = Some(UsageCost::usd(-3.0, None));
        let err = snapshot.validate().unwrap_err().to_string();
        assert!(err.contains("cost"), "unexpected error: {err}");
    }

    #[test]
    fn test_snapshot_sanitize() {
        let mut snapshot = UsageSnapshot::new();
        snapshot.session = Some(UsageWindow::new(-20.0));
        snapshot.weekly = Some(UsageWindow::new(f64::INFINITY));
        snapshot.cost = Some(UsageCost::usd(-1.0, Some(-2.0)));

        snapshot.sanitize();

        assert!(snapshot.validate().is_ok());
        assert_eq!(snapshot.session.as_ref().unwrap().used, 0.0);
        assert_eq!(snapshot.weekly.as_ref().unwrap().used, 0.0);
        assert_eq!(snapshot.cost.as_ref().unwrap().limit, Some(0.0));
    }
}
