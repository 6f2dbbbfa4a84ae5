//! Serde tests for core types.
//!
//! These verify the wire names the UI layer and settings hosts depend on.

use chrono::{TimeZone, Utc};

use crate::{
    LoginMethod, ProviderIdentity, ProviderKind, UsageCost, UsageSnapshot, UsageWindow,
};

// ============================================================================
// ProviderKind
// ============================================================================

#[test]
fn test_provider_kind_deserialize_lowercase() {
    let test_cases = vec![
        (r#""openrouter""#, ProviderKind::OpenRouter),
        (r#""warp""#, ProviderKind::Warp),
        (r#""antigravity""#, ProviderKind::Antigravity),
        (r#""jetbrains""#, ProviderKind::JetBrains),
        (r#""kimik2""#, ProviderKind::KimiK2),
    ];

    for (json, expected) in test_cases {
        let result: ProviderKind = serde_json::from_str(json).unwrap();
        assert_eq!(result, expected, "Failed for {json}");
    }
}

#[test]
fn test_provider_kind_serde_matches_cli_name() {
    for kind in ProviderKind::all() {
        let json = serde_json::to_string(kind).unwrap();
        assert_eq!(json, format!("\"{}\"", kind.cli_name()));
    }
}

#[test]
fn test_provider_kind_invalid_deserialize() {
    let result: Result<ProviderKind, _> = serde_json::from_str(r#""codex""#);
    assert!(result.is_err());
}

// ============================================================================
// UsageSnapshot
// ============================================================================

#[test]
fn test_usage_snapshot_field_names() {
    let mut snapshot = UsageSnapshot::new();
    snapshot.session = Some(UsageWindow::new(12.0));
    snapshot.weekly = Some(UsageWindow::with_limit(340.0, 500.0));
    snapshot.cost = Some(UsageCost::usd(4.2, Some(10.0)));
    snapshot.source = "api".to_string();

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["session"]["used"], 12.0);
    assert_eq!(value["weekly"]["limit"], 500.0);
    assert_eq!(value["cost"]["currency_code"], "USD");
    assert_eq!(value["source"], "api");
    assert!(value["secondary"].is_null());
}

#[test]
fn test_usage_snapshot_missing_source_defaults_empty() {
    let json = r#"{
        "session": null,
        "weekly": {"used": 3.0, "limit": null, "window_minutes": null, "resets_at": null, "label": null},
        "secondary": null,
        "cost": null,
        "updated_at": "2025-01-15T12:00:00Z",
        "identity": null
    }"#;

    let snapshot: UsageSnapshot = serde_json::from_str(json).unwrap();
    assert!(!snapshot.has_source());
    assert_eq!(snapshot.weekly.unwrap().used, 3.0);
    assert_eq!(
        snapshot.updated_at,
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    );
}

#[test]
fn test_identity_login_method_snake_case() {
    let mut identity = ProviderIdentity::new(ProviderKind::Antigravity);
    identity.login_method = Some(LoginMethod::LocalApp);

    let value = serde_json::to_value(&identity).unwrap();
    assert_eq!(value["provider_id"], "antigravity");
    assert_eq!(value["login_method"], "local_app");
}
