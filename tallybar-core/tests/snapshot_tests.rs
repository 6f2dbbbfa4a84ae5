//! Integration tests for core snapshot types.

use tallybar_core::{ProviderKind, UsageCost, UsageSnapshot, UsageWindow};

#[test]
fn test_snapshot_serialization_roundtrip() {
    let mut snapshot = UsageSnapshot::new();
    snapshot.session = Some(UsageWindow::new(12.0));
    snapshot.weekly = Some(UsageWindow::with_limit(340.0, 1000.0).labeled("Monthly"));
    snapshot.source = "api".to_string();

    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: UsageSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, snapshot);
}

#[test]
fn test_negative_usage_is_rejected() {
    let mut snapshot = UsageSnapshot::new();
    snapshot.weekly = Some(UsageWindow::new(-1.0));
    assert!(snapshot.validate().is_err());
}

#[test]
fn test_cost_only_snapshot_has_data() {
    let mut snapshot = UsageSnapshot::new();
    snapshot.cost = Some(UsageCost::usd(0.0, Some(25.0)));
    assert!(snapshot.has_data());
    assert_eq!(snapshot.max_usage_percent(), None);
}

#[test]
fn test_provider_kind_all_unique_cli_names() {
    let mut names: Vec<_> = ProviderKind::all().iter().map(ProviderKind::cli_name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), ProviderKind::all().len());
}
