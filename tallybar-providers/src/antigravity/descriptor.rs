//! Antigravity provider descriptor.

use std::sync::Arc;

use tallybar_core::{ProviderBranding, ProviderKind, ProviderMetadata};
use tallybar_fetch::{FetchStrategy, ProviderFetchContext, SourceMode};

use super::strategies::AntigravityLocalStrategy;
use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor};

/// Builds the provider descriptor for Antigravity.
pub fn antigravity_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(ProviderKind::Antigravity)
        .metadata(antigravity_metadata())
        .branding(ProviderBranding::for_provider(ProviderKind::Antigravity))
        .fetch_plan(antigravity_fetch_plan())
        .cli(CliConfig {
            name: "antigravity",
            aliases: &[],
        })
        .build()
}

fn antigravity_metadata() -> ProviderMetadata {
    ProviderMetadata {
        session_label: "Claude".to_string(),
        weekly_label: "Gemini Pro".to_string(),
        opus_label: Some("Gemini Flash".to_string()),
        supports_opus: true,
        // Local app; no web dashboard.
        dashboard_url: None,
        ..ProviderMetadata::for_provider(ProviderKind::Antigravity)
    }
}

fn antigravity_fetch_plan() -> FetchPlan {
    FetchPlan::new(vec![SourceMode::Auto, SourceMode::Cli], resolve_strategies)
}

fn resolve_strategies(_ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
    vec![Arc::new(AntigravityLocalStrategy::new())]
}
