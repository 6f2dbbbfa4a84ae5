//! Warp provider descriptor.

use std::sync::Arc;

use tallybar_core::{ProviderBranding, ProviderKind, ProviderMetadata};
use tallybar_fetch::{FetchStrategy, ProviderFetchContext, SourceMode};

use super::strategies::WarpApiStrategy;
use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor};

/// Builds the provider descriptor for Warp.
pub fn warp_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(ProviderKind::Warp)
        .metadata(warp_metadata())
        .branding(ProviderBranding::for_provider(ProviderKind::Warp))
        .fetch_plan(FetchPlan::new(
            vec![SourceMode::Auto, SourceMode::Api],
            resolve_strategies,
        ))
        .cli(CliConfig {
            name: "warp",
            aliases: &["warp-ai"],
        })
        .build()
}

fn warp_metadata() -> ProviderMetadata {
    ProviderMetadata {
        weekly_label: "Requests".to_string(),
        opus_label: Some("Bonus".to_string()),
        supports_opus: true,
        dashboard_url: Some("https://app.warp.dev/settings/billing".to_string()),
        ..ProviderMetadata::for_provider(ProviderKind::Warp)
    }
}

fn resolve_strategies(_ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
    vec![Arc::new(WarpApiStrategy::new())]
}
