//! Kimi K2 provider descriptor.

use std::sync::Arc;

use tallybar_core::{ProviderBranding, ProviderKind, ProviderMetadata};
use tallybar_fetch::{FetchStrategy, ProviderFetchContext, SourceMode};

use super::strategies::KimiK2ApiStrategy;
use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor};

/// Builds the provider descriptor for Kimi K2.
pub fn kimik2_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(ProviderKind::KimiK2)
        .metadata(kimik2_metadata())
        .branding(ProviderBranding::for_provider(ProviderKind::KimiK2))
        .fetch_plan(FetchPlan::new(
            vec![SourceMode::Auto, SourceMode::Api],
            resolve_strategies,
        ))
        .cli(CliConfig {
            name: "kimik2",
            aliases: &["kimi-k2", "kimi_k2"],
        })
        .build()
}

fn kimik2_metadata() -> ProviderMetadata {
    ProviderMetadata {
        weekly_label: "Credits".to_string(),
        supports_credits: true,
        credits_hint: "Prepaid credits".to_string(),
        dashboard_url: Some("https://kimi-k2.ai/my-credits".to_string()),
        ..ProviderMetadata::for_provider(ProviderKind::KimiK2)
    }
}

fn resolve_strategies(_ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
    vec![Arc::new(KimiK2ApiStrategy::new())]
}
