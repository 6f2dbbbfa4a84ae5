//! JetBrains AI provider descriptor.

use std::sync::Arc;

use tallybar_core::{ProviderBranding, ProviderKind, ProviderMetadata};
use tallybar_fetch::{FetchStrategy, ProviderFetchContext, SourceMode};

use super::strategies::JetBrainsLocalStrategy;
use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor};

/// Builds the provider descriptor for JetBrains AI.
pub fn jetbrains_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(ProviderKind::JetBrains)
        .metadata(jetbrains_metadata())
        .branding(ProviderBranding::for_provider(ProviderKind::JetBrains))
        .fetch_plan(FetchPlan::new(
            vec![SourceMode::Auto, SourceMode::Cli],
            resolve_strategies,
        ))
        .cli(CliConfig {
            name: "jetbrains",
            aliases: &["intellij", "jetbrains-ai"],
        })
        .build()
}

fn jetbrains_metadata() -> ProviderMetadata {
    ProviderMetadata {
        weekly_label: "Monthly".to_string(),
        credits_hint: "AI Assistant quota".to_string(),
        dashboard_url: Some("https://account.jetbrains.com/licenses".to_string()),
        ..ProviderMetadata::for_provider(ProviderKind::JetBrains)
    }
}

fn resolve_strategies(_ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
    vec![Arc::new(JetBrainsLocalStrategy::new())]
}
