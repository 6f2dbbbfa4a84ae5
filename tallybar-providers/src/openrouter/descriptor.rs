//! OpenRouter provider descriptor.

use std::sync::Arc;

use tallybar_core::{ProviderBranding, ProviderKind, ProviderMetadata};
use tallybar_fetch::{FetchStrategy, ProviderFetchContext, SourceMode};

use super::strategies::OpenRouterApiStrategy;
use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor};

/// Builds the provider descriptor for OpenRouter.
pub fn openrouter_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::builder(ProviderKind::OpenRouter)
        .metadata(openrouter_metadata())
        .branding(ProviderBranding::for_provider(ProviderKind::OpenRouter))
        .fetch_plan(openrouter_fetch_plan())
        .cli(openrouter_cli_config())
        .build()
}

fn openrouter_metadata() -> ProviderMetadata {
    ProviderMetadata {
        session_label: "Today".to_string(),
        weekly_label: "This week".to_string(),
        opus_label: Some("Key limit".to_string()),
        supports_opus: true,
        supports_credits: true,
        credits_hint: "USD balance across all keys".to_string(),
        dashboard_url: Some("https://openrouter.ai/settings/credits".to_string()),
        ..ProviderMetadata::for_provider(ProviderKind::OpenRouter)
    }
}

fn openrouter_fetch_plan() -> FetchPlan {
    FetchPlan::new(vec![SourceMode::Auto, SourceMode::Api], resolve_strategies)
}

fn resolve_strategies(_ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
    vec![Arc::new(OpenRouterApiStrategy::new())]
}

fn openrouter_cli_config() -> CliConfig {
    CliConfig {
        name: "openrouter",
        aliases: &["or"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        let desc = openrouter_descriptor();
        assert_eq!(desc.display_name(), "OpenRouter");
        assert!(desc.supports_mode(SourceMode::Api));
        assert!(!desc.supports_mode(SourceMode::Cli));
        assert!(desc.metadata.supports_credits);
    }
}
