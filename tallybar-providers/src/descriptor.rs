//! Provider descriptor system.
//!
//! A descriptor contains all the static configuration for a provider:
//! - Metadata (display name, labels, capability flags)
//! - Branding (colors, icons)
//! - Fetch plan (supported modes and the strategy chain)
//! - CLI naming

use std::fmt;
use std::sync::Arc;

use tallybar_core::{ProviderBranding, ProviderKind, ProviderMetadata};
use tallybar_fetch::{FetchPipeline, FetchStrategy, ProviderFetchContext, SourceMode};

// ============================================================================
// Provider Descriptor
// ============================================================================

/// Complete descriptor for a provider.
///
/// Built once when the registry is assembled and never mutated afterwards.
pub struct ProviderDescriptor {
    /// Provider identifier.
    pub id: ProviderKind,
    /// Display metadata and capability flags.
    pub metadata: ProviderMetadata,
    /// Visual branding.
    pub branding: ProviderBranding,
    /// How to fetch usage data.
    pub fetch_plan: FetchPlan,
    /// CLI naming.
    pub cli: CliConfig,
}

impl ProviderDescriptor {
    /// Creates a new descriptor builder.
    pub fn builder(id: ProviderKind) -> ProviderDescriptorBuilder {
        ProviderDescriptorBuilder::new(id)
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.metadata.display_name
    }

    /// Returns the CLI name.
    pub fn cli_name(&self) -> &str {
        self.cli.name
    }

    /// Returns true if the fetch plan accepts the mode.
    pub fn supports_mode(&self, mode: SourceMode) -> bool {
        self.fetch_plan.supports(mode)
    }

    /// Resolves the strategy chain for a context.
    pub fn resolve_strategies(&self, ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
        self.fetch_plan.resolve(ctx)
    }

    /// Builds the fetch pipeline for a context.
    pub fn build_pipeline(&self, ctx: &ProviderFetchContext) -> FetchPipeline {
        FetchPipeline::new(self.id, self.resolve_strategies(ctx))
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id)
            .field("fetch_plan", &self.fetch_plan)
            .field("cli", &self.cli)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Plan
// ============================================================================

/// Function producing a provider's strategy chain.
pub type StrategyResolver =
    Arc<dyn Fn(&ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> + Send + Sync>;

/// Configuration for how to fetch usage data.
///
/// The resolver's output order is the fallback chain.
#[derive(Clone)]
pub struct FetchPlan {
    /// Supported source modes.
    pub source_modes: Vec<SourceMode>,
    resolver: StrategyResolver,
}

impl FetchPlan {
    /// Creates a plan.
    pub fn new<F>(source_modes: Vec<SourceMode>, resolver: F) -> Self
    where
        F: Fn(&ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> + Send + Sync + 'static,
    {
        Self {
            source_modes,
            resolver: Arc::new(resolver),
        }
    }

    /// Returns true if the plan accepts the mode.
    pub fn supports(&self, mode: SourceMode) -> bool {
        self.source_modes.contains(&mode)
    }

    /// Resolves the strategy chain.
    pub fn resolve(&self, ctx: &ProviderFetchContext) -> Vec<Arc<dyn FetchStrategy>> {
        (self.resolver)(ctx)
    }
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self::new(vec![SourceMode::Auto], |_| Vec::new())
    }
}

impl fmt::Debug for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchPlan")
            .field("source_modes", &self.source_modes)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CLI Config
// ============================================================================

/// Names a provider answers to on the command line and in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliConfig {
    /// Primary name.
    pub name: &'static str,
    /// Alternative names.
    pub aliases: &'static [&'static str],
}

impl CliConfig {
    /// Creates a config with the provider's canonical CLI name and no aliases.
    pub fn for_provider(kind: ProviderKind) -> Self {
        Self {
            name: kind.cli_name(),
            aliases: &[],
        }
    }

    /// Iterates over the primary name followed by the aliases.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for `ProviderDescriptor`.
pub struct ProviderDescriptorBuilder {
    id: ProviderKind,
    metadata: Option<ProviderMetadata>,
    branding: Option<ProviderBranding>,
    fetch_plan: FetchPlan,
    cli: Option<CliConfig>,
}

impl ProviderDescriptorBuilder {
    /// Creates a new builder for the given provider.
    pub fn new(id: ProviderKind) -> Self {
        Self {
            id,
            metadata: None,
            branding: None,
            fetch_plan: FetchPlan::default(),
            cli: None,
        }
    }

    /// Sets the metadata.
    pub fn metadata(mut self, metadata: ProviderMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the branding.
    pub fn branding(mut self, branding: ProviderBranding) -> Self {
        self.branding = Some(branding);
        self
    }

    /// Sets the fetch plan.
    pub fn fetch_plan(mut self, plan: FetchPlan) -> Self {
        self.fetch_plan = plan;
        self
    }

    /// Sets the CLI configuration.
    pub fn cli(mut self, cli: CliConfig) -> Self {
        self.cli = Some(cli);
        self
    }

    /// Builds the descriptor.
    pub fn build(self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id,
            metadata: self
                .metadata
                .unwrap_or_else(|| ProviderMetadata::for_provider(self.id)),
            branding: self
                .branding
                .unwrap_or_else(|| ProviderBranding::for_provider(self.id)),
            fetch_plan: self.fetch_plan,
            cli: self.cli.unwrap_or_else(|| CliConfig::for_provider(self.id)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
