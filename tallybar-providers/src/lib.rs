// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TallyBar` Providers
//!
//! Provider descriptors, the provider registry and the concrete fetch
//! strategies for the `TallyBar` application.
//!
//! Each provider module includes:
//!
//! - **Descriptor**: Static configuration (metadata, branding, fetch plan, CLI names)
//! - **Strategies**: Fetch strategy implementations
//! - **Parsing**: Pure functions from response bodies to a `UsageSnapshot`
//!
//! ## Supported Providers
//!
//! | Provider | Modes | Strategy | Source |
//! |----------|-------|----------|--------|
//! | OpenRouter | auto, api | `openrouter.api` | API key |
//! | Warp | auto, api | `warp.api` | API key |
//! | Antigravity | auto, cli | `antigravity.local` | Local language server |
//! | JetBrains AI | auto, cli | `jetbrains.local` | IDE options file |
//! | Kimi K2 | auto, api | `kimik2.api` | API key |
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tallybar_core::ProviderKind;
//! use tallybar_fetch::{InMemorySettings, SourceMode};
//! use tallybar_providers::{ProviderRegistry, UsageFetcher};
//!
//! let registry = Arc::new(ProviderRegistry::with_default_providers()?);
//! let fetcher = UsageFetcher::new(registry, Arc::new(InMemorySettings::new()));
//!
//! let result = fetcher.execute(ProviderKind::OpenRouter, SourceMode::Auto).await?;
//! println!("{} via {}", result.provider, result.strategy_id);
//! ```

pub mod descriptor;
pub mod fetcher;
pub mod registry;

// Provider modules (alphabetical)
pub mod antigravity;
pub mod jetbrains;
pub mod kimik2;
pub mod openrouter;
pub mod warp;

#[cfg(test)]
mod test_support;

// Re-export key types
pub use descriptor::{
    CliConfig, FetchPlan, ProviderDescriptor, ProviderDescriptorBuilder, StrategyResolver,
};
pub use fetcher::UsageFetcher;
pub use registry::{ProviderRegistry, RegistryError, default_descriptors};

// Re-export provider descriptors
pub use antigravity::antigravity_descriptor;
pub use jetbrains::jetbrains_descriptor;
pub use kimik2::kimik2_descriptor;
pub use openrouter::openrouter_descriptor;
pub use warp::warp_descriptor;

// Re-export strategy types for convenience
pub use antigravity::AntigravityLocalStrategy;
pub use jetbrains::JetBrainsLocalStrategy;
pub use kimik2::KimiK2ApiStrategy;
pub use openrouter::OpenRouterApiStrategy;
pub use warp::WarpApiStrategy;
