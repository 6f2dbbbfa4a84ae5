//! Domain models for `TallyBar`.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider types (ProviderKind, Identity, Metadata, Branding)
//! - [`usage`] - Usage types (UsageSnapshot, UsageWindow, UsageCost)

mod provider;
mod usage;

// Re-export everything at the models level
pub use provider::{
    LoginMethod, ProviderBranding, ProviderColor, ProviderIdentity, ProviderKind,
    ProviderMetadata,
};
pub use usage::{UsageCost, UsageSnapshot, UsageWindow};
#[cfg(test)]
mod serde_tests;
