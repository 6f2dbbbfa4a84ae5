// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TallyBar` Core
//!
//! Core types and models for the `TallyBar` application.
//!
//! This crate provides the foundational data model shared by the fetch
//! pipeline and every provider implementation:
//!
//! - Provider identity, metadata and branding
//! - The normalized usage snapshot all providers converge to
//! - Error types
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderKind`] - Enum of all supported usage providers
//! - [`ProviderIdentity`] - Account identity (siloed per provider)
//! - [`ProviderMetadata`] - Provider capabilities and display info
//! - [`ProviderBranding`] - Visual styling for providers
//!
//! ### Usage Types
//! - [`UsageSnapshot`] - Normalized result of a successful fetch
//! - [`UsageWindow`] - Individual usage window (session, weekly, secondary)
//! - [`UsageCost`] - Spend figure for credit-based providers

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Provider types
    LoginMethod,
    ProviderBranding,
    ProviderColor,
    ProviderIdentity,
    ProviderKind,
    ProviderMetadata,
    // Usage types
    UsageCost,
    UsageSnapshot,
    UsageWindow,
};
