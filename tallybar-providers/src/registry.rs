//! Provider registry.
//!
//! The registry is assembled once at startup by an explicit call to
//! [`ProviderRegistry::with_default_providers`] (or by registering
//! descriptors one by one) and is read-only afterwards. Share it behind an
//! `Arc`; lookups take no lock.

use std::collections::HashMap;

use tallybar_core::ProviderKind;
use tallybar_fetch::{PipelineError, SourceMode};
use thiserror::Error;
use tracing::debug;

use crate::antigravity::antigravity_descriptor;
use crate::descriptor::ProviderDescriptor;
use crate::jetbrains::jetbrains_descriptor;
use crate::kimik2::kimik2_descriptor;
use crate::openrouter::openrouter_descriptor;
use crate::warp::warp_descriptor;

// ============================================================================
// Registry Error
// ============================================================================

/// Errors raised while assembling the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A descriptor for this provider is already registered.
    #[error("Provider {0} is already registered")]
    DuplicateProvider(ProviderKind),

    /// Another provider already answers to this CLI name.
    #[error("CLI name '{name}' for {provider} is already used by {existing}")]
    DuplicateCliName {
        /// The contested name.
        name: String,
        /// Provider being registered.
        provider: ProviderKind,
        /// Provider that owns the name.
        existing: ProviderKind,
    },
}

/// Descriptors registered by [`ProviderRegistry::with_default_providers`].
pub fn default_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        openrouter_descriptor(),
        warp_descriptor(),
        antigravity_descriptor(),
        jetbrains_descriptor(),
        kimik2_descriptor(),
    ]
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Registry of provider descriptors, in registration order.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
    cli_names: HashMap<String, ProviderKind>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in provider.
    pub fn with_default_providers() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in default_descriptors() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Registers a descriptor.
    ///
    /// A second descriptor for the same provider is rejected even if it is
    /// identical to the first.
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<(), RegistryError> {
        if self.get(descriptor.id).is_some() {
            return Err(RegistryError::DuplicateProvider(descriptor.id));
        }

        let names: Vec<String> = descriptor.cli.names().map(str::to_lowercase).collect();
        for name in &names {
            if let Some(existing) = self.cli_names.get(name) {
                return Err(RegistryError::DuplicateCliName {
                    name: name.clone(),
                    provider: descriptor.id,
                    existing: *existing,
                });
            }
        }

        debug!(provider = %descriptor.id, "Registering provider");
        for name in names {
            self.cli_names.insert(name, descriptor.id);
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Looks up a provider, failing with [`PipelineError::UnknownProvider`].
    pub fn lookup(&self, id: ProviderKind) -> Result<&ProviderDescriptor, PipelineError> {
        self.get(id).ok_or(PipelineError::UnknownProvider(id))
    }

    /// Gets a provider descriptor by kind.
    pub fn get(&self, id: ProviderKind) -> Option<&ProviderDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Returns all provider descriptors.
    pub fn all(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Returns all provider kinds.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.descriptors.iter().map(|d| d.id).collect()
    }

    /// Returns the number of registered providers.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Looks up a provider by CLI name or alias, ignoring case.
    pub fn get_by_cli_name(&self, name: &str) -> Option<&ProviderDescriptor> {
        let kind = self.cli_names.get(&name.trim().to_lowercase())?;
        self.get(*kind)
    }

    /// Returns providers that support the given source mode.
    pub fn with_source_mode(&self, mode: SourceMode) -> Vec<&ProviderDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.supports_mode(mode))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
