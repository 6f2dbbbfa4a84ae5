//! JetBrains fetch strategies.

use std::path::PathBuf;

use async_trait::async_trait;
use tallybar_core::UsageSnapshot;
use tallybar_fetch::{FetchError, FetchKind, FetchStrategy, ProviderFetchContext};
use tracing::{debug, instrument};

use super::error::JetBrainsError;
use super::locator::JetBrainsLocator;
use super::parser::{build_snapshot, parse_quota_xml};

/// Reads the quota the newest IDE cached on disk.
pub struct JetBrainsLocalStrategy {
    locator: JetBrainsLocator,
}

impl JetBrainsLocalStrategy {
    /// Creates a strategy searching the platform config directory.
    pub fn new() -> Self {
        Self {
            locator: JetBrainsLocator::new(),
        }
    }

    /// Creates a strategy searching the given vendor directories.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            locator: JetBrainsLocator::with_roots(roots),
        }
    }
}

impl Default for JetBrainsLocalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for JetBrainsLocalStrategy {
    fn id(&self) -> &str {
        "jetbrains.local"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::LocalProbe
    }

    async fn is_available(&self, _ctx: &ProviderFetchContext) -> bool {
        self.locator.find_newest().is_some()
    }

    #[instrument(skip(self, _ctx))]
    async fn fetch(&self, _ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
        let file = self
            .locator
            .find_newest()
            .ok_or(JetBrainsError::QuotaFileNotFound)?;
        debug!(ide = %file.ide, "Reading AI Assistant quota");

        let xml = tokio::fs::read_to_string(&file.path)
            .await
            .map_err(JetBrainsError::Io)?;
        let quota = parse_quota_xml(&xml)?;
        Ok(build_snapshot(&quota))
    }
}
