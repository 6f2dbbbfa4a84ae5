//! Antigravity fetch strategies.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tallybar_core::UsageSnapshot;
use tallybar_fetch::{FetchError, FetchKind, FetchStrategy, HttpClient, ProviderFetchContext};
use tracing::{debug, instrument};

use super::api::LanguageServerClient;
use super::process::{self, LanguageServer};
use super::quota::build_snapshot;

/// Local probe strategy for Antigravity.
///
/// Finds the running language server, then asks it for per-model quotas
/// over loopback HTTPS. The server found by `is_available` is handed to the
/// following `fetch`, so one fetch scans the process table once.
#[derive(Debug, Default)]
pub struct AntigravityLocalStrategy {
    detected: Mutex<Option<LanguageServer>>,
}

impl AntigravityLocalStrategy {
    /// Creates a new Antigravity local strategy.
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, server: Option<LanguageServer>) {
        *self.detected.lock().unwrap_or_else(PoisonError::into_inner) = server;
    }

    /// Takes the server found by the last availability check, if any.
    fn take_detected(&self) -> Option<LanguageServer> {
        self.detected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl FetchStrategy for AntigravityLocalStrategy {
    fn id(&self) -> &str {
        "antigravity.local"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::LocalProbe
    }

    #[instrument(skip(self, ctx))]
    async fn is_available(&self, ctx: &ProviderFetchContext) -> bool {
        match process::detect(&ctx.process).await {
            Ok(server) => {
                self.remember(Some(server));
                true
            }
            Err(e) => {
                debug!(error = %e, "Language server not detected");
                self.remember(None);
                false
            }
        }
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
        debug!("Fetching Antigravity quotas via local probe");

        let server = match self.take_detected() {
            Some(server) => server,
            None => process::detect(&ctx.process).await?,
        };
        let ports = process::candidate_ports(&ctx.process, &server).await?;

        let http = HttpClient::local_insecure(ctx.timeout())?;
        let client = LanguageServerClient::first_responsive(&http, &ports, &server.csrf_token).await?;
        let quotas = client.quotas().await?;

        Ok(build_snapshot(&quotas)?)
    }
}
