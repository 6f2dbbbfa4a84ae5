//! Entry point used by the application to fetch provider usage.
//!
//! [`UsageFetcher`] ties the registry to the pipeline: it looks up the
//! descriptor, checks the requested mode, builds a fresh context, resolves
//! the strategy chain and runs it.

use std::sync::Arc;

use futures::future::join_all;
use tallybar_core::ProviderKind;
use tallybar_fetch::{
    Environment, FetchOptions, FetchPipeline, FetchSettings, HttpClient, PipelineError,
    ProcessRunner, ProviderFetchContext, ProviderFetchResult, SettingsAccessor, SourceMode,
    StrategyInfo,
};
use tracing::{debug, info, instrument};

use crate::registry::ProviderRegistry;

// ============================================================================
// Usage Fetcher
// ============================================================================

/// Fetches usage for registered providers.
///
/// Each call is independent. Only the registry and the transports are
/// shared between calls.
pub struct UsageFetcher {
    registry: Arc<ProviderRegistry>,
    settings: Arc<dyn SettingsAccessor>,
    http: Arc<HttpClient>,
    process: Arc<ProcessRunner>,
    fetch_settings: FetchSettings,
    env: Option<Environment>,
}

impl UsageFetcher {
    /// Creates a fetcher over a registry and a settings store.
    pub fn new(registry: Arc<ProviderRegistry>, settings: Arc<dyn SettingsAccessor>) -> Self {
        let fetch_settings = FetchSettings::default();
        Self {
            registry,
            settings,
            http: Arc::new(HttpClient::with_timeout(fetch_settings.timeout)),
            process: Arc::new(ProcessRunner::with_timeout(fetch_settings.timeout)),
            fetch_settings,
            env: None,
        }
    }

    /// Replaces the fetch settings and rebuilds the transports to match.
    pub fn with_fetch_settings(mut self, fetch_settings: FetchSettings) -> Self {
        self.http = Arc::new(HttpClient::with_timeout(fetch_settings.timeout));
        self.process = Arc::new(ProcessRunner::with_timeout(fetch_settings.timeout));
        self.fetch_settings = fetch_settings;
        self
    }

    /// Uses a fixed environment instead of snapshotting the process
    /// environment on every call.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Uses a custom HTTP client.
    pub fn with_http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = http;
        self
    }

    /// Returns the registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Builds the per-request context for a provider.
    pub fn context(&self, provider: ProviderKind, mode: SourceMode) -> ProviderFetchContext {
        let env = self.env.clone().unwrap_or_else(Environment::from_process);
        ProviderFetchContext::builder(provider)
            .source_mode(mode)
            .env(env)
            .settings(Arc::clone(&self.settings))
            .http(Arc::clone(&self.http))
            .process(Arc::clone(&self.process))
            .fetch_settings(self.fetch_settings.clone())
            .build()
    }

    /// Fetches usage with the default options.
    pub async fn execute(
        &self,
        provider: ProviderKind,
        mode: SourceMode,
    ) -> Result<ProviderFetchResult, PipelineError> {
        let options = FetchOptions::from_settings(&self.fetch_settings);
        self.execute_with(provider, mode, &options).await
    }

    /// Fetches usage with explicit deadline / cancellation options.
    #[instrument(skip(self, options), fields(provider = %provider, mode = %mode))]
    pub async fn execute_with(
        &self,
        provider: ProviderKind,
        mode: SourceMode,
        options: &FetchOptions,
    ) -> Result<ProviderFetchResult, PipelineError> {
        let (pipeline, ctx) = self.pipeline(provider, mode)?;
        let result = pipeline.run(&ctx, options).await?;

        info!(
            strategy = %result.strategy_id,
            source = %result.source_label,
            duration = ?result.duration,
            "Fetched usage"
        );
        Ok(result)
    }

    /// Fetches several providers concurrently.
    ///
    /// Results come back in the order of `providers`. Each provider keeps
    /// its own sequential chain.
    pub async fn execute_many(
        &self,
        providers: &[ProviderKind],
        mode: SourceMode,
    ) -> Vec<(ProviderKind, Result<ProviderFetchResult, PipelineError>)> {
        let futures = providers.iter().map(|&provider| async move {
            (provider, self.execute(provider, mode).await)
        });
        join_all(futures).await
    }

    /// Reports which strategies would run for a provider and whether each
    /// is currently available.
    pub async fn strategy_info(
        &self,
        provider: ProviderKind,
        mode: SourceMode,
    ) -> Result<Vec<StrategyInfo>, PipelineError> {
        let (pipeline, ctx) = self.pipeline(provider, mode)?;
        Ok(pipeline.strategy_info(&ctx).await)
    }

    fn pipeline(
        &self,
        provider: ProviderKind,
        mode: SourceMode,
    ) -> Result<(FetchPipeline, ProviderFetchContext), PipelineError> {
        let descriptor = self.registry.lookup(provider)?;

        if !descriptor.supports_mode(mode) {
            debug!(provider = %provider, mode = %mode, "Source mode not supported");
            return Err(PipelineError::UnsupportedMode {
                provider,
                mode,
                supported: descriptor.fetch_plan.source_modes.clone(),
            });
        }

        let ctx = self.context(provider, mode);
        let pipeline = descriptor.build_pipeline(&ctx);
        debug!(strategies = ?pipeline.strategy_ids(), "Resolved strategy chain");
        Ok((pipeline, ctx))
    }
}

impl std::fmt::Debug for UsageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageFetcher")
            .field("providers", &self.registry.kinds())
            .field("fetch_settings", &self.fetch_settings)
            .finish_non_exhaustive()
    }
}
