// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TallyBar` Fetch
//!
//! Strategy chain execution and host APIs for the `TallyBar` application.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and domain allowlist
//! - [`host::process`] - Subprocess execution for local probes
//!
//! ## Fetch Pipeline
//!
//! - [`strategy::FetchStrategy`] - Trait for fetch implementations
//! - [`pipeline::FetchPipeline`] - Runs a strategy chain with fallback
//! - [`context::ProviderFetchContext`] - Per-request inputs for strategies
//! - [`credentials`] - Environment-then-settings token resolution
//! - [`settings::SettingsAccessor`] - Read access to stored provider settings
//!
//! ## Example
//!
//! ```ignore
//! use tallybar_fetch::{FetchOptions, FetchPipeline, ProviderFetchContext};
//!
//! let ctx = ProviderFetchContext::builder(ProviderKind::Warp).build();
//! let pipeline = FetchPipeline::new(ProviderKind::Warp, strategies);
//! let result = pipeline.run(&ctx, &FetchOptions::new()).await?;
//! println!("{} via {}", result.snapshot.source, result.strategy_id);
//! ```

pub mod context;
pub mod credentials;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod settings;
pub mod strategy;

// Errors
pub use error::{FetchError, HttpError, PipelineError, ProcessError};

// Host APIs
pub use host::{
    http::{HttpClient, ResponseExt},
    process::{ProcessOutput, ProcessRunner},
};

// Strategy & Pipeline
pub use context::{
    Environment, FetchSettings, ProviderFetchContext, ProviderFetchContextBuilder, SourceMode,
};
pub use credentials::{Credential, CredentialSource, TokenResolver, is_configured, resolve_token};
pub use pipeline::{AttemptOutcome, FetchAttempt, FetchOptions, FetchPipeline, ProviderFetchResult};
pub use settings::{InMemorySettings, ProviderSettings, SettingsAccessor};
pub use strategy::{FetchKind, FetchStrategy, StrategyInfo};

// Cancellation handle accepted by `FetchOptions`
pub use tokio_util::sync::CancellationToken;
