//! Fetch error types.
//!
//! Two layers of errors live here:
//! - [`FetchError`] is what a single strategy reports.
//! - [`PipelineError`] is what a whole pipeline invocation reports to callers.

use std::time::Duration;

use tallybar_core::{CoreError, ProviderKind};
use thiserror::Error;

use crate::context::SourceMode;
use crate::pipeline::FetchAttempt;

// ============================================================================
// Strategy Fetch Error
// ============================================================================

/// Error type for a single strategy's fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No credential is configured for the strategy.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The provider rejected the credential.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limited by the provider.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// The response could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A local application the strategy depends on is not running.
    #[error("Not running: {0}")]
    NotRunning(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Subprocess error.
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Core model error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpError::Request(err))
    }
}

impl FetchError {
    /// Returns true if this error means the user has to fix configuration.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials(_) | Self::AuthenticationFailed(_)
        )
    }
}

// ============================================================================
// Pipeline Error
// ============================================================================

/// Error returned by a pipeline invocation.
///
/// Every variant that is produced after strategies ran carries the attempt
/// history so callers can show why each strategy was skipped or failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The provider is not registered.
    #[error("Unknown provider: {0}")]
    UnknownProvider(ProviderKind),

    /// The provider does not support the requested source mode.
    #[error("{provider} does not support source mode '{mode}'")]
    UnsupportedMode {
        /// Provider that was asked.
        provider: ProviderKind,
        /// Requested mode.
        mode: SourceMode,
        /// Modes the provider does support.
        supported: Vec<SourceMode>,
    },

    /// The fetch plan produced no strategies for this context.
    #[error("No strategies resolved for {provider} in '{mode}' mode")]
    NoStrategiesResolved {
        /// Provider that was asked.
        provider: ProviderKind,
        /// Requested mode.
        mode: SourceMode,
    },

    /// A strategy failed and declined fallback.
    #[error("Strategy {strategy_id} failed: {error}")]
    Strategy {
        /// The strategy that failed.
        strategy_id: String,
        /// The strategy's error, unchanged.
        #[source]
        error: FetchError,
        /// Attempts up to and including the failing one.
        attempts: Vec<FetchAttempt>,
    },

    /// Every strategy was skipped or failed with fallback allowed.
    #[error("All {} strategies exhausted for {provider}", .attempts.len())]
    AllStrategiesExhausted {
        /// Provider that was asked.
        provider: ProviderKind,
        /// One entry per strategy, in chain order.
        attempts: Vec<FetchAttempt>,
    },

    /// The deadline expired.
    #[error("Fetch for {provider} timed out after {elapsed:?}")]
    Timeout {
        /// Provider that was asked.
        provider: ProviderKind,
        /// The strategy in flight when time ran out, if any.
        strategy_id: Option<String>,
        /// Time spent before giving up.
        elapsed: Duration,
        /// Attempts made so far.
        attempts: Vec<FetchAttempt>,
    },

    /// The caller cancelled the fetch.
    #[error("Fetch for {provider} was cancelled")]
    Cancelled {
        /// Provider that was asked.
        provider: ProviderKind,
        /// Attempts made so far.
        attempts: Vec<FetchAttempt>,
    },
}

impl PipelineError {
    /// Returns the attempt history, empty for errors raised before any
    /// strategy ran.
    pub fn attempts(&self) -> &[FetchAttempt] {
        match self {
            Self::Strategy { attempts, .. }
            | Self::AllStrategiesExhausted { attempts, .. }
            | Self::Timeout { attempts, .. }
            | Self::Cancelled { attempts, .. } => attempts,
            Self::UnknownProvider(_)
            | Self::UnsupportedMode { .. }
            | Self::NoStrategiesResolved { .. } => &[],
        }
    }

    /// Returns the strategy error for fail-fast failures.
    pub fn strategy_error(&self) -> Option<&FetchError> {
        match self {
            Self::Strategy { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns true if the error was caused by the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors() {
        assert!(FetchError::MissingCredentials("no key".into()).is_credential_error());
        assert!(FetchError::AuthenticationFailed("401".into()).is_credential_error());
        assert!(!FetchError::InvalidResponse("bad".into()).is_credential_error());
    }

    #[test]
    fn test_pipeline_error_attempts_empty_before_run() {
        let err = PipelineError::UnknownProvider(ProviderKind::Warp);
        assert!(err.attempts().is_empty());
        assert!(err.strategy_error().is_none());
    }

    #[test]
    fn test_exhausted_message_counts_attempts() {
        let err = PipelineError::AllStrategiesExhausted {
            provider: ProviderKind::KimiK2,
            attempts: Vec::new(),
        };
        assert_eq!(err.to_string(), "All 0 strategies exhausted for kimik2");
    }

    #[test]
    fn test_unsupported_mode_message() {
        let err = PipelineError::UnsupportedMode {
            provider: ProviderKind::OpenRouter,
            mode: SourceMode::Web,
            supported: vec![SourceMode::Auto, SourceMode::Api],
        };
        assert_eq!(
            err.to_string(),
            "openrouter does not support source mode 'web'"
        );
    }
}
