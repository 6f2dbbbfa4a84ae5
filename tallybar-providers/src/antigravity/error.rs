//! Antigravity-specific errors.

use tallybar_fetch::{FetchError, HttpError, ProcessError};
use thiserror::Error;

/// Antigravity-specific errors.
#[derive(Debug, Error)]
pub enum AntigravityError {
    /// No language server process found.
    #[error("Antigravity language server not running")]
    NotRunning,

    /// The process listing could not be read.
    #[error("Process listing failed: {0}")]
    ProcessList(#[from] ProcessError),

    /// No port answered.
    #[error("Port detection failed: {0}")]
    PortDetectionFailed(String),

    /// Non-success status or error code from the language server.
    #[error("Language server error: {0}")]
    Api(String),

    /// The body could not be parsed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The response carried no model quotas.
    #[error("No model quotas reported")]
    NoQuotas,

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl From<reqwest::Error> for AntigravityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpError::Request(err))
    }
}

impl From<AntigravityError> for FetchError {
    fn from(err: AntigravityError) -> Self {
        match err {
            AntigravityError::NotRunning | AntigravityError::PortDetectionFailed(_) => {
                FetchError::NotRunning(err.to_string())
            }
            AntigravityError::ProcessList(e) => FetchError::Process(e),
            AntigravityError::Api(_)
            | AntigravityError::InvalidResponse(_)
            | AntigravityError::NoQuotas => FetchError::InvalidResponse(err.to_string()),
            AntigravityError::Http(e) => FetchError::Http(e),
        }
    }
}
