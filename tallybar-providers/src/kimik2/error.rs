//! Kimi K2-specific errors.

use tallybar_fetch::{FetchError, HttpError};
use thiserror::Error;

/// Kimi K2-specific errors.
#[derive(Debug, Error)]
pub enum KimiK2Error {
    /// No API key configured.
    #[error("No Kimi K2 API key configured")]
    MissingApiKey,

    /// The key was rejected.
    #[error("Kimi K2 rejected the API key (HTTP {0})")]
    Unauthorized(u16),

    /// Too many requests.
    #[error("Kimi K2 rate limit hit")]
    RateLimited {
        /// Seconds from the Retry-After header.
        retry_after: Option<u64>,
    },

    /// Non-success status.
    #[error("Kimi K2 API returned HTTP {0}")]
    Api(u16),

    /// Body could not be parsed or carried no credit figures.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl From<reqwest::Error> for KimiK2Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpError::Request(err))
    }
}

impl From<KimiK2Error> for FetchError {
    fn from(err: KimiK2Error) -> Self {
        match err {
            KimiK2Error::MissingApiKey => FetchError::MissingCredentials(err.to_string()),
            KimiK2Error::Unauthorized(_) => FetchError::AuthenticationFailed(err.to_string()),
            KimiK2Error::RateLimited { retry_after } => FetchError::RateLimited { retry_after },
            KimiK2Error::Api(_) | KimiK2Error::InvalidResponse(_) => {
                FetchError::InvalidResponse(err.to_string())
            }
            KimiK2Error::Http(e) => FetchError::Http(e),
        }
    }
}
