//! OpenRouter-specific errors.

use tallybar_fetch::{FetchError, HttpError};
use thiserror::Error;

/// OpenRouter-specific errors.
#[derive(Debug, Error)]
pub enum OpenRouterError {
    /// No API key configured.
    #[error("No OpenRouter API key configured")]
    MissingApiKey,

    /// The key was rejected.
    #[error("OpenRouter rejected the API key (HTTP {0})")]
    Unauthorized(u16),

    /// Too many requests.
    #[error("OpenRouter rate limit hit")]
    RateLimited {
        /// Seconds from the Retry-After header.
        retry_after: Option<u64>,
    },

    /// Non-success status.
    #[error("OpenRouter API returned HTTP {0}")]
    Api(u16),

    /// Body could not be parsed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl From<reqwest::Error> for OpenRouterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpError::Request(err))
    }
}

impl From<OpenRouterError> for FetchError {
    fn from(err: OpenRouterError) -> Self {
        match err {
            OpenRouterError::MissingApiKey => FetchError::MissingCredentials(err.to_string()),
            OpenRouterError::Unauthorized(_) => FetchError::AuthenticationFailed(err.to_string()),
            OpenRouterError::RateLimited { retry_after } => FetchError::RateLimited { retry_after },
            OpenRouterError::Api(_) | OpenRouterError::InvalidResponse(_) => {
                FetchError::InvalidResponse(err.to_string())
            }
            OpenRouterError::Http(e) => FetchError::Http(e),
        }
    }
}
