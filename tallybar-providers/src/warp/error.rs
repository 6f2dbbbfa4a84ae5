//! Warp-specific errors.

use tallybar_fetch::{FetchError, HttpError};
use thiserror::Error;

/// Warp-specific errors.
#[derive(Debug, Error)]
pub enum WarpError {
    /// No API key configured.
    #[error("No Warp API key configured")]
    MissingApiKey,

    /// The key was rejected.
    #[error("Warp rejected the API key: {0}")]
    Unauthorized(String),

    /// Too many requests.
    #[error("Warp rate limit hit")]
    RateLimited {
        /// Seconds from the Retry-After header.
        retry_after: Option<u64>,
    },

    /// GraphQL `errors` array in the response.
    #[error("Warp GraphQL error: {0}")]
    GraphQl(String),

    /// Non-success status.
    #[error("Warp API returned HTTP {0}")]
    Api(u16),

    /// Body could not be parsed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl From<reqwest::Error> for WarpError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpError::Request(err))
    }
}

impl From<WarpError> for FetchError {
    fn from(err: WarpError) -> Self {
        match err {
            WarpError::MissingApiKey => FetchError::MissingCredentials(err.to_string()),
            WarpError::Unauthorized(_) => FetchError::AuthenticationFailed(err.to_string()),
            WarpError::RateLimited { retry_after } => FetchError::RateLimited { retry_after },
            WarpError::GraphQl(_) | WarpError::Api(_) | WarpError::InvalidResponse(_) => {
                FetchError::InvalidResponse(err.to_string())
            }
            WarpError::Http(e) => FetchError::Http(e),
        }
    }
}
