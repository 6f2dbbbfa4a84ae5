//! JetBrains-specific errors.

use tallybar_fetch::FetchError;
use thiserror::Error;

/// JetBrains-specific errors.
#[derive(Debug, Error)]
pub enum JetBrainsError {
    /// No IDE config directory holds a quota file.
    #[error("No JetBrains IDE with AI Assistant quota data found")]
    QuotaFileNotFound,

    /// The quota file could not be read.
    #[error("Failed to read quota file: {0}")]
    Io(#[from] std::io::Error),

    /// The XML did not carry the quota option.
    #[error("Quota file has no {0} option")]
    MissingOption(&'static str),

    /// An option value was not the expected JSON.
    #[error("Invalid quota data: {0}")]
    InvalidQuota(String),
}

impl From<JetBrainsError> for FetchError {
    fn from(err: JetBrainsError) -> Self {
        match err {
            JetBrainsError::QuotaFileNotFound => FetchError::NotRunning(err.to_string()),
            JetBrainsError::Io(e) => FetchError::Io(e),
            JetBrainsError::MissingOption(_) | JetBrainsError::InvalidQuota(_) => {
                FetchError::InvalidResponse(err.to_string())
            }
        }
    }
}
