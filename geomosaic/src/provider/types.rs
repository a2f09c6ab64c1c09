//! Provider error types.

use thiserror::Error;

/// Failure of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {0} timed out")]
    Timeout(String),
}

/// Failure of a logical fetch that may span several endpoints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Every endpoint was tried and none produced a usable response.
    #[error("all {attempts} endpoints failed (last error: {last})")]
    Exhausted { attempts: usize, last: String },

    /// The fetch was superseded or the caller gave up.
    #[error("fetch cancelled")]
    Cancelled,

    /// A response arrived but could not be interpreted.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Cancellation is an expected outcome, not a failure to report.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
