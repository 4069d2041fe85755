//! Fetch attempt error types.

use lunchbox_core::Error;

/// Why a single fetch attempt (static or rendered) failed.
///
/// Each variant is fatal for that attempt only; whether it ends the lookup is
/// decided by the pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The call did not complete in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The server responded with a non-2xx status.
    #[error("HTTP error: {status}")]
    Http { status: u16, url: String },

    /// The connection could not be established.
    #[error("network error: {0}")]
    Network(String),

    /// Anything else (body read, decoding, oversized body, browser failure).
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() {
            FetchError::Network(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Other(err.to_string())
        }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(msg) => Error::FetchTimeout(msg),
            FetchError::Http { status, url } => Error::HttpStatus { status, url },
            FetchError::Network(msg) => Error::Network(msg),
            FetchError::Other(msg) => Error::FetchFailed(msg),
        }
    }
}
