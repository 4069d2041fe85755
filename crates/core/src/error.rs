//! Unified error types for lunchbox.
//!
//! Every terminal failure of a menu lookup is one of these variants. The
//! display string starts with a stable code so callers can tell "could not
//! reach the source" apart from "source reachable but nothing structured".

use std::sync::Arc;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the lunchbox pipeline.
///
/// The enum is `Clone` so that one in-flight lookup can hand the same outcome
/// to every caller waiting on it; non-clonable sources are kept behind `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Unusable URL or date, rejected before any I/O.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The fetch did not complete in time.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP_ERROR: status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The connection could not be established.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Any other fetch-layer failure (body read, decoding, redirects).
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// The headless browser could not be launched or driven.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// The fetch succeeded but yielded no usable text.
    #[error("EMPTY_CONTENT: {0}")]
    EmptyContent(String),

    /// Structured extraction failed or returned unparseable data.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// Database operation failed.
    #[error("CACHE_UNAVAILABLE: {0}")]
    Database(Arc<tokio_rusqlite::Error>),

    /// Migration failed to apply.
    #[error("CACHE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// The lookup task itself died (panic or runtime shutdown).
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this failure means the source page could not be obtained at all.
    pub fn is_source_unreachable(&self) -> bool {
        matches!(
            self,
            Error::FetchTimeout(_)
                | Error::HttpStatus { .. }
                | Error::Network(_)
                | Error::FetchFailed(_)
                | Error::RenderFailed(_)
        )
    }

    /// Whether this failure came from the cache store.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Error::Database(_) | Error::MigrationFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => {
                Error::Database(Arc::new(tokio_rusqlite::Error::ConnectionClosed))
            }
            tokio_rusqlite::Error::Close(c) => Error::Database(Arc::new(tokio_rusqlite::Error::Close(c))),
            _ => Error::Database(Arc::new(tokio_rusqlite::Error::ConnectionClosed)),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(Arc::new(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(Arc::new(tokio_rusqlite::Error::Error(err)))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::ExtractFailed(_) => -32000,
            Error::EmptyContent(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::Network(_) => -32003,
            Error::FetchTimeout(_) => -32006,
            Error::FetchFailed(_) => -32007,
            Error::HttpStatus { .. } => -32008,
            Error::RenderFailed(_) => -32012,
            Error::Internal(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
