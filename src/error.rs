//! Error types for url-fetcher
//!
//! Two layers of errors exist:
//! - [`Error`] is the run-level error. It aborts a run (unwritable sink, bad
//!   configuration, missing input file) and is returned to the caller.
//! - [`FetchError`] classifies a single failed attempt for one URL. It never
//!   crosses the orchestrator boundary; an exhausted URL is reported as a failed
//!   [`FetchResult`](crate::types::FetchResult) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for url-fetcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent")
        key: Option<String>,
    },

    /// I/O error (sink creation, sink append, input read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while encoding a sink record
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client could not be constructed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL list file does not exist
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure of a single fetch attempt
///
/// The `Display` output is the human-readable reason stored in a failed
/// [`FetchResult`](crate::types::FetchResult) and written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The exchange did not finish within the per-attempt timeout
    #[error("Timeout")]
    Timeout,

    /// Connection, request or body transfer failed
    #[error("Client error: {0}")]
    Connection(String),

    /// Server answered with a status other than 200
    #[error("HTTP {0}")]
    Status(u16),

    /// Body of a 200 response is not valid JSON
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Anything that does not fit the categories above
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl FetchError {
    /// Short machine-readable name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Connection(_) => "connection",
            FetchError::Status(_) => "status",
            FetchError::InvalidContent(_) => "invalid_content",
            FetchError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::InvalidContent(e.to_string())
    }
}
