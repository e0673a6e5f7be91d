//! Unified error handling for the roadscan library.
//!
//! Errors are split along the failure taxonomy of the pipeline: backend
//! HTTP failures (which carry the server's `detail` message verbatim),
//! pre-network validation failures, and local serialization/archive/IO
//! failures. Per-image export failures are deliberately NOT errors; they
//! are aggregated into the archive manifest (see [`crate::export`]).

use thiserror::Error;

/// Unified error type for roadscan operations.
#[derive(Debug, Error)]
pub enum RoadscanError {
    /// A backend request was rejected or returned a non-2xx status.
    /// `message` is the server-provided `detail` field when available.
    #[error("HTTP error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// Input rejected before any network call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport-level request failure (connect, timeout, TLS).
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Export archive assembly failure.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RoadscanError {
    /// Build an HTTP error from a status code and a server detail message.
    pub fn http(status: Option<u16>, message: impl Into<String>) -> Self {
        RoadscanError::Http {
            status,
            message: message.into(),
        }
    }

    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        RoadscanError::Validation(message.into())
    }
}

/// Result type alias for roadscan operations.
pub type Result<T> = std::result::Result<T, RoadscanError>;
