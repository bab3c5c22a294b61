//! Domain-specific error types for the viewer.
//!
//! All fallible operations return `Result<T, ViewerError>`.
//! Nothing in the ingestion path panics on hostile stream bytes: buffer
//! pressure is resolved by discarding data, and every other failure is
//! typed and recoverable by the caller.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The HTTP client failed before a response body was available.
    #[error("http error: {0}")]
    Http(String),

    /// The server answered with something other than `200 OK`.
    #[error("unexpected http status: {0}")]
    HttpStatus(u16),

    /// A receive was attempted on a source that is not open.
    #[error("stream source is not connected")]
    NotConnected,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A connection status change that is not allowed from the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    // ── Configuration Errors ─────────────────────────────────────
    /// Host, port or path failed character-set validation.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // ── Frame Errors ─────────────────────────────────────────────
    /// The frame bytes could not be turned into pixels.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Allocating the owned copy of a frame failed.
    #[error("out of memory copying {requested} byte frame")]
    OutOfMemory { requested: usize },

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for ViewerError {
    fn from(s: String) -> Self {
        ViewerError::Other(s)
    }
}

impl From<&str> for ViewerError {
    fn from(s: &str) -> Self {
        ViewerError::Other(s.to_string())
    }
}

impl From<reqwest::Error> for ViewerError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ViewerError::HttpStatus(status.as_u16()),
            None => ViewerError::Http(e.to_string()),
        }
    }
}

impl From<image::ImageError> for ViewerError {
    fn from(e: image::ImageError) -> Self {
        ViewerError::Decode(e.to_string())
    }
}
