//! Error types for the Warden client.

use thiserror::Error;

/// Errors that can occur when talking to the Warden server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to establish connection to the server.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// HTTP request failed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an invalid or unparseable response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Server returned 404 for the addressed device or operation.
    #[error("Not found: {message}")]
    NotFound {
        /// Error message from server.
        message: String,
    },

    /// Server returned 409 (already-owned device, active wipe, ...).
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message from server.
        message: String,
    },

    /// Server rejected the request as malformed (400).
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from server.
        message: String,
    },

    /// Server returned a 5xx error.
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// Request gave up after the maximum retry attempts.
    #[error("Gave up after {0} attempts")]
    RetriesExhausted(u32),
}

impl ClientError {
    /// Whether a retry could plausibly succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Request(_) | Self::ServerError { .. }
        )
    }
}
