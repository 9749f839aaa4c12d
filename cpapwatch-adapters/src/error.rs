//! Error types for snapshot clients.

use thiserror::Error;

/// Errors that can occur while fetching a snapshot.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse a payload.
    #[error("Failed to parse {payload} payload: {message}")]
    Parse {
        payload: &'static str,
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A payload was requested before `connect()` succeeded.
    #[error("Client is not connected")]
    NotConnected,

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Reading a local payload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub(crate) fn parse(payload: &'static str, err: impl std::fmt::Display) -> Self {
        FetchError::Parse {
            payload,
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}
