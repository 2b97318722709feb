//! Error types for the scorm-storage crate

use std::time::Duration;
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Folder or path failed validation
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Cloud API returned an error
    #[error("cloud API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Whether the error was caused by caller input rather than the backend
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StorageError::InvalidName(_))
    }

    /// Classify an HTTP client error from a client built with `timeout`
    pub fn from_http(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            StorageError::Timeout {
                seconds: timeout.as_secs(),
            }
        } else if err.is_connect() {
            StorageError::Connection(err.to_string())
        } else if err.is_decode() {
            StorageError::Deserialization(err.to_string())
        } else {
            StorageError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Deserialization(err.to_string())
    }
}
