//! Error types and handling.

use thiserror::Error;

use crate::gt06::ProtocolError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// File or socket I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol-level failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Record persistence failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create a config error with message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a storage error with message
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
