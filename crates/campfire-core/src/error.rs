//! Error types shared by the Campfire crates.
//!
//! Handler and listener failures are carried as [`BoxError`] so that any
//! error type can flow through the router and the event bus. Transport
//! failures have their own typed enum.

use thiserror::Error;

/// A type-erased error, identical to `tower::BoxError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while talking to the chat platform.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport has no live session.
    #[error("transport is not connected")]
    NotConnected,

    /// The platform rejected or failed to deliver a message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The platform answered with a non-zero status.
    #[error("platform returned {status}: {message}")]
    Rejected {
        /// Platform status or return code.
        status: i64,
        /// Message attached by the platform.
        message: String,
    },

    /// I/O or protocol error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
