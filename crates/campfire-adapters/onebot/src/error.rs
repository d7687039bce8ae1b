//! Error types for the OneBot adapter.

use thiserror::Error;

/// Errors raised while setting up the adapter.
#[derive(Debug, Error)]
pub enum OneBotError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The API URL is not an `http(s)` URL.
    #[error("invalid OneBot API URL '{url}'")]
    InvalidApiUrl {
        /// The rejected URL.
        url: String,
    },

    /// The event receiver could not bind or serve.
    #[error("event receiver I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for adapter setup.
pub type OneBotResult<T> = Result<T, OneBotError>;
