//! Error types for the forwarding plugin.

use thiserror::Error;

/// Errors raised while setting up forwarding.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// A command argument pattern failed to compile.
    #[error("invalid command pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An entry of the bridge allow-list is not an IP address.
    #[error("invalid allowed IP '{value}'")]
    InvalidAllowedIp {
        /// The rejected entry.
        value: String,
    },

    /// The bridge could not bind or serve.
    #[error("bridge I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for forwarding setup.
pub type ForwardResult<T> = Result<T, ForwardError>;
