//! Runtime error types.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use campfire_adapter_onebot::OneBotError;
use campfire_forward::ForwardError;
use thiserror::Error;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The chat adapter could not be set up or stopped serving.
    #[error("OneBot adapter error: {0}")]
    Adapter(#[from] OneBotError),

    /// Command registration or the bridge failed.
    #[error("Forwarding error: {0}")]
    Forward(#[from] ForwardError),

    /// A listener could not bind its address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A server task panicked or was aborted.
    #[error("Server task failed: {0}")]
    Task(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
