//! Errors from loading and checking `campfire.toml`.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded or was rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {0} does not exist")]
    FileNotFound(PathBuf),

    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A source could not be parsed or did not fit the schema.
    #[error("malformed configuration: {0}")]
    Parse(String),

    #[error("invalid configuration: {message}")]
    Validation { message: String },

    #[error("{field} must be set")]
    MissingField { field: String },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// `{field}` is not a socket or IP address.
    #[error("{field} = {value:?} is not a valid address")]
    InvalidAddress { field: String, value: String },

    #[error("port {0} cannot be bound")]
    InvalidPort(u16),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_address(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAddress {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
