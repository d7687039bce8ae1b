//! Configuration module for the Campfire runtime.
//!
//! TOML files and `CAMPFIRE_*` environment variables are layered with
//! figment, then validated once at startup.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    CONFIG_FILE_NAME, ConfigLoader, DEFAULT_CONFIG_TOML, Profile, load_config,
    load_config_from_file,
};
pub use schema::{
    AuthConfig, BridgeConfig, CampfireConfig, ForwardConfig, LogFormat, LogOutput, LogRotation,
    LoggingConfig, OneBotConfig, SpanEventConfig,
};
pub use validation::{config_warnings, validate_config};
