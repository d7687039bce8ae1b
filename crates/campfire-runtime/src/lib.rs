//! Campfire Runtime - startup and lifecycle for the Campfire bridge.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `CampfireConfig`)
//! - Logging setup on `tracing-subscriber`
//! - Runtime orchestration (`CampfireRuntime`) running the OneBot receiver
//!   and the game bridge side by side
//!
//! ```ignore
//! use campfire_runtime::CampfireRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CampfireRuntime::builder()
//!         .config_file("campfire.toml")
//!         .build()?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{CampfireConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents};
pub use runtime::{CampfireRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;

/// Logging macros for handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
