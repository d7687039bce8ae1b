//! Configuration schema definitions.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [onebot]
//! listen = "0.0.0.0:5700"
//! api_url = "http://127.0.0.1:3000"
//!
//! [bridge]
//! port = 5562
//! allowed_ips = ["127.0.0.1"]
//!
//! [auth]
//! allowed_uids = [10001]
//!
//! [forward]
//! bind_groups = [123456]
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampfireConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Chat platform connection.
    #[serde(default)]
    pub onebot: OneBotConfig,

    /// HTTP bridge polled by the game server.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Who may run game-affecting commands, and where the bot listens.
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub forward: ForwardConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Needs the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// When the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error. `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for [`LogOutput::File`].
    #[serde(default = "default_log_file")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files kept on disk.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of the log call.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `campfire_forward = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: default_log_file(),
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("logs/app.log"))
}

fn default_max_files() -> usize {
    20
}

// =============================================================================
// OneBot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneBotConfig {
    /// Address the event receiver binds to.
    #[serde(default = "default_onebot_listen")]
    pub listen: String,

    /// Path OneBot posts events to.
    #[serde(default = "default_onebot_path")]
    pub path: String,

    /// Base URL of the OneBot HTTP API.
    #[serde(default = "default_onebot_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    /// API request timeout in seconds.
    #[serde(default = "default_onebot_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            listen: default_onebot_listen(),
            path: default_onebot_path(),
            api_url: default_onebot_api_url(),
            access_token: None,
            timeout_secs: default_onebot_timeout_secs(),
        }
    }
}

impl OneBotConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_onebot_listen() -> String {
    "127.0.0.1:5700".to_string()
}

fn default_onebot_path() -> String {
    "/onebot".to_string()
}

fn default_onebot_api_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_onebot_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Bridge
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_host")]
    pub host: String,

    #[serde(default = "default_bridge_port")]
    pub port: u16,

    /// Clients allowed to poll. Empty allows everyone.
    #[serde(default = "default_allowed_ips")]
    pub allowed_ips: Vec<String>,

    /// Entries kept while the game server is not polling.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_bridge_host(),
            port: default_bridge_port(),
            allowed_ips: default_allowed_ips(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_bridge_host() -> String {
    "0.0.0.0".to_string()
}

fn default_bridge_port() -> u16 {
    5562
}

fn default_allowed_ips() -> Vec<String> {
    ["127.0.0.1", "192.168.1.100", "10.0.0.1"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_queue_capacity() -> usize {
    campfire_forward::DEFAULT_QUEUE_CAPACITY
}

// =============================================================================
// Auth & forwarding
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Users allowed to run `/保存`, `/回档`, `/重置世界` and `/ban`.
    #[serde(default)]
    pub allowed_uids: Vec<i64>,

    /// Groups the bot reacts in. Empty means all.
    #[serde(default)]
    pub allowed_groups: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Groups receiving chat lines from the game.
    #[serde(default)]
    pub bind_groups: Vec<i64>,

    /// Seconds destructive commands wait for `确认`.
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            bind_groups: Vec::new(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
        }
    }
}

impl ForwardConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }
}

fn default_prompt_timeout_secs() -> u64 {
    campfire_framework::DEFAULT_PROMPT_TIMEOUT.as_secs()
}
