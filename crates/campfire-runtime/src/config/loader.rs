//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`campfire.{profile}.toml`)
//! 3. Main config file (`campfire.toml`, or the file passed to [`ConfigLoader::file`])
//! 4. Environment variables (`CAMPFIRE_*`)
//! 5. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `CAMPFIRE_` prefix with `__` as separator:
//!
//! - `CAMPFIRE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `CAMPFIRE_BRIDGE__PORT=6000` → `bridge.port = 6000`
//! - `CAMPFIRE_ONEBOT__ACCESS_TOKEN=xxx` → `onebot.access_token = "xxx"`
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .file("./campfire.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::CampfireConfig;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "campfire.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "CAMPFIRE_";

/// Written by [`ConfigLoader::ensure_default_file`] on first start.
pub const DEFAULT_CONFIG_TOML: &str = r#"# Campfire configuration.
# Every value can be overridden with CAMPFIRE_<SECTION>__<KEY> environment variables.

[logging]
# trace, debug, info, warn, error
level = "info"
# compact, full, pretty, json
format = "compact"
# stdout, stderr, file
output = "stdout"
file_path = "logs/app.log"
# never, hourly, daily
rotation = "daily"
max_files = 20

[onebot]
# Where OneBot posts events to (set the implementation's HTTP POST url to http://<listen><path>).
listen = "127.0.0.1:5700"
path = "/onebot"
# OneBot HTTP API.
api_url = "http://127.0.0.1:3000"
# access_token = ""
timeout_secs = 30

[bridge]
# HTTP bridge polled by the game server.
host = "0.0.0.0"
port = 5562
# Empty list allows every client.
allowed_ips = ["127.0.0.1", "192.168.1.100", "10.0.0.1"]
queue_capacity = 5

[auth]
# Users allowed to run /保存, /回档, /重置世界 and /ban.
allowed_uids = []
# Groups the bot reacts in. Empty means all.
allowed_groups = []

[forward]
# Groups that receive chat lines from the game.
bind_groups = []
prompt_timeout_secs = 30
"#;

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `CAMPFIRE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("CAMPFIRE_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration programmatically, above every other source.
    pub fn merge(mut self, config: CampfireConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Writes [`DEFAULT_CONFIG_TOML`] to `path` unless it already exists.
    ///
    /// Returns `true` if the file was created.
    pub fn ensure_default_file<P: AsRef<Path>>(path: P) -> ConfigResult<bool> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)?;
        info!(path = %path.display(), "Default configuration file written");
        Ok(true)
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<CampfireConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;
        let config: CampfireConfig = figment.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CampfireConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            if let Some(profile_path) = self.profile_variant(&path)
                && profile_path.exists()
            {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = figment.merge(Toml::file(&profile_path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(&path));
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let overrides = std::mem::take(&mut self.figment);
        Ok(figment.merge(overrides))
    }

    /// `campfire.toml` → `campfire.<profile>.toml`, in the same directory.
    fn profile_variant(&self, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        Some(path.with_file_name(format!("{stem}.{}.{ext}", self.profile.as_str())))
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("campfire"));
        }
        paths
    }

    /// Merges the first `campfire.toml` found, with its profile variant below it.
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        for search_path in self.resolve_search_paths() {
            let base_path = search_path.join(CONFIG_FILE_NAME);
            if let Some(profile_path) = self.profile_variant(&base_path)
                && profile_path.exists()
            {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = figment.merge(Toml::file(&profile_path));
            }
            if base_path.exists() {
                info!(path = %base_path.display(), "Loading configuration file");
                return figment.merge(Toml::file(&base_path));
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Loads from the default locations with environment overrides.
pub fn load_config() -> ConfigResult<CampfireConfig> {
    ConfigLoader::new().load()
}

/// Loads from `path` with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CampfireConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load_in(jail: &Jail) -> figment::error::Result<CampfireConfig> {
        ConfigLoader::new()
            .search_path(jail.directory())
            .load()
            .map_err(|e| e.to_string().into())
    }

    #[test]
    fn defaults_without_any_file() {
        Jail::expect_with(|jail| {
            let config = load_in(jail)?;
            assert_eq!(config, CampfireConfig::default());
            assert_eq!(config.bridge.port, 5562);
            assert_eq!(config.bridge.queue_capacity, 5);
            assert_eq!(config.forward.prompt_timeout_secs, 30);
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                r#"
                [bridge]
                port = 6000
                allowed_ips = []

                [auth]
                allowed_uids = [42, 43]

                [forward]
                bind_groups = [900]
                "#,
            )?;
            jail.set_env("CAMPFIRE_BRIDGE__PORT", "7000");
            jail.set_env("CAMPFIRE_LOGGING__LEVEL", "debug");

            let config = load_in(jail)?;
            assert_eq!(config.bridge.port, 7000);
            assert!(config.bridge.allowed_ips.is_empty());
            assert_eq!(config.auth.allowed_uids, vec![42, 43]);
            assert_eq!(config.forward.bind_groups, vec![900]);
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn profile_file_sits_below_main_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "campfire.production.toml",
                "[bridge]\nport = 7001\nhost = \"127.0.0.1\"",
            )?;
            jail.create_file(CONFIG_FILE_NAME, "[bridge]\nport = 7002")?;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .profile("prod")
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.bridge.port, 7002);
            assert_eq!(config.bridge.host, "127.0.0.1");
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        Jail::expect_with(|jail| {
            let result = ConfigLoader::new()
                .file(jail.directory().join("nope.toml"))
                .load();
            assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
            Ok(())
        });
    }

    #[test]
    fn default_file_is_written_once_and_loads() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("conf").join(CONFIG_FILE_NAME);
            assert!(ConfigLoader::ensure_default_file(&path).map_err(|e| e.to_string())?);
            assert!(!ConfigLoader::ensure_default_file(&path).map_err(|e| e.to_string())?);

            let config = ConfigLoader::new()
                .file(&path)
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config, CampfireConfig::default());
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE_NAME, "[bridge]\nport = \"not a number\"")?;
            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::Parse(_))));
            Ok(())
        });
    }

    #[test]
    fn profile_aliases() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
