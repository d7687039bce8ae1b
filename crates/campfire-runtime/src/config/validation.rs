//! Configuration validation utilities.

use std::net::{IpAddr, SocketAddr};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BridgeConfig, CampfireConfig, ForwardConfig, LoggingConfig, OneBotConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &CampfireConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_onebot_config(&config.onebot)?;
    validate_bridge_config(&config.bridge)?;
    validate_forward_config(&config.forward)?;
    Ok(())
}

/// Settings that are legal but probably not what the operator wants.
pub fn config_warnings(config: &CampfireConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.forward.bind_groups.is_empty() {
        warnings.push("forward.bind_groups is empty, game chat will not reach any group".into());
    }
    if config.auth.allowed_uids.is_empty() {
        warnings.push("auth.allowed_uids is empty, nobody can run game commands".into());
    }
    if config.bridge.allowed_ips.is_empty() {
        warnings.push("bridge.allowed_ips is empty, every client may poll the bridge".into());
    }
    warnings
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if !VALID_LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        return Err(ConfigError::validation(format!(
            "Invalid log level: {}. Valid values are: {:?}",
            logging.level, VALID_LOG_LEVELS
        )));
    }
    for (target, level) in &logging.filters {
        if !VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(format!(
                "Invalid log level for {target}: {level}"
            )));
        }
    }
    Ok(())
}

fn validate_onebot_config(onebot: &OneBotConfig) -> ConfigResult<()> {
    if onebot.listen.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::invalid_address("onebot.listen", &onebot.listen));
    }
    validate_path(&onebot.path)?;
    validate_http_url(&onebot.api_url)?;
    if onebot.timeout_secs == 0 {
        return Err(ConfigError::validation("onebot.timeout_secs must be greater than 0"));
    }
    Ok(())
}

fn validate_bridge_config(bridge: &BridgeConfig) -> ConfigResult<()> {
    if bridge.host.parse::<IpAddr>().is_err() {
        return Err(ConfigError::invalid_address("bridge.host", &bridge.host));
    }
    if bridge.port == 0 {
        return Err(ConfigError::InvalidPort(bridge.port));
    }
    if let Some(bad) = bridge
        .allowed_ips
        .iter()
        .find(|ip| ip.trim().parse::<IpAddr>().is_err())
    {
        return Err(ConfigError::invalid_address("bridge.allowed_ips", bad));
    }
    if bridge.queue_capacity == 0 {
        return Err(ConfigError::validation("bridge.queue_capacity must be greater than 0"));
    }
    Ok(())
}

fn validate_forward_config(forward: &ForwardConfig) -> ConfigResult<()> {
    if forward.prompt_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "forward.prompt_timeout_secs must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_http_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("onebot.api_url"));
    }
    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }
    Ok(())
}

fn validate_path(path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::validation("onebot.path must start with '/'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&CampfireConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = CampfireConfig::default();
        config.logging.level = "verbose".into();
        assert!(matches!(validate_config(&config), Err(ConfigError::Validation { .. })));

        let mut config = CampfireConfig::default();
        config.logging.filters.insert("campfire_forward".into(), "loud".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_port_capacity_and_timeout() {
        let mut config = CampfireConfig::default();
        config.bridge.port = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidPort(0))));

        let mut config = CampfireConfig::default();
        config.bridge.queue_capacity = 0;
        assert!(validate_config(&config).is_err());

        let mut config = CampfireConfig::default();
        config.forward.prompt_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_bad_addresses() {
        let mut config = CampfireConfig::default();
        config.onebot.listen = "localhost".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidAddress { .. })
        ));

        let mut config = CampfireConfig::default();
        config.bridge.allowed_ips.push("10.0.0.x".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn rejects_non_http_api_url() {
        let mut config = CampfireConfig::default();
        config.onebot.api_url = "ws://127.0.0.1:3001".into();
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidUrl { .. })));

        config.onebot.api_url = String::new();
        assert!(matches!(validate_config(&config), Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn empty_bind_groups_is_only_a_warning() {
        let config = CampfireConfig::default();
        assert!(validate_config(&config).is_ok());
        let warnings = config_warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("bind_groups")));
    }
}
