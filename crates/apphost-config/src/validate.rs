//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::HostConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &HostConfig) -> ConfigResult<()> {
    validate_server(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_server(config: &HostConfig) -> ConfigResult<()> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".to_owned(),
            message: "host must not be empty".to_owned(),
        });
    }
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".to_owned(),
            message: "port must be between 1 and 65535".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &HostConfig) -> ConfigResult<()> {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unknown level '{}'; expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }
    let format = config.logging.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unknown format '{}'; expected one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }
    Ok(())
}
