//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.apphost/config.toml` (user)
//! 3. Merge `{workspace}/.apphost/config.toml` (workspace)
//! 4. Apply env var fallbacks for unset fields
//! 5. Deserialize merged tree → [`HostConfig`]
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::HostConfig;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration together with where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: HostConfig,
    /// Layer that set each dotted field path.
    pub field_sources: FieldSources,
    /// Config files that contributed, in merge order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Layer that set `field` (e.g. `"server.port"`), if known.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }
}

/// Load the host configuration with layered file precedence.
///
/// `workspace_root` is the root of the current project. If `None`, the
/// workspace layer is skipped. `home_override` replaces user-level config
/// discovery: `{home_override}/config.toml` is used directly.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    load_with_env(workspace_root, home_override, &collect_env_vars())
}

/// [`load`] against an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();

    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    // User layer.
    let user_config = if let Some(h) = home_override {
        let path = h.join("config.toml");
        try_load_file(&path)?.map(|overlay| (overlay, path))
    } else {
        let user_path = home_directory()?.join(".apphost").join("config.toml");
        if let Some(overlay) = try_load_file(&user_path)? {
            Some((overlay, user_path))
        } else if let Some(apphost_home) = env_vars.get("APPHOST_HOME") {
            let alt_path = PathBuf::from(apphost_home).join("config.toml");
            try_load_file(&alt_path)?.map(|overlay| (overlay, alt_path))
        } else {
            None
        }
    };

    if let Some((overlay, path)) = user_config {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    // Workspace layer.
    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(".apphost").join("config.toml");
        if let Some(overlay) = try_load_file(&ws_path)? {
            deep_merge_tracking(
                &mut merged,
                &overlay,
                "",
                &ConfigLayer::Workspace,
                &mut field_sources,
            );
            loaded_files.push(ws_path.display().to_string());
            info!(path = %ws_path.display(), "loaded workspace config");
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: HostConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<HostConfig> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, metadata.len())?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: HostConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    // Check file size before reading.
    check_size(path, metadata.len())?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn check_size(path: &Path, len: u64) -> ConfigResult<()> {
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }
    Ok(())
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
