//! Configuration types for the apphost runtime.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header in TOML produces a working
//! configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level HostConfig
// ---------------------------------------------------------------------------

/// Root configuration for an apphost process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Where the shared router is reachable.
    pub server: ServerSection,
    /// Which apps to attach at boot and how.
    pub apps: AppsSection,
    /// Document and app-data directories.
    pub storage: StorageSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// Address used to build app URLs (`<host>:<port>/<app>/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

// ---------------------------------------------------------------------------
// AppsSection
// ---------------------------------------------------------------------------

/// App attachment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppsSection {
    /// Directory relative attach locations resolve against. Defaults to the
    /// process working directory.
    pub working_dir: Option<PathBuf>,
    /// App locations attached at boot, in order.
    pub autoload: Vec<PathBuf>,
    /// Directory whose app sub-directories are all attached at boot.
    pub discover_dir: Option<PathBuf>,
    /// Launch every app attached at boot.
    pub launch_on_attach: bool,
    /// Shared client modules served at `/modules/<name>`, by name.
    pub client_modules: BTreeMap<String, PathBuf>,
}

impl Default for AppsSection {
    fn default() -> Self {
        Self {
            working_dir: None,
            autoload: Vec::new(),
            discover_dir: None,
            launch_on_attach: true,
            client_modules: BTreeMap::new(),
        }
    }
}

impl AppsSection {
    /// The effective working directory, falling back to `fallback`.
    #[must_use]
    pub fn working_dir_or(&self, fallback: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => fallback.join(dir),
            None => fallback.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Storage directories. Unset directories fall back to the platform data
/// directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root of the documents space.
    pub documents_dir: Option<PathBuf>,
    /// Root of the app-data space.
    pub app_data_dir: Option<PathBuf>,
}

impl StorageSection {
    /// Resolve the documents root.
    ///
    /// Relative paths resolve against `base`. Without an explicit setting the
    /// platform documents directory is used (`<documents>/apphost`), then the
    /// platform data directory, then `base/.apphost/documents`.
    #[must_use]
    pub fn resolve_documents_dir(&self, base: &Path) -> PathBuf {
        if let Some(dir) = &self.documents_dir {
            return resolve_against(dir, base);
        }
        directories::UserDirs::new()
            .and_then(|d| d.document_dir().map(|p| p.join("apphost")))
            .or_else(|| {
                directories::BaseDirs::new().map(|d| d.data_dir().join("apphost").join("documents"))
            })
            .unwrap_or_else(|| base.join(".apphost").join("documents"))
    }

    /// Resolve the app-data root.
    ///
    /// Relative paths resolve against `base`. Without an explicit setting the
    /// platform data directory is used (`<data>/apphost/app-data`), then
    /// `base/.apphost/app-data`.
    #[must_use]
    pub fn resolve_app_data_dir(&self, base: &Path) -> PathBuf {
        if let Some(dir) = &self.app_data_dir {
            return resolve_against(dir, base);
        }
        directories::BaseDirs::new()
            .map(|d| d.data_dir().join("apphost").join("app-data"))
            .unwrap_or_else(|| base.join(".apphost").join("app-data"))
    }
}

fn resolve_against(dir: &Path, base: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra filter directives (e.g. `apphost_runtime=debug`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_sections_use_defaults() {
        let config: HostConfig = toml::from_str("[server]\n[apps]\n").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.apps.launch_on_attach);
    }

    #[test]
    fn working_dir_resolution() {
        let base = Path::new("/srv");
        let mut apps = AppsSection::default();
        assert_eq!(apps.working_dir_or(base), PathBuf::from("/srv"));

        apps.working_dir = Some(PathBuf::from("apps"));
        assert_eq!(apps.working_dir_or(base), PathBuf::from("/srv/apps"));

        apps.working_dir = Some(PathBuf::from("/opt/apps"));
        assert_eq!(apps.working_dir_or(base), PathBuf::from("/opt/apps"));
    }

    #[test]
    fn explicit_storage_dirs_resolve_against_base() {
        let storage = StorageSection {
            documents_dir: Some(PathBuf::from("docs")),
            app_data_dir: Some(PathBuf::from("/var/lib/apphost")),
        };
        let base = Path::new("/home/me/project");
        assert_eq!(
            storage.resolve_documents_dir(base),
            PathBuf::from("/home/me/project/docs")
        );
        assert_eq!(
            storage.resolve_app_data_dir(base),
            PathBuf::from("/var/lib/apphost")
        );
    }
}
