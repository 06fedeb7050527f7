//! App manifest types.
//!
//! A manifest is optional. `App.toml` is preferred; a `package.json` is
//! accepted for apps written against the older layout, with its `main`
//! field mapped to [`AppManifest::entry`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// Preferred manifest file name.
pub const MANIFEST_FILE_NAME: &str = "App.toml";

/// Legacy manifest file name.
pub const LEGACY_MANIFEST_FILE_NAME: &str = "package.json";

/// Entry module used when the manifest does not name one.
pub const DEFAULT_ENTRY: &str = "app";

/// Maximum manifest size (256 KiB).
const MAX_MANIFEST_SIZE: u64 = 262_144;

/// Parsed app manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Namespace name. Defaults to the final segment of the app location.
    #[serde(default)]
    pub name: Option<String>,
    /// Entry module, relative to the app location.
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Version string, informational only.
    #[serde(default)]
    pub version: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Every other field, kept for the app's own use.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_entry() -> String {
    DEFAULT_ENTRY.to_string()
}

impl Default for AppManifest {
    fn default() -> Self {
        Self {
            name: None,
            entry: default_entry(),
            version: None,
            description: None,
            extra: BTreeMap::new(),
        }
    }
}

/// `package.json` shape; only the fields the runtime understands are typed.
#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl From<PackageJson> for AppManifest {
    fn from(pkg: PackageJson) -> Self {
        Self {
            name: pkg.name,
            entry: pkg.main.unwrap_or_else(default_entry),
            version: pkg.version,
            description: pkg.description,
            extra: pkg.extra,
        }
    }
}

impl AppManifest {
    /// Parse an `App.toml` document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Manifest`] on malformed TOML.
    pub fn from_toml(path: &Path, content: &str) -> RuntimeResult<Self> {
        toml::from_str(content).map_err(|e| manifest_error(path, e))
    }

    /// Parse a `package.json` document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Manifest`] on malformed JSON.
    pub fn from_package_json(path: &Path, content: &str) -> RuntimeResult<Self> {
        serde_json::from_str::<PackageJson>(content)
            .map(Self::from)
            .map_err(|e| manifest_error(path, e))
    }

    /// Path of the entry module for an app at `location`.
    #[must_use]
    pub fn entry_path(&self, location: &Path) -> PathBuf {
        location.join(&self.entry)
    }
}

/// The manifest file present in `dir`, if any. `App.toml` wins.
#[must_use]
pub fn manifest_path(dir: &Path) -> Option<PathBuf> {
    [MANIFEST_FILE_NAME, LEGACY_MANIFEST_FILE_NAME]
        .into_iter()
        .map(|file| dir.join(file))
        .find(|path| path.is_file())
}

/// Read the manifest of the app at `dir`, or the default manifest if the
/// directory carries none.
///
/// # Errors
///
/// Returns [`RuntimeError::Manifest`] if a manifest file exists but cannot
/// be read or parsed.
pub fn load_manifest(dir: &Path) -> RuntimeResult<AppManifest> {
    let Some(path) = manifest_path(dir) else {
        return Ok(AppManifest::default());
    };

    let len = std::fs::metadata(&path)
        .map_err(|e| manifest_error(&path, e))?
        .len();
    if len > MAX_MANIFEST_SIZE {
        return Err(manifest_error(
            &path,
            format!("manifest is {len} bytes, exceeding the {MAX_MANIFEST_SIZE} byte limit"),
        ));
    }
    let content = std::fs::read_to_string(&path).map_err(|e| manifest_error(&path, e))?;

    if path.file_name().is_some_and(|n| n == LEGACY_MANIFEST_FILE_NAME) {
        AppManifest::from_package_json(&path, &content)
    } else {
        AppManifest::from_toml(&path, &content)
    }
}

fn manifest_error(path: &Path, error: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::Manifest {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
