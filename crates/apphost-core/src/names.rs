//! App identity and namespacing.
//!
//! Every resource an app places on a shared surface is prefixed with the
//! app's name. The helpers at the bottom of this module are the only place
//! these prefixes are spelled out, and their output is part of the wire
//! contract with existing apps:
//!
//! | Resource | Shape |
//! |----------|-------|
//! | HTTP route | `/<app><path>` |
//! | Socket namespace | `/<app>/` |
//! | Listener key | `<app>/<listener>` |
//! | Document / app data | `<app>/<relative path>` |
//! | App URL | `<host>:<port>/<app>/` |

use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::http::Verb;

/// Unique, human-readable app name. Used as the namespace prefix on every
/// shared surface, so it may not contain path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AppName(String);

impl<'de> Deserialize<'de> for AppName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl AppName {
    /// Create a validated app name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAppName`] if the name is empty, is `.` or
    /// `..`, or contains a path separator or control character.
    pub fn new(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Derive a name from the final segment of an app location.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAppName`] if the location has no final
    /// segment or the segment is not valid UTF-8.
    pub fn from_location(location: &Path) -> CoreResult<Self> {
        let segment = location
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::InvalidAppName {
                name: location.display().to_string(),
                reason: "location has no final path segment".into(),
            })?;
        Self::new(segment)
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> CoreResult<()> {
        let reject = |reason: &str| CoreError::InvalidAppName {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(reject("name must not be empty"));
        }
        if name == "." || name == ".." {
            return Err(reject("name must not be a relative path component"));
        }
        if name.contains(['/', '\\']) {
            return Err(reject("name must not contain path separators"));
        }
        if name.chars().any(char::is_control) {
            return Err(reject("name must not contain control characters"));
        }
        Ok(())
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AppName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Length of a generated [`AppId`].
const APP_ID_LEN: usize = 8;

const APP_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random per-attach token identifying one app record.
///
/// Ids are advisory: they are drawn from a random source and are not checked
/// for uniqueness against other attached apps. The [`AppName`] is the
/// primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppId(String);

impl AppId {
    /// Generate a fresh random id of eight base-36 characters.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..APP_ID_LEN)
            .map(|_| char::from(APP_ID_ALPHABET[rng.gen_range(0..APP_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Route path on the shared router for an app-relative `path`.
#[must_use]
pub fn route_path(app: &AppName, path: &str) -> String {
    format!("/{app}{path}")
}

/// Human-readable route label used in logs (`GET /app/items`).
#[must_use]
pub fn route_label(verb: Verb, app: &AppName, path: &str) -> String {
    format!("{verb} {}", route_path(app, path))
}

/// Socket namespace owned by an app.
#[must_use]
pub fn socket_namespace(app: &AppName) -> String {
    format!("/{app}/")
}

/// Key of an app listener in the global listener table.
#[must_use]
pub fn listener_key(app: &AppName, listener: &str) -> String {
    format!("{app}/{listener}")
}

/// Storage path of an app document or app-data entry.
#[must_use]
pub fn storage_path(app: &AppName, relative: &str) -> String {
    format!("{app}/{relative}")
}

/// Public URL of an app, without scheme.
#[must_use]
pub fn app_url(host: &str, port: u16, app: &AppName) -> String {
    format!("{host}:{port}/{app}/")
}
