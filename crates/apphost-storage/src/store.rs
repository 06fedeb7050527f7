//! Document store trait and implementations.
//!
//! The [`DocumentStore`] trait provides byte-level `save`/`load`/`delete`
//! operations on relative paths inside one of two [`StorageSpace`]s.
//! Implementations:
//!
//! - **In-memory** ([`MemoryDocumentStore`]): For tests and ephemeral data
//! - **Filesystem** ([`FileDocumentStore`]): One root directory per space
//!
//! JSON helpers (`save_json`, `load_json`) are provided on `dyn DocumentStore`
//! on top of the raw byte API.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a storage path is a non-empty relative path that stays
/// inside its space.
fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("path must not be empty".into()));
    }
    if path.contains('\0') {
        return Err(StorageError::InvalidPath(
            "path must not contain null bytes".into(),
        ));
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(StorageError::InvalidPath(format!(
            "path must be relative: {path}"
        )));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(StorageError::InvalidPath(format!(
            "path must not contain '..': {path}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The two independent storage spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageSpace {
    /// User-facing documents.
    Documents,
    /// App-private state.
    AppData,
}

impl fmt::Display for StorageSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Documents => f.write_str("documents"),
            Self::AppData => f.write_str("app-data"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Byte-level document storage with two spaces.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Save `content` at `path`, overwriting any existing content.
    async fn save(&self, space: StorageSpace, path: &str, content: Vec<u8>) -> StorageResult<()>;

    /// Load the content at `path`.
    ///
    /// Returns `None` if nothing is stored there.
    async fn load(&self, space: StorageSpace, path: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Delete the content at `path`.
    ///
    /// Returns `true` if something was deleted.
    async fn delete(&self, space: StorageSpace, path: &str) -> StorageResult<bool>;

    /// List every stored path that starts with `prefix`, sorted.
    async fn list(&self, space: StorageSpace, prefix: &str) -> StorageResult<Vec<String>>;
}

impl dyn DocumentStore {
    /// Serialize `value` as JSON and save it at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if `value` cannot be encoded,
    /// or any error from [`DocumentStore::save`].
    pub async fn save_json<T: Serialize>(
        &self,
        space: StorageSpace,
        path: &str,
        value: &T,
    ) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.save(space, path, bytes).await
    }

    /// Load and decode the JSON value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the stored bytes are not
    /// valid JSON for `T`, or any error from [`DocumentStore::load`].
    pub async fn load_json<T: DeserializeOwned>(
        &self,
        space: StorageSpace,
        path: &str,
    ) -> StorageResult<Option<T>> {
        match self.load(space, path).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory document store for tests and headless hosts.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    data: std::sync::RwLock<HashMap<(StorageSpace, String), Vec<u8>>>,
}

impl MemoryDocumentStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn save(&self, space: StorageSpace, path: &str, content: Vec<u8>) -> StorageResult<()> {
        validate_path(path)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.insert((space, path.to_string()), content);
        Ok(())
    }

    async fn load(&self, space: StorageSpace, path: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_path(path)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.get(&(space, path.to_string())).cloned())
    }

    async fn delete(&self, space: StorageSpace, path: &str) -> StorageResult<bool> {
        validate_path(path)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.remove(&(space, path.to_string())).is_some())
    }

    async fn list(&self, space: StorageSpace, prefix: &str) -> StorageResult<Vec<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let mut paths: Vec<String> = data
            .keys()
            .filter(|(s, p)| *s == space && p.starts_with(prefix))
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        Ok(paths)
    }
}

// ---------------------------------------------------------------------------
// Filesystem implementation
// ---------------------------------------------------------------------------

/// Filesystem-backed document store.
///
/// Each space maps to its own root directory; `path` segments become
/// sub-directories below it. Parent directories are created on save.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    documents_root: PathBuf,
    app_data_root: PathBuf,
}

impl FileDocumentStore {
    /// Create a store rooted at the two given directories.
    #[must_use]
    pub fn new(documents_root: impl Into<PathBuf>, app_data_root: impl Into<PathBuf>) -> Self {
        Self {
            documents_root: documents_root.into(),
            app_data_root: app_data_root.into(),
        }
    }

    /// Root directory of a space.
    #[must_use]
    pub fn root(&self, space: StorageSpace) -> &Path {
        match space {
            StorageSpace::Documents => &self.documents_root,
            StorageSpace::AppData => &self.app_data_root,
        }
    }

    fn resolve(&self, space: StorageSpace, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root(space).join(path))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Relative, `/`-separated form of `path` below `root`.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?.to_string());
        }
    }
    Some(parts.join("/"))
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn save(&self, space: StorageSpace, path: &str, content: Vec<u8>) -> StorageResult<()> {
        let full = self.resolve(space, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| io_err(&full, e))?;
        debug!(space = %space, path, "Saved document");
        Ok(())
    }

    async fn load(&self, space: StorageSpace, path: &str) -> StorageResult<Option<Vec<u8>>> {
        let full = self.resolve(space, path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&full, e)),
        }
    }

    async fn delete(&self, space: StorageSpace, path: &str) -> StorageResult<bool> {
        let full = self.resolve(space, path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&full, e)),
        }
    }

    async fn list(&self, space: StorageSpace, prefix: &str) -> StorageResult<Vec<String>> {
        let root = self.root(space).to_path_buf();
        let mut paths = Vec::new();
        let mut pending = vec![root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err(&dir, e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_err(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(key) = relative_key(&root, &path)
                    && key.starts_with(prefix)
                {
                    paths.push(key);
                }
            }
        }

        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_validation() {
        assert!(validate_path("notes/a.txt").is_ok());
        assert!(validate_path("app/.hidden").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/etc/passwd").is_err());
        assert!(validate_path("app/../other/secret").is_err());
        assert!(validate_path("app\\..\\other").is_err());
        assert!(validate_path("a\0b").is_err());
    }

    #[tokio::test]
    async fn memory_spaces_are_separate() {
        let store = MemoryDocumentStore::new();
        store
            .save(StorageSpace::Documents, "app/a.txt", b"doc".to_vec())
            .await
            .unwrap();

        assert_eq!(
            store.load(StorageSpace::Documents, "app/a.txt").await.unwrap(),
            Some(b"doc".to_vec())
        );
        assert_eq!(
            store.load(StorageSpace::AppData, "app/a.txt").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn memory_list_and_delete() {
        let store = MemoryDocumentStore::new();
        store
            .save(StorageSpace::AppData, "b/x", b"1".to_vec())
            .await
            .unwrap();
        store
            .save(StorageSpace::AppData, "a/y", b"2".to_vec())
            .await
            .unwrap();
        store
            .save(StorageSpace::AppData, "a/x", b"3".to_vec())
            .await
            .unwrap();

        let listed = store.list(StorageSpace::AppData, "a/").await.unwrap();
        assert_eq!(listed, vec!["a/x".to_string(), "a/y".to_string()]);

        assert!(store.delete(StorageSpace::AppData, "a/x").await.unwrap());
        assert!(!store.delete(StorageSpace::AppData, "a/x").await.unwrap());
    }

    #[tokio::test]
    async fn json_helpers() {
        let store: std::sync::Arc<dyn DocumentStore> = std::sync::Arc::new(MemoryDocumentStore::new());
        store
            .save_json(
                StorageSpace::AppData,
                "app/state.json",
                &serde_json::json!({"count": 3}),
            )
            .await
            .unwrap();

        let loaded: Option<serde_json::Value> = store
            .load_json(StorageSpace::AppData, "app/state.json")
            .await
            .unwrap();
        assert_eq!(loaded, Some(serde_json::json!({"count": 3})));
    }

    #[tokio::test]
    async fn memory_rejects_escaping_paths() {
        let store = MemoryDocumentStore::new();
        let result = store
            .save(StorageSpace::Documents, "../escape", Vec::new())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }
}
