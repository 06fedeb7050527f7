//! Test fixtures: app directories on disk and a full set of surfaces.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apphost_storage::MemoryDocumentStore;

use crate::mocks::{MockRouter, MockSocketEngine, MockWindowManager};

/// Port reported by [`TestSurfaces`]' router.
pub const TEST_PORT: u16 = 3000;

/// Create `root/dir_name` and, if given, write `manifest` as its `App.toml`.
///
/// # Panics
///
/// Panics if the directory or file cannot be written.
#[must_use]
pub fn write_app_dir(root: &Path, dir_name: &str, manifest: Option<&str>) -> PathBuf {
    let dir = root.join(dir_name);
    std::fs::create_dir_all(&dir).expect("create app dir");
    if let Some(manifest) = manifest {
        std::fs::write(dir.join("App.toml"), manifest).expect("write App.toml");
    }
    dir
}

/// Create `root/dir_name` with a `package.json` manifest.
///
/// # Panics
///
/// Panics if the directory or file cannot be written.
#[must_use]
pub fn write_package_json(root: &Path, dir_name: &str, json: &str) -> PathBuf {
    let dir = root.join(dir_name);
    std::fs::create_dir_all(&dir).expect("create app dir");
    std::fs::write(dir.join("package.json"), json).expect("write package.json");
    dir
}

/// One instance of every mock surface, shared through `Arc`s so the test
/// can inspect them after handing clones to the registry.
pub struct TestSurfaces {
    /// Router reporting [`TEST_PORT`].
    pub router: Arc<MockRouter>,
    /// Socket engine.
    pub sockets: Arc<MockSocketEngine>,
    /// Window manager.
    pub windows: Arc<MockWindowManager>,
    /// In-memory document store.
    pub storage: Arc<MemoryDocumentStore>,
}

impl TestSurfaces {
    /// Surfaces with an immediately-resolving window manager.
    #[must_use]
    pub fn new() -> Self {
        Self::with_windows(MockWindowManager::new())
    }

    /// Surfaces whose window manager resolves only on release.
    #[must_use]
    pub fn gated() -> Self {
        Self::with_windows(MockWindowManager::gated())
    }

    fn with_windows(windows: MockWindowManager) -> Self {
        Self {
            router: Arc::new(MockRouter::new(TEST_PORT)),
            sockets: Arc::new(MockSocketEngine::new()),
            windows: Arc::new(windows),
            storage: Arc::new(MemoryDocumentStore::new()),
        }
    }
}

impl Default for TestSurfaces {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_manifest_when_given() {
        let root = tempfile::tempdir().unwrap();
        let with = write_app_dir(root.path(), "a", Some("name = \"a\"\n"));
        let without = write_app_dir(root.path(), "b", None);

        assert!(with.join("App.toml").is_file());
        assert!(without.is_dir());
        assert!(!without.join("App.toml").exists());
    }
}
