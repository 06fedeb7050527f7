//! Shared setup for the runtime integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apphost_core::AppFault;
use apphost_runtime::{
    AppModule, Facade, Registry, RegistryOptions, StaticModuleLoader, Surfaces,
};
use apphost_test::{TestSurfaces, init_test_logging, write_app_dir};
use tempfile::TempDir;

/// A registry over mock surfaces, rooted in a temporary directory.
pub struct Harness {
    pub surfaces: TestSurfaces,
    pub loader: Arc<StaticModuleLoader>,
    pub registry: Registry,
    root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(TestSurfaces::new(), true)
    }

    /// Window creation waits for `surfaces.windows.release`.
    pub fn gated() -> Self {
        Self::build(TestSurfaces::gated(), true)
    }

    /// No window manager.
    pub fn headless() -> Self {
        Self::build(TestSurfaces::new(), false)
    }

    fn build(surfaces: TestSurfaces, with_windows: bool) -> Self {
        init_test_logging();
        let root = tempfile::tempdir().unwrap();
        let loader = Arc::new(StaticModuleLoader::new());

        let mut shared = Surfaces::new(
            surfaces.router.clone(),
            surfaces.sockets.clone(),
            surfaces.storage.clone(),
        );
        if with_windows {
            shared = shared.with_windows(surfaces.windows.clone());
        }

        let registry = Registry::with_options(
            shared,
            Arc::clone(&loader) as Arc<dyn apphost_runtime::ModuleLoader>,
            RegistryOptions::new(root.path()),
        );

        Self {
            surfaces,
            loader,
            registry,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Create an app directory without a manifest and register `module` as
    /// its `app` entry.
    pub fn app<F, M>(&self, dir: &str, module: F) -> PathBuf
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: AppModule + 'static,
    {
        let location = write_app_dir(self.root(), dir, None);
        self.loader.register(location.join("app"), module);
        location
    }

    /// Attach and launch an app whose module does nothing.
    pub fn launch_idle(&self, dir: &str) -> Facade {
        let location = self.app(dir, || idle);
        self.registry.attach(location).unwrap().launch().unwrap()
    }
}

/// A module with an empty `launch`.
pub fn idle(_: &Facade) -> Result<(), AppFault> {
    Ok(())
}
