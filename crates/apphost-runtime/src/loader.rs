//! App module loading.
//!
//! The registry never loads code itself. A [`ModuleLoader`] supplied by the
//! host turns an entry path into an [`AppModule`]. Tests use
//! [`StaticModuleLoader`] with in-memory modules.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use apphost_core::AppFault;

use crate::error::{RuntimeError, RuntimeResult};
use crate::facade::Facade;

/// A loaded app.
///
/// `launch` is optional; an app with nothing to do on launch can rely on
/// the default.
pub trait AppModule: Send + Sync {
    /// Called once per launch with the app's capability facade.
    ///
    /// The facade stays valid after this returns, for as long as the launch
    /// it belongs to is running.
    ///
    /// # Errors
    ///
    /// An [`AppFault`] is logged by the runtime; the app stays running with
    /// whatever it registered before failing.
    fn launch(&self, facade: &Facade) -> Result<(), AppFault> {
        let _ = facade;
        Ok(())
    }
}

impl<F> AppModule for F
where
    F: Fn(&Facade) -> Result<(), AppFault> + Send + Sync,
{
    fn launch(&self, facade: &Facade) -> Result<(), AppFault> {
        self(facade)
    }
}

/// Turns an entry path into a module.
pub trait ModuleLoader: Send + Sync {
    /// Load the module at `entry` (the app location joined with the
    /// manifest's entry).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ModuleLoad`] if no module can be produced.
    fn load(&self, entry: &Path) -> RuntimeResult<Arc<dyn AppModule>>;
}

/// Produces a fresh module instance.
pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn AppModule> + Send + Sync>;

/// Loader backed by an in-memory table of entry paths.
///
/// Every `load` calls the factory again, so each launch gets a fresh
/// instance.
#[derive(Default)]
pub struct StaticModuleLoader {
    factories: Mutex<HashMap<PathBuf, ModuleFactory>>,
}

impl StaticModuleLoader {
    /// Create an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `entry`, replacing any previous one.
    pub fn register<F, M>(&self, entry: impl Into<PathBuf>, factory: F)
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: AppModule + 'static,
    {
        let factory: ModuleFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn AppModule>);
        self.factories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.into(), factory);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_module<F, M>(self, entry: impl Into<PathBuf>, factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: AppModule + 'static,
    {
        self.register(entry, factory);
        self
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, entry: &Path) -> RuntimeResult<Arc<dyn AppModule>> {
        let factory = self
            .factories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entry)
            .cloned()
            .ok_or_else(|| RuntimeError::ModuleLoad {
                path: entry.to_path_buf(),
                message: "no module registered for this entry".into(),
            })?;
        Ok(factory())
    }
}

/// Wraps a loader and reuses the first instance loaded per entry path.
///
/// Module-level state then survives close and relaunch. Use only for apps
/// that expect that.
pub struct CachingModuleLoader<L> {
    inner: L,
    cache: Mutex<HashMap<PathBuf, Arc<dyn AppModule>>>,
}

impl<L: ModuleLoader> CachingModuleLoader<L> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the cached instance for `entry`. Returns whether one was cached.
    pub fn evict(&self, entry: &Path) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entry)
            .is_some()
    }
}

impl<L: ModuleLoader> ModuleLoader for CachingModuleLoader<L> {
    fn load(&self, entry: &Path) -> RuntimeResult<Arc<dyn AppModule>> {
        if let Some(module) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entry)
        {
            return Ok(Arc::clone(module));
        }

        let module = self.inner.load(entry)?;
        Ok(Arc::clone(
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(entry.to_path_buf())
                .or_insert(module),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;
    impl AppModule for Inert {}

    #[test]
    fn static_loader_builds_fresh_instances() {
        let loader = StaticModuleLoader::new().with_module("/apps/a/app", || Inert);

        let first = loader.load(Path::new("/apps/a/app")).unwrap();
        let second = loader.load(Path::new("/apps/a/app")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn static_loader_unknown_entry() {
        let loader = StaticModuleLoader::new();
        assert!(matches!(
            loader.load(Path::new("/nope/app")),
            Err(RuntimeError::ModuleLoad { .. })
        ));
    }

    #[test]
    fn caching_loader_reuses_until_evicted() {
        let loader =
            CachingModuleLoader::new(StaticModuleLoader::new().with_module("/apps/a/app", || Inert));
        let entry = Path::new("/apps/a/app");

        let first = loader.load(entry).unwrap();
        let second = loader.load(entry).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(loader.evict(entry));
        let third = loader.load(entry).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
