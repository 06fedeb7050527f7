//! Host context.
//!
//! A [`Host`] is built once at process start from a resolved
//! [`HostConfig`], the dispatch surfaces and a module loader. It owns the
//! [`Registry`] and gives it a clear boot and shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use apphost_config::{HostConfig, StorageSection};
use apphost_storage::FileDocumentStore;
use apphost_telemetry::{LogConfig, TelemetryResult, setup_logging};

use crate::discovery::discover_app_dirs;
use crate::error::RuntimeError;
use crate::loader::ModuleLoader;
use crate::registry::{Registry, RegistryOptions, Surfaces};

/// Outcome of [`Host::boot`].
#[derive(Debug, Default)]
pub struct BootReport {
    /// Names of the apps attached, in attach order.
    pub attached: Vec<String>,
    /// Names of the apps launched.
    pub launched: Vec<String>,
    /// Client modules served.
    pub client_modules: Vec<String>,
    /// Locations that failed to attach or launch, with the error.
    pub failed: Vec<(PathBuf, RuntimeError)>,
}

/// The process-wide app host.
pub struct Host {
    config: HostConfig,
    registry: Registry,
}

impl Host {
    /// Create a host. Relative `[apps] working_dir` resolves against
    /// `workspace_root`.
    #[must_use]
    pub fn new(
        config: HostConfig,
        workspace_root: &Path,
        surfaces: Surfaces,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let options = RegistryOptions::new(config.apps.working_dir_or(workspace_root))
            .with_host(config.server.host.clone());
        let registry = Registry::with_options(surfaces, loader, options);
        Self { config, registry }
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The configuration the host was built from.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Logging configuration derived from `[logging]`.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from(&self.config.logging)
    }

    /// Install the global subscriber from `[logging]`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or a subscriber is already
    /// installed.
    pub fn init_logging(&self) -> TelemetryResult<()> {
        setup_logging(&self.log_config())
    }

    /// Serve every `[apps.client_modules]` entry, then attach every
    /// `[apps] autoload` location and every app found under
    /// `[apps] discover_dir`, launching each when `launch_on_attach` is set.
    ///
    /// A failing app or module is logged and skipped; boot itself never
    /// fails.
    pub fn boot(&self) -> BootReport {
        let mut report = BootReport::default();
        let apps = &self.config.apps;

        for (name, place) in &apps.client_modules {
            match self.registry.add_client_module(name, place) {
                Ok(_) => report.client_modules.push(name.clone()),
                Err(e) => {
                    warn!(module = %name, error = %e, "Skipping client module at boot");
                    report.failed.push((place.clone(), e));
                },
            }
        }

        let mut locations = apps.autoload.clone();
        if let Some(dir) = &apps.discover_dir {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                self.registry.working_dir().join(dir)
            };
            locations.extend(discover_app_dirs(&dir));
        }

        for location in locations {
            let record = match self.registry.attach(&location) {
                Ok(record) => record,
                Err(e) => {
                    warn!(location = %location.display(), error = %e, "Skipping app at boot");
                    report.failed.push((location, e));
                    continue;
                },
            };
            report.attached.push(record.name().to_string());

            if !apps.launch_on_attach {
                continue;
            }
            match record.launch() {
                Ok(_) => report.launched.push(record.name().to_string()),
                Err(e) => {
                    warn!(app = %record.name(), error = %e, "App failed to launch at boot");
                    report.failed.push((location, e));
                },
            }
        }

        info!(
            attached = report.attached.len(),
            launched = report.launched.len(),
            failed = report.failed.len(),
            "Host booted"
        );
        report
    }

    /// Detach every app. Returns how many were attached.
    pub fn shutdown(&self) -> usize {
        let count = self.registry.detach_all();
        info!(count, "Host shut down");
        count
    }
}

/// A filesystem document store rooted at the `[storage]` directories.
#[must_use]
pub fn file_store(storage: &StorageSection, base: &Path) -> FileDocumentStore {
    FileDocumentStore::new(
        storage.resolve_documents_dir(base),
        storage.resolve_app_data_dir(base),
    )
}
