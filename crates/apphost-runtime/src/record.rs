//! Per-app lifecycle records.
//!
//! An [`AppRecord`] is created by [`Registry::attach`](crate::Registry::attach)
//! and tracks one attached app: its state, its launch generation, and every
//! resource the current launch has placed on a shared surface. Closing the
//! record releases exactly those resources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, info, warn};

use apphost_core::{AppId, AppName, Verb, WindowId};

use crate::error::{RuntimeError, RuntimeResult};
use crate::facade::Facade;
use crate::isolation::contain;
use crate::loader::AppModule;
use crate::manifest::AppManifest;
use crate::registry::{Registry, RegistryInner, RouteHandle, lock};

/// Lifecycle state of an app record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Attached and never launched.
    Attached,
    /// Launched and not yet closed.
    Running,
    /// Closed after at least one launch. May be launched again.
    Closed,
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Attached => "attached",
            Self::Running => "running",
            Self::Closed => "closed",
        })
    }
}

/// Resources held by the current launch.
#[derive(Debug, Default)]
struct Resources {
    routes: BTreeMap<Verb, Vec<RouteHandle>>,
    socket: bool,
    windows: Vec<WindowId>,
    listeners: Vec<String>,
}

impl Resources {
    fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            routes: self
                .routes
                .iter()
                .flat_map(|(verb, handles)| handles.iter().map(move |h| (*verb, h.path().to_string())))
                .collect(),
            socket_namespace: self.socket,
            windows: self.windows.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

/// Snapshot of what a running app currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSummary {
    /// Routes as `(verb, app-relative path)`, grouped by verb.
    pub routes: Vec<(Verb, String)>,
    /// Whether the socket namespace is open.
    pub socket_namespace: bool,
    /// Open windows.
    pub windows: Vec<WindowId>,
    /// Listener names, without the app prefix.
    pub listeners: Vec<String>,
}

impl ResourceSummary {
    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
            && !self.socket_namespace
            && self.windows.is_empty()
            && self.listeners.is_empty()
    }
}

struct RecordState {
    state: AppState,
    generation: u64,
    detached: bool,
    module: Option<Arc<dyn AppModule>>,
    resources: Resources,
}

/// One attached app.
pub struct AppRecord {
    id: AppId,
    name: AppName,
    location: PathBuf,
    manifest: Arc<AppManifest>,
    registry: Weak<RegistryInner>,
    state: Mutex<RecordState>,
    /// Held across launch transitions, teardown and each facade
    /// register-and-track pair. Released before the module's `launch` runs.
    ops: Mutex<()>,
}

impl AppRecord {
    pub(crate) fn new(
        name: AppName,
        location: PathBuf,
        manifest: AppManifest,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            id: AppId::generate(),
            name,
            location,
            manifest: Arc::new(manifest),
            registry,
            state: Mutex::new(RecordState {
                state: AppState::Attached,
                generation: 0,
                detached: false,
                module: None,
                resources: Resources::default(),
            }),
            ops: Mutex::new(()),
        }
    }

    /// Random per-attach id.
    #[must_use]
    pub fn id(&self) -> &AppId {
        &self.id
    }

    /// Namespace name.
    #[must_use]
    pub fn name(&self) -> &AppName {
        &self.name
    }

    /// Absolute app location.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Parsed manifest (defaults if the app has none).
    #[must_use]
    pub fn manifest(&self) -> &AppManifest {
        &self.manifest
    }

    pub(crate) fn manifest_arc(&self) -> Arc<AppManifest> {
        Arc::clone(&self.manifest)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AppState {
        lock(&self.state).state
    }

    /// Whether the app is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == AppState::Running
    }

    /// Number of launches so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    /// Whether the record has been detached from its registry.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        lock(&self.state).detached
    }

    /// Resources the current launch holds.
    #[must_use]
    pub fn resources(&self) -> ResourceSummary {
        lock(&self.state).resources.summary()
    }

    pub(crate) fn registry(&self) -> Option<Registry> {
        self.registry.upgrade().map(Registry::from_inner)
    }

    pub(crate) fn running_generation(&self) -> Option<u64> {
        let state = lock(&self.state);
        (state.state == AppState::Running).then_some(state.generation)
    }

    /// Returns `false` if the record was already detached.
    pub(crate) fn mark_detached(&self) -> bool {
        !std::mem::replace(&mut lock(&self.state).detached, true)
    }

    /// Serialize a surface change against launch and close of this record.
    pub(crate) fn hold(&self, generation: u64) -> RuntimeResult<MutexGuard<'_, ()>> {
        let held = lock(&self.ops);
        self.ensure_running(generation)?;
        Ok(held)
    }

    /// Load the entry module and run its `launch` with a fresh facade.
    ///
    /// A fault raised by the module's `launch` is logged and the app stays
    /// running with whatever it registered before failing.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::NotFound`] if the record was detached
    /// - [`RuntimeError::AlreadyRunning`] if it is running
    /// - [`RuntimeError::ModuleLoad`] if the module cannot be loaded; the
    ///   record returns to its previous state
    pub fn launch(self: &Arc<Self>) -> RuntimeResult<Facade> {
        let Some(registry) = self.registry() else {
            return Err(RuntimeError::NotFound(self.name.to_string()));
        };

        let held = lock(&self.ops);
        let (previous, generation) = {
            let mut state = lock(&self.state);
            if state.detached {
                return Err(RuntimeError::NotFound(self.name.to_string()));
            }
            if state.state == AppState::Running {
                return Err(RuntimeError::AlreadyRunning(self.name.clone()));
            }
            let previous = (state.state, state.generation);
            state.generation = state.generation.wrapping_add(1);
            state.state = AppState::Running;
            (previous, state.generation)
        };

        let span = apphost_telemetry::app_span(self.name.as_str(), self.id.as_str());
        let _entered = span.enter();

        let entry = self.manifest.entry_path(&self.location);
        let module = match registry.loader().load(&entry) {
            Ok(module) => module,
            Err(e) => {
                let mut state = lock(&self.state);
                state.state = previous.0;
                state.generation = previous.1;
                warn!(app = %self.name, entry = %entry.display(), error = %e, "Launch failed");
                return Err(e);
            },
        };

        lock(&self.state).module = Some(Arc::clone(&module));
        drop(held);
        let facade = Facade::new(self, generation);

        if let Err(fault) = contain(|| module.launch(&facade)) {
            warn!(app = %self.name, error = %fault, "App launch faulted");
        }

        info!(app = %self.name, app_id = %self.id, generation, "Launched app");
        Ok(facade)
    }

    /// Release every resource the current launch holds and mark the record
    /// closed. Returns `false`, changing nothing, if it was not running.
    ///
    /// A concurrent relaunch waits until every resource is released.
    pub fn close(&self) -> bool {
        let _held = lock(&self.ops);
        let (resources, module) = {
            let mut state = lock(&self.state);
            if state.state != AppState::Running {
                return false;
            }
            state.state = AppState::Closed;
            (std::mem::take(&mut state.resources), state.module.take())
        };

        let Some(registry) = self.registry() else {
            debug!(app = %self.name, "Registry dropped before close; nothing to release");
            return true;
        };

        let mut routes = resources.routes;
        for verb in Verb::ALL {
            for handle in routes.remove(&verb).unwrap_or_default() {
                registry.remove_route(&handle);
            }
        }
        if resources.socket {
            registry.close_socket_namespace(&self.name);
        }
        for id in resources.windows {
            registry.destroy_window(id);
        }
        for name in resources.listeners {
            registry.remove_listener(&self.name, &name);
        }
        drop(module);

        info!(app = %self.name, app_id = %self.id, "Closed app");
        true
    }

    // -----------------------------------------------------------------
    // Tracking, checked against the launch generation
    // -----------------------------------------------------------------

    fn with_running<T>(&self, generation: u64, f: impl FnOnce(&mut Resources) -> T) -> Option<T> {
        let mut state = lock(&self.state);
        (state.state == AppState::Running && state.generation == generation)
            .then(|| f(&mut state.resources))
    }

    pub(crate) fn ensure_running(&self, generation: u64) -> RuntimeResult<()> {
        self.with_running(generation, |_| ())
            .ok_or_else(|| RuntimeError::NotRunning(self.name.clone()))
    }

    /// Track a route, replacing any earlier handle for the same verb and path.
    pub(crate) fn add_route(&self, generation: u64, handle: RouteHandle) -> bool {
        self.with_running(generation, |resources| {
            let handles = resources.routes.entry(handle.verb()).or_default();
            handles.retain(|h| h.path() != handle.path());
            handles.push(handle);
        })
        .is_some()
    }

    pub(crate) fn take_route(&self, generation: u64, verb: Verb, path: &str) -> Option<RouteHandle> {
        self.with_running(generation, |resources| {
            let handles = resources.routes.get_mut(&verb)?;
            let i = handles.iter().position(|h| h.path() == path)?;
            Some(handles.remove(i))
        })
        .flatten()
    }

    pub(crate) fn open_socket(&self, generation: u64) -> bool {
        self.with_running(generation, |resources| resources.socket = true)
            .is_some()
    }

    /// Returns whether the current launch had the namespace open.
    pub(crate) fn close_socket(&self, generation: u64) -> bool {
        self.with_running(generation, |resources| std::mem::take(&mut resources.socket))
            .unwrap_or(false)
    }

    pub(crate) fn adopt_window(&self, generation: u64, id: WindowId) -> bool {
        self.with_running(generation, |resources| resources.windows.push(id))
            .is_some()
    }

    pub(crate) fn forget_window(&self, id: WindowId) -> bool {
        let mut state = lock(&self.state);
        let windows = &mut state.resources.windows;
        let before = windows.len();
        windows.retain(|w| *w != id);
        windows.len() != before
    }

    pub(crate) fn owns_window(&self, generation: u64, id: WindowId) -> bool {
        self.with_running(generation, |resources| resources.windows.contains(&id))
            .unwrap_or(false)
    }

    pub(crate) fn add_listener(&self, generation: u64, name: &str) -> bool {
        self.with_running(generation, |resources| {
            resources.listeners.push(name.to_string());
        })
        .is_some()
    }

    pub(crate) fn remove_listener(&self, generation: u64, name: &str) -> bool {
        self.with_running(generation, |resources| {
            let before = resources.listeners.len();
            resources.listeners.retain(|l| l != name);
            resources.listeners.len() != before
        })
        .unwrap_or(false)
    }
}

impl std::fmt::Debug for AppRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("location", &self.location)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
