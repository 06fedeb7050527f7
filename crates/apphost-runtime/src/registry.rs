//! App registry.
//!
//! The registry owns every attached [`AppRecord`] and is the only component
//! that talks to the shared dispatch surfaces. Every primitive takes the
//! owning app's name and applies the namespacing rules from
//! [`apphost_core::names`] before forwarding.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use apphost_core::names::{
    app_url, listener_key, route_label, route_path, socket_namespace, storage_path,
};
use apphost_core::{
    AppId, AppName, ConnectHandler, NativeWindow, RouteHandler, Router, SocketEngine,
    SurfaceError, Verb, WindowId, WindowManager, WindowOptions,
};
use apphost_storage::{DocumentStore, StorageSpace};

use crate::error::{RuntimeError, RuntimeResult};
use crate::facade::Facade;
use crate::isolation::{guard_connect, guard_route};
use crate::listener::{Listener, ListenerCall, ListenerTable};
use crate::loader::ModuleLoader;
use crate::manifest::load_manifest;
use crate::record::AppRecord;
use crate::static_files::file_handler;

/// Router prefix of host-wide client modules.
pub const CLIENT_MODULE_PREFIX: &str = "/modules/";

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The shared dispatch surfaces a registry multiplexes.
pub struct Surfaces {
    /// HTTP router.
    pub router: Arc<dyn Router>,
    /// Websocket engine.
    pub sockets: Arc<dyn SocketEngine>,
    /// Native window manager. `None` in headless hosts.
    pub windows: Option<Arc<dyn WindowManager>>,
    /// Document and app-data store.
    pub storage: Arc<dyn DocumentStore>,
}

impl Surfaces {
    /// Surfaces for a headless host.
    #[must_use]
    pub fn new(
        router: Arc<dyn Router>,
        sockets: Arc<dyn SocketEngine>,
        storage: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            router,
            sockets,
            windows: None,
            storage,
        }
    }

    /// Add a window manager.
    #[must_use]
    pub fn with_windows(mut self, windows: Arc<dyn WindowManager>) -> Self {
        self.windows = Some(windows);
        self
    }
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Relative attach locations resolve against this directory.
    pub working_dir: PathBuf,
    /// Host part of app URLs.
    pub host: String,
}

impl RegistryOptions {
    /// Options with the given working directory and the loopback host.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            host: "127.0.0.1".to_string(),
        }
    }

    /// Set the host used in app URLs.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// A route as placed on the shared router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHandle {
    verb: Verb,
    path: String,
    route: String,
}

impl RouteHandle {
    pub(crate) fn new(app: &AppName, verb: Verb, path: &str) -> Self {
        Self {
            verb,
            path: path.to_string(),
            route: route_path(app, path),
        }
    }

    /// HTTP verb.
    #[must_use]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Path as the app registered it.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Namespaced path on the shared router.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }
}

/// The app launch a window belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOwner {
    /// Owning app.
    pub app: AppName,
    /// Owning record's id.
    pub app_id: AppId,
    /// Launch generation the window was created in.
    pub generation: u64,
}

/// A window created for an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHandle {
    /// Native window id.
    pub id: WindowId,
    /// Owning launch.
    pub owner: WindowOwner,
}

/// What [`Registry::destroy_window`] should destroy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowTarget {
    /// One window.
    Window(WindowId),
    /// Every window owned by the app record with this id.
    App(AppId),
}

impl From<WindowId> for WindowTarget {
    fn from(id: WindowId) -> Self {
        Self::Window(id)
    }
}

impl From<&WindowHandle> for WindowTarget {
    fn from(handle: &WindowHandle) -> Self {
        Self::Window(handle.id)
    }
}

impl From<AppId> for WindowTarget {
    fn from(id: AppId) -> Self {
        Self::App(id)
    }
}

/// Identifies an attached app for [`Registry::detach`].
#[derive(Clone)]
pub enum AppRef {
    /// By name.
    Name(String),
    /// By record identity. A record with the same name that is not this
    /// exact record does not match.
    Record(Arc<AppRecord>),
}

impl From<&str> for AppRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for AppRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&AppName> for AppRef {
    fn from(name: &AppName) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<Arc<AppRecord>> for AppRef {
    fn from(record: Arc<AppRecord>) -> Self {
        Self::Record(record)
    }
}

impl From<&Arc<AppRecord>> for AppRef {
    fn from(record: &Arc<AppRecord>) -> Self {
        Self::Record(Arc::clone(record))
    }
}

pub(crate) struct RegistryInner {
    options: RegistryOptions,
    surfaces: Surfaces,
    loader: Arc<dyn ModuleLoader>,
    apps: Mutex<BTreeMap<AppName, Arc<AppRecord>>>,
    listeners: ListenerTable,
    namespaces: Mutex<HashSet<String>>,
    windows: Mutex<HashMap<WindowId, WindowOwner>>,
    client_modules: Mutex<BTreeMap<String, PathBuf>>,
}

/// Registry of attached apps.
///
/// Cheap to clone; clones share the same apps and surfaces.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Create a registry using the process working directory.
    #[must_use]
    pub fn new(surfaces: Surfaces, loader: Arc<dyn ModuleLoader>) -> Self {
        Self::with_options(surfaces, loader, RegistryOptions::default())
    }

    /// Create a registry with explicit options.
    #[must_use]
    pub fn with_options(
        surfaces: Surfaces,
        loader: Arc<dyn ModuleLoader>,
        options: RegistryOptions,
    ) -> Self {
        debug!(
            working_dir = %options.working_dir.display(),
            host = %options.host,
            port = surfaces.router.port(),
            headless = surfaces.windows.is_none(),
            "Created app registry"
        );
        Self {
            inner: Arc::new(RegistryInner {
                options,
                surfaces,
                loader,
                apps: Mutex::new(BTreeMap::new()),
                listeners: ListenerTable::default(),
                namespaces: Mutex::new(HashSet::new()),
                windows: Mutex::new(HashMap::new()),
                client_modules: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    // -----------------------------------------------------------------
    // Attach / detach
    // -----------------------------------------------------------------

    /// Attach the app at `location` without launching it.
    ///
    /// Relative locations resolve against the working directory. The name
    /// comes from the manifest, or the location's final segment.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Manifest`] if a manifest exists but is malformed
    /// - [`RuntimeError::InvalidName`] if the derived name is unusable
    /// - [`RuntimeError::NameCollision`] if the name is taken; nothing is
    ///   changed in that case
    pub fn attach(&self, location: impl AsRef<Path>) -> RuntimeResult<Arc<AppRecord>> {
        let location = self.resolve(location.as_ref());
        let manifest = load_manifest(&location)?;
        let name = match &manifest.name {
            Some(name) => AppName::new(name.clone())?,
            None => AppName::from_location(&location)?,
        };

        let mut apps = lock(&self.inner.apps);
        if apps.contains_key(&name) {
            warn!(app = %name, location = %location.display(), "Attach refused: name in use");
            return Err(RuntimeError::NameCollision(name));
        }

        let record = Arc::new(AppRecord::new(
            name.clone(),
            location,
            manifest,
            Arc::downgrade(&self.inner),
        ));
        apps.insert(name, Arc::clone(&record));
        drop(apps);

        info!(
            app = %record.name(),
            app_id = %record.id(),
            location = %record.location().display(),
            "Attached app"
        );
        Ok(record)
    }

    /// Close and remove an app. Returns whether it was running.
    ///
    /// The name stays taken until every resource of the app is released, so
    /// an attach with the same name during teardown is a collision.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] if no attached app matches, or if
    /// it is already being detached.
    pub fn detach(&self, app: impl Into<AppRef>) -> RuntimeResult<bool> {
        let record = {
            let apps = lock(&self.inner.apps);
            let record = match app.into() {
                AppRef::Name(name) => apps
                    .get(name.as_str())
                    .cloned()
                    .ok_or(RuntimeError::NotFound(name))?,
                AppRef::Record(record) => {
                    let attached = apps
                        .get(record.name())
                        .is_some_and(|current| Arc::ptr_eq(current, &record));
                    if !attached {
                        return Err(RuntimeError::NotFound(record.name().to_string()));
                    }
                    record
                },
            };
            if !record.mark_detached() {
                return Err(RuntimeError::NotFound(record.name().to_string()));
            }
            record
        };

        let was_running = record.close();
        self.forget(&record);
        info!(app = %record.name(), app_id = %record.id(), was_running, "Detached app");
        Ok(was_running)
    }

    /// Detach every app. Returns how many were detached.
    pub fn detach_all(&self) -> usize {
        let records: Vec<Arc<AppRecord>> = lock(&self.inner.apps)
            .values()
            .filter(|record| record.mark_detached())
            .cloned()
            .collect();
        for record in &records {
            record.close();
            self.forget(record);
        }
        info!(count = records.len(), "Detached all apps");
        records.len()
    }

    /// Launch an attached app by name.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotFound`] for an unknown name, otherwise see
    /// [`AppRecord::launch`].
    pub fn launch_app(&self, name: &str) -> RuntimeResult<Facade> {
        self.require(name)?.launch()
    }

    /// Close an attached app by name. Returns whether it was running.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] for an unknown name.
    pub fn close_app(&self, name: &str) -> RuntimeResult<bool> {
        Ok(self.require(name)?.close())
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Look up an attached app.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<AppRecord>> {
        lock(&self.inner.apps).get(name).cloned()
    }

    /// Location of an attached app.
    #[must_use]
    pub fn app_path(&self, name: &str) -> Option<PathBuf> {
        self.get(name).map(|record| record.location().to_path_buf())
    }

    /// Names of every attached app, sorted.
    #[must_use]
    pub fn app_names(&self) -> Vec<AppName> {
        lock(&self.inner.apps).keys().cloned().collect()
    }

    /// Number of attached apps.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner.apps).len()
    }

    /// Whether no app is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.inner.apps).is_empty()
    }

    /// Directory relative locations resolve against.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.inner.options.working_dir
    }

    /// Port of the shared router.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.surfaces.router.port()
    }

    /// URL of an app, without scheme.
    #[must_use]
    pub fn url(&self, app: &AppName) -> String {
        app_url(&self.inner.options.host, self.port(), app)
    }

    /// Whether this host has a window manager.
    #[must_use]
    pub fn has_windows(&self) -> bool {
        self.inner.surfaces.windows.is_some()
    }

    // -----------------------------------------------------------------
    // Routes
    // -----------------------------------------------------------------

    /// Register `verb path` for `app` as `verb /<app><path>`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Route`] if `path` does not start with `/` or
    /// the router refuses it.
    pub fn register_route(
        &self,
        app: &AppName,
        verb: Verb,
        path: &str,
        handler: RouteHandler,
    ) -> RuntimeResult<RouteHandle> {
        if !path.starts_with('/') {
            return Err(RuntimeError::Route(SurfaceError::InvalidRoute {
                verb: verb.to_string(),
                path: path.to_string(),
                reason: "path must start with '/'".into(),
            }));
        }

        let handle = RouteHandle::new(app, verb, path);
        let label = route_label(verb, app, path);
        self.inner
            .surfaces
            .router
            .register_route(verb, handle.route(), guard_route(app.clone(), label.clone(), handler))
            .map_err(RuntimeError::Route)?;

        debug!(app = %app, route = %label, "Registered route");
        Ok(handle)
    }

    /// Remove a route. Returns `false` if the router no longer had it.
    pub fn remove_route(&self, handle: &RouteHandle) -> bool {
        let removed = self
            .inner
            .surfaces
            .router
            .remove_route(handle.verb(), handle.route());
        if removed {
            debug!(route = %handle.route(), verb = %handle.verb(), "Removed route");
        } else {
            debug!(route = %handle.route(), verb = %handle.verb(), "Route already removed");
        }
        removed
    }

    // -----------------------------------------------------------------
    // Sockets
    // -----------------------------------------------------------------

    /// Open the app's socket namespace `/<app>/`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::SocketNamespaceOpen`] if the app already has it open
    /// - [`RuntimeError::Socket`] if the engine refuses it
    pub fn open_socket_namespace(
        &self,
        app: &AppName,
        on_connect: ConnectHandler,
    ) -> RuntimeResult<()> {
        let namespace = socket_namespace(app);
        if !lock(&self.inner.namespaces).insert(namespace.clone()) {
            return Err(RuntimeError::SocketNamespaceOpen(namespace));
        }

        if let Err(e) = self
            .inner
            .surfaces
            .sockets
            .open_namespace(&namespace, guard_connect(app.clone(), on_connect))
        {
            lock(&self.inner.namespaces).remove(&namespace);
            return Err(RuntimeError::Socket(e));
        }

        debug!(app = %app, namespace = %namespace, "Opened socket namespace");
        Ok(())
    }

    /// Disconnect every client of the app's namespace and delete it.
    ///
    /// Returns the number of clients disconnected; a no-op when nothing is
    /// open.
    pub fn close_socket_namespace(&self, app: &AppName) -> usize {
        let namespace = socket_namespace(app);
        let was_open = lock(&self.inner.namespaces).remove(&namespace);
        let disconnected = self.inner.surfaces.sockets.close_namespace(&namespace);
        if was_open {
            debug!(app = %app, namespace = %namespace, disconnected, "Closed socket namespace");
        }
        disconnected
    }

    /// Whether the app's namespace is open.
    #[must_use]
    pub fn has_socket_namespace(&self, app: &AppName) -> bool {
        lock(&self.inner.namespaces).contains(&socket_namespace(app))
    }

    // -----------------------------------------------------------------
    // Windows
    // -----------------------------------------------------------------

    /// Create a window for the running app `app`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::CollaboratorUnavailable`] in a headless host
    /// - [`RuntimeError::NotFound`] / [`RuntimeError::NotRunning`] if the app
    ///   is not attached or not running, including when it closes before the
    ///   window resolves (the window is then destroyed)
    /// - [`RuntimeError::Window`] if the window manager fails
    pub async fn create_window(
        &self,
        app: &AppName,
        options: WindowOptions,
    ) -> RuntimeResult<WindowHandle> {
        let record = self.require(app.as_str())?;
        let generation = record
            .running_generation()
            .ok_or_else(|| RuntimeError::NotRunning(app.clone()))?;
        self.create_window_for(&record, generation, options).await
    }

    pub(crate) async fn create_window_for(
        &self,
        record: &Arc<AppRecord>,
        generation: u64,
        options: WindowOptions,
    ) -> RuntimeResult<WindowHandle> {
        let windows = self
            .inner
            .surfaces
            .windows
            .clone()
            .ok_or(RuntimeError::CollaboratorUnavailable("window manager"))?;

        let native = windows
            .create_window(options)
            .await
            .map_err(RuntimeError::Window)?;

        let handle = WindowHandle {
            id: native.id,
            owner: WindowOwner {
                app: record.name().clone(),
                app_id: record.id().clone(),
                generation,
            },
        };

        lock(&self.inner.windows).insert(handle.id, handle.owner.clone());
        if !record.adopt_window(generation, handle.id) {
            lock(&self.inner.windows).remove(&handle.id);
            windows.destroy_window(handle.id);
            warn!(
                app = %record.name(),
                window = %handle.id,
                "Window resolved after its app closed; destroyed"
            );
            return Err(RuntimeError::NotRunning(record.name().clone()));
        }

        self.watch_window(record, native);
        debug!(app = %record.name(), window = %handle.id, generation, "Created window");
        Ok(handle)
    }

    /// Untrack the window once it closes natively.
    fn watch_window(&self, record: &Arc<AppRecord>, native: NativeWindow) {
        let registry = Arc::downgrade(&self.inner);
        let record = Arc::downgrade(record);
        let id = native.id;
        tokio::spawn(async move {
            let _ = native.closed.await;
            if let Some(inner) = registry.upgrade() {
                lock(&inner.windows).remove(&id);
            }
            if let Some(record) = record.upgrade() {
                record.forget_window(id);
            }
            debug!(window = %id, "Window closed");
        });
    }

    /// Destroy one window, or every window of an app record. Returns how many
    /// windows the window manager actually destroyed.
    pub fn destroy_window(&self, target: impl Into<WindowTarget>) -> usize {
        let Some(windows) = self.inner.surfaces.windows.as_ref() else {
            return 0;
        };

        let ids: Vec<WindowId> = {
            let mut tracked = lock(&self.inner.windows);
            match target.into() {
                WindowTarget::Window(id) => {
                    tracked.remove(&id);
                    vec![id]
                },
                WindowTarget::App(app_id) => {
                    let ids: Vec<WindowId> = tracked
                        .iter()
                        .filter(|(_, owner)| owner.app_id == app_id)
                        .map(|(id, _)| *id)
                        .collect();
                    for id in &ids {
                        tracked.remove(id);
                    }
                    ids
                },
            }
        };

        ids.into_iter()
            .filter(|id| {
                let destroyed = windows.destroy_window(*id);
                debug!(window = %id, destroyed, "Destroy window");
                destroyed
            })
            .count()
    }

    /// Owner of a tracked window.
    #[must_use]
    pub fn window_owner(&self, id: WindowId) -> Option<WindowOwner> {
        lock(&self.inner.windows).get(&id).cloned()
    }

    // -----------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------

    /// Store `listener` under `<app>/<name>`. Returns `false` if taken.
    pub fn register_listener(&self, app: &AppName, name: &str, listener: Listener) -> bool {
        let key = listener_key(app, name);
        let added = self.inner.listeners.insert(key.clone(), listener);
        if added {
            debug!(app = %app, listener = %key, "Added listener");
        } else {
            debug!(app = %app, listener = %key, "Listener key already taken");
        }
        added
    }

    /// Invoke the listener stored under the full key `<app>/<name>`.
    pub fn call_listener(&self, key: &str, args: &Value) -> ListenerCall {
        self.inner.listeners.call(key, args)
    }

    /// Remove `<app>/<name>`. Returns `false` if it was not present.
    pub fn remove_listener(&self, app: &AppName, name: &str) -> bool {
        let key = listener_key(app, name);
        let removed = self.inner.listeners.remove(&key);
        if removed {
            debug!(app = %app, listener = %key, "Removed listener");
        }
        removed
    }

    /// Whether a listener is stored under the full key.
    #[must_use]
    pub fn has_listener(&self, key: &str) -> bool {
        self.inner.listeners.contains(key)
    }

    // -----------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------

    /// Save a document at `<app>/<path>`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the store fails or rejects the
    /// path.
    pub async fn save_document(
        &self,
        app: &AppName,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> RuntimeResult<()> {
        self.save(StorageSpace::Documents, app, path, content.into())
            .await
    }

    /// Load the document at `<app>/<path>`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the store fails.
    pub async fn load_document(&self, app: &AppName, path: &str) -> RuntimeResult<Option<Vec<u8>>> {
        self.load(StorageSpace::Documents, app, path).await
    }

    /// Save app data at `<app>/<path>`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the store fails or rejects the
    /// path.
    pub async fn save_app_data(
        &self,
        app: &AppName,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> RuntimeResult<()> {
        self.save(StorageSpace::AppData, app, path, content.into())
            .await
    }

    /// Load the app data at `<app>/<path>`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the store fails.
    pub async fn load_app_data(&self, app: &AppName, path: &str) -> RuntimeResult<Option<Vec<u8>>> {
        self.load(StorageSpace::AppData, app, path).await
    }

    async fn save(
        &self,
        space: StorageSpace,
        app: &AppName,
        path: &str,
        content: Vec<u8>,
    ) -> RuntimeResult<()> {
        let full = storage_path(app, path);
        self.inner.surfaces.storage.save(space, &full, content).await?;
        debug!(app = %app, space = %space, path = %full, "Saved");
        Ok(())
    }

    async fn load(
        &self,
        space: StorageSpace,
        app: &AppName,
        path: &str,
    ) -> RuntimeResult<Option<Vec<u8>>> {
        let full = storage_path(app, path);
        Ok(self.inner.surfaces.storage.load(space, &full).await?)
    }

    // -----------------------------------------------------------------
    // Client modules
    // -----------------------------------------------------------------

    /// Serve the file at `place` as `GET /modules/<name>`, shared by every
    /// app. Relative places resolve against the working directory. Adding a
    /// name again points it at the new file.
    ///
    /// Client modules belong to the host, not to any app, so closing or
    /// detaching apps leaves them in place.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Route`] if `name` is empty, is `.` or `..`, or
    /// contains a path or query separator, or if the router refuses the
    /// route.
    pub fn add_client_module(&self, name: &str, place: impl AsRef<Path>) -> RuntimeResult<PathBuf> {
        let route = format!("{CLIENT_MODULE_PREFIX}{name}");
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '?', '#']) {
            return Err(RuntimeError::Route(SurfaceError::InvalidRoute {
                verb: Verb::Get.to_string(),
                path: route,
                reason: "client module names are single path segments".into(),
            }));
        }

        let file = self.resolve(place.as_ref());
        let mut modules = lock(&self.inner.client_modules);
        if modules.contains_key(name) {
            self.inner.surfaces.router.remove_route(Verb::Get, &route);
        }
        if let Err(e) = self.inner.surfaces.router.register_route(
            Verb::Get,
            &route,
            Arc::new(file_handler(file.clone())),
        ) {
            modules.remove(name);
            return Err(RuntimeError::Route(e));
        }
        modules.insert(name.to_string(), file.clone());
        drop(modules);

        debug!(module = %name, file = %file.display(), "Added client module");
        Ok(file)
    }

    /// Stop serving `/modules/<name>`. Returns `false` if it was not added.
    pub fn remove_client_module(&self, name: &str) -> bool {
        if lock(&self.inner.client_modules).remove(name).is_none() {
            return false;
        }
        self.inner
            .surfaces
            .router
            .remove_route(Verb::Get, &format!("{CLIENT_MODULE_PREFIX}{name}"));
        debug!(module = %name, "Removed client module");
        true
    }

    /// File served for a client module.
    #[must_use]
    pub fn client_module(&self, name: &str) -> Option<PathBuf> {
        lock(&self.inner.client_modules).get(name).cloned()
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    pub(crate) fn loader(&self) -> Arc<dyn ModuleLoader> {
        Arc::clone(&self.inner.loader)
    }

    fn resolve(&self, location: &Path) -> PathBuf {
        if location.is_absolute() {
            location.to_path_buf()
        } else {
            self.inner.options.working_dir.join(location)
        }
    }

    fn forget(&self, record: &Arc<AppRecord>) {
        let mut apps = lock(&self.inner.apps);
        if apps
            .get(record.name())
            .is_some_and(|current| Arc::ptr_eq(current, record))
        {
            apps.remove(record.name());
        }
    }

    fn require(&self, name: &str) -> RuntimeResult<Arc<AppRecord>> {
        self.get(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("working_dir", &self.inner.options.working_dir)
            .field("apps", &self.app_names())
            .finish_non_exhaustive()
    }
}
