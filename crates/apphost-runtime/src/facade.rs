//! Capability facade.
//!
//! A [`Facade`] is what an app's own code receives at launch. Every method
//! forwards to the registry under the app's name, and every registration is
//! tracked on the owning record so closing the app undoes it. A facade is
//! bound to one launch: once that launch is closed, or superseded by a
//! relaunch, every call fails with [`RuntimeError::NotRunning`] (or returns
//! `false` for the boolean operations).
//!
//! # Example
//!
//! ```no_run
//! use apphost_core::{AppFault, Response};
//! use apphost_runtime::Facade;
//!
//! fn launch(app: &Facade) -> Result<(), AppFault> {
//!     app.get("/items", |_req| Ok(Response::text("[]")))?;
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::debug;

use apphost_core::names::route_path;
use apphost_core::{
    AppFault, AppId, AppName, Request, Response, SocketConnection, Verb, WindowId, WindowOptions,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::listener::ListenerCall;
use crate::manifest::AppManifest;
use crate::record::AppRecord;
use crate::registry::{Registry, WindowHandle};
use crate::static_files::static_handler;

/// App-relative path of the static content route.
const STATIC_ROUTE: &str = "/*";

/// Namespace-scoped handle given to an app for one launch.
#[derive(Clone)]
pub struct Facade {
    record: Weak<AppRecord>,
    generation: u64,
    name: AppName,
    id: AppId,
    manifest: Arc<AppManifest>,
    location: PathBuf,
}

impl Facade {
    pub(crate) fn new(record: &Arc<AppRecord>, generation: u64) -> Self {
        Self {
            record: Arc::downgrade(record),
            generation,
            name: record.name().clone(),
            id: record.id().clone(),
            manifest: record.manifest_arc(),
            location: record.location().to_path_buf(),
        }
    }

    /// The app's name.
    #[must_use]
    pub fn name(&self) -> &AppName {
        &self.name
    }

    /// The app record's id.
    #[must_use]
    pub fn id(&self) -> &AppId {
        &self.id
    }

    /// The launch this facade belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The app's location.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// The app's manifest.
    #[must_use]
    pub fn manifest(&self) -> &AppManifest {
        &self.manifest
    }

    /// Whether the launch this facade belongs to is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bind().is_ok()
    }

    /// The app's URL (`<host>:<port>/<app>/`).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotRunning`] if this facade is stale.
    pub fn url(&self) -> RuntimeResult<String> {
        let (_, registry) = self.bind()?;
        Ok(registry.url(&self.name))
    }

    /// Port of the shared router.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotRunning`] if this facade is stale.
    pub fn port(&self) -> RuntimeResult<u16> {
        let (_, registry) = self.bind()?;
        Ok(registry.port())
    }

    // -----------------------------------------------------------------
    // Routes
    // -----------------------------------------------------------------

    /// Serve `verb path` under the app's prefix. Registering the same verb
    /// and path again replaces the handler.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::NotRunning`] if this facade is stale
    /// - [`RuntimeError::Route`] if `path` does not start with `/` or the
    ///   router refuses it
    pub fn route<F>(&self, verb: Verb, path: &str, handler: F) -> RuntimeResult<()>
    where
        F: Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static,
    {
        let (record, registry) = self.bind()?;
        let _held = record.hold(self.generation)?;
        let handle = registry.register_route(&self.name, verb, path, Arc::new(handler))?;
        if !record.add_route(self.generation, handle.clone()) {
            registry.remove_route(&handle);
            return Err(self.not_running());
        }
        Ok(())
    }

    /// Serve `GET path`. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn get<F>(&self, path: &str, handler: F) -> RuntimeResult<()>
    where
        F: Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static,
    {
        self.route(Verb::Get, path, handler)
    }

    /// Serve `POST path`. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn post<F>(&self, path: &str, handler: F) -> RuntimeResult<()>
    where
        F: Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static,
    {
        self.route(Verb::Post, path, handler)
    }

    /// Serve `PUT path`. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn put<F>(&self, path: &str, handler: F) -> RuntimeResult<()>
    where
        F: Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static,
    {
        self.route(Verb::Put, path, handler)
    }

    /// Serve `DELETE path`. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn delete<F>(&self, path: &str, handler: F) -> RuntimeResult<()>
    where
        F: Fn(&Request) -> Result<Response, AppFault> + Send + Sync + 'static,
    {
        self.route(Verb::Delete, path, handler)
    }

    /// Stop serving `verb path`. Returns `false` if this launch never
    /// registered it.
    pub fn remove_route(&self, verb: Verb, path: &str) -> bool {
        let Ok((record, registry)) = self.bind() else {
            return false;
        };
        let Ok(_held) = record.hold(self.generation) else {
            return false;
        };
        record
            .take_route(self.generation, verb, path)
            .is_some_and(|handle| registry.remove_route(&handle))
    }

    /// Stop serving `GET path`.
    pub fn remove_get(&self, path: &str) -> bool {
        self.remove_route(Verb::Get, path)
    }

    /// Stop serving `POST path`.
    pub fn remove_post(&self, path: &str) -> bool {
        self.remove_route(Verb::Post, path)
    }

    /// Stop serving `PUT path`.
    pub fn remove_put(&self, path: &str) -> bool {
        self.remove_route(Verb::Put, path)
    }

    /// Stop serving `DELETE path`.
    pub fn remove_delete(&self, path: &str) -> bool {
        self.remove_route(Verb::Delete, path)
    }

    /// Serve files under `dir` (relative to the app location) at
    /// `GET /<app>/*`. A trailing `/` serves `index.html`.
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn add_static_route(&self, dir: impl AsRef<Path>) -> RuntimeResult<()> {
        let root = self.location.join(dir);
        debug!(app = %self.name, root = %root.display(), "Serving static content");
        self.get(
            STATIC_ROUTE,
            static_handler(root, route_path(&self.name, "/")),
        )
    }

    /// Remove the static content route.
    pub fn remove_static_route(&self) -> bool {
        self.remove_get(STATIC_ROUTE)
    }

    // -----------------------------------------------------------------
    // Sockets
    // -----------------------------------------------------------------

    /// Open the app's socket namespace (`/<app>/`). `on_connect` runs for
    /// every client that connects; event handlers it adds on the connection
    /// are isolated like route handlers.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::NotRunning`] if this facade is stale
    /// - [`RuntimeError::SocketNamespaceOpen`] if it is already open
    /// - [`RuntimeError::Socket`] if the engine refuses it
    pub fn add_socket_namespace<F>(&self, on_connect: F) -> RuntimeResult<()>
    where
        F: Fn(SocketConnection) -> Result<(), AppFault> + Send + Sync + 'static,
    {
        let (record, registry) = self.bind()?;
        let _held = record.hold(self.generation)?;
        registry.open_socket_namespace(&self.name, Arc::new(on_connect))?;
        if !record.open_socket(self.generation) {
            registry.close_socket_namespace(&self.name);
            return Err(self.not_running());
        }
        Ok(())
    }

    /// Disconnect every client and close the namespace. Returns `false` if it
    /// was not open.
    pub fn remove_socket_namespace(&self) -> bool {
        let Ok((record, registry)) = self.bind() else {
            return false;
        };
        let Ok(_held) = record.hold(self.generation) else {
            return false;
        };
        if !record.close_socket(self.generation) {
            return false;
        }
        registry.close_socket_namespace(&self.name);
        true
    }

    // -----------------------------------------------------------------
    // Windows
    // -----------------------------------------------------------------

    /// Open a native window for this app, pointed at the app's URL unless
    /// `options` names one.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::CollaboratorUnavailable`] in a headless host
    /// - [`RuntimeError::NotRunning`] if this facade is stale, including when
    ///   the app closes before the window resolves (the window is then
    ///   destroyed)
    /// - [`RuntimeError::Window`] if the window manager fails
    pub async fn create_window(&self, options: WindowOptions) -> RuntimeResult<WindowHandle> {
        let (record, registry) = self.bind()?;
        let options = if options.url.is_some() {
            options
        } else {
            let url = format!("http://{}", registry.url(&self.name));
            options.with_url(url)
        };
        registry
            .create_window_for(&record, self.generation, options)
            .await
    }

    /// Destroy one of this launch's windows. Returns `false` for windows it
    /// does not own.
    pub fn destroy_window(&self, id: WindowId) -> bool {
        let Ok((record, registry)) = self.bind() else {
            return false;
        };
        let Ok(_held) = record.hold(self.generation) else {
            return false;
        };
        if !record.owns_window(self.generation, id) {
            return false;
        }
        record.forget_window(id);
        registry.destroy_window(id) > 0
    }

    // -----------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------

    /// Expose `listener` to other apps as `<app>/<name>`. Returns `false`
    /// if the name is taken or this facade is stale.
    pub fn add_listener<F>(&self, name: &str, listener: F) -> bool
    where
        F: Fn(&Value) -> Result<Value, AppFault> + Send + Sync + 'static,
    {
        let Ok((record, registry)) = self.bind() else {
            return false;
        };
        let Ok(_held) = record.hold(self.generation) else {
            return false;
        };
        if !registry.register_listener(&self.name, name, Arc::new(listener)) {
            return false;
        }
        if !record.add_listener(self.generation, name) {
            registry.remove_listener(&self.name, name);
            return false;
        }
        true
    }

    /// Call any app's listener by its full key (`<app>/<name>`).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotRunning`] if this facade is stale. A
    /// missing or faulting listener is reported in the [`ListenerCall`].
    pub fn call_listener(&self, key: &str, args: &Value) -> RuntimeResult<ListenerCall> {
        let (_, registry) = self.bind()?;
        Ok(registry.call_listener(key, args))
    }

    /// Remove one of this app's listeners. Returns `false` if it was not
    /// added by this launch.
    pub fn remove_listener(&self, name: &str) -> bool {
        let Ok((record, registry)) = self.bind() else {
            return false;
        };
        let Ok(_held) = record.hold(self.generation) else {
            return false;
        };
        record.remove_listener(self.generation, name) && registry.remove_listener(&self.name, name)
    }

    // -----------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------

    /// Save a document under the app's prefix.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotRunning`] if this facade is stale, or
    /// [`RuntimeError::Storage`].
    pub async fn save_document(&self, path: &str, content: impl Into<Vec<u8>>) -> RuntimeResult<()> {
        let (_, registry) = self.bind()?;
        registry.save_document(&self.name, path, content).await
    }

    /// Load a document saved by this app.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotRunning`] if this facade is stale, or
    /// [`RuntimeError::Storage`].
    pub async fn load_document(&self, path: &str) -> RuntimeResult<Option<Vec<u8>>> {
        let (_, registry) = self.bind()?;
        registry.load_document(&self.name, path).await
    }

    /// Save private app data under the app's prefix.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotRunning`] if this facade is stale, or
    /// [`RuntimeError::Storage`].
    pub async fn save_app_data(&self, path: &str, content: impl Into<Vec<u8>>) -> RuntimeResult<()> {
        let (_, registry) = self.bind()?;
        registry.save_app_data(&self.name, path, content).await
    }

    /// Load private app data saved by this app.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotRunning`] if this facade is stale, or
    /// [`RuntimeError::Storage`].
    pub async fn load_app_data(&self, path: &str) -> RuntimeResult<Option<Vec<u8>>> {
        let (_, registry) = self.bind()?;
        registry.load_app_data(&self.name, path).await
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn bind(&self) -> RuntimeResult<(Arc<AppRecord>, Registry)> {
        let record = self.record.upgrade().ok_or_else(|| self.not_running())?;
        record.ensure_running(self.generation)?;
        let registry = record.registry().ok_or_else(|| self.not_running())?;
        Ok((record, registry))
    }

    fn not_running(&self) -> RuntimeError {
        RuntimeError::NotRunning(self.name.clone())
    }
}

impl std::fmt::Debug for Facade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
