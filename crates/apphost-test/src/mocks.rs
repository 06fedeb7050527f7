//! Mock dispatch surfaces.
//!
//! All mocks use `std::sync::Mutex` so they can be driven from sync test
//! code and from inside tokio tests alike. Handlers are always cloned out
//! of a lock before they run.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Semaphore, oneshot};

use apphost_core::{
    AppFault, ConnectHandler, EventHandler, NativeWindow, Request, Response, RouteHandler,
    Router, SocketConnection, SocketEngine, SocketPeer, SurfaceError, SurfaceResult, Verb,
    WindowId, WindowManager, WindowOptions,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// In-memory router that can dispatch requests to registered handlers.
///
/// A route path ending in `/*` matches every path under its prefix. Exact
/// routes win over wildcards; among wildcards the longest prefix wins.
pub struct MockRouter {
    port: u16,
    routes: Mutex<BTreeMap<(Verb, String), RouteHandler>>,
}

impl MockRouter {
    /// Create a router reporting `port`.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            routes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Whether `verb path` is registered (exact match).
    #[must_use]
    pub fn has_route(&self, verb: Verb, path: &str) -> bool {
        lock(&self.routes).contains_key(&(verb, path.to_string()))
    }

    /// All registered routes, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<(Verb, String)> {
        lock(&self.routes).keys().cloned().collect()
    }

    /// Dispatch a request. Returns `None` when no route matches.
    ///
    /// A handler error becomes a `500` response, as a real server would do.
    #[must_use]
    pub fn dispatch(&self, request: &Request) -> Option<Response> {
        let handler = self.find(request.verb, &request.path)?;
        Some(handler(request).unwrap_or_else(|fault| Response::internal_error(fault.message())))
    }

    /// Shorthand for dispatching a bodiless request.
    #[must_use]
    pub fn request(&self, verb: Verb, path: &str) -> Option<Response> {
        self.dispatch(&Request::new(verb, path))
    }

    fn find(&self, verb: Verb, path: &str) -> Option<RouteHandler> {
        let routes = lock(&self.routes);
        if let Some(handler) = routes.get(&(verb, path.to_string())) {
            return Some(Arc::clone(handler));
        }
        routes
            .iter()
            .filter(|((v, route), _)| {
                *v == verb
                    && route
                        .strip_suffix('*')
                        .is_some_and(|prefix| prefix.ends_with('/') && path.starts_with(prefix))
            })
            .max_by_key(|((_, route), _)| route.len())
            .map(|(_, handler)| Arc::clone(handler))
    }
}

impl Router for MockRouter {
    fn register_route(&self, verb: Verb, path: &str, handler: RouteHandler) -> SurfaceResult<()> {
        if !path.starts_with('/') {
            return Err(SurfaceError::InvalidRoute {
                verb: verb.to_string(),
                path: path.to_string(),
                reason: "path must start with '/'".into(),
            });
        }
        lock(&self.routes).insert((verb, path.to_string()), handler);
        Ok(())
    }

    fn remove_route(&self, verb: Verb, path: &str) -> bool {
        lock(&self.routes).remove(&(verb, path.to_string())).is_some()
    }

    fn port(&self) -> u16 {
        self.port
    }
}

// ---------------------------------------------------------------------------
// Socket engine
// ---------------------------------------------------------------------------

/// A fake connected socket client.
pub struct MockPeer {
    id: String,
    namespace: String,
    handlers: Mutex<HashMap<String, EventHandler>>,
    emitted: Mutex<Vec<(String, Value)>>,
    disconnected: AtomicBool,
}

impl MockPeer {
    fn new(id: String, namespace: String) -> Self {
        Self {
            id,
            namespace,
            handlers: Mutex::new(HashMap::new()),
            emitted: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Whether the server side disconnected this client.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Simulate the client sending `event`.
    ///
    /// Returns `None` if no handler is registered for the event.
    pub fn trigger(&self, event: &str, payload: &Value) -> Option<Result<(), AppFault>> {
        let handler = lock(&self.handlers).get(event).cloned()?;
        Some(handler(payload))
    }

    /// Events the server emitted to this client, in order.
    #[must_use]
    pub fn emitted(&self) -> Vec<(String, Value)> {
        lock(&self.emitted).clone()
    }

    /// Event names the server registered handlers for.
    #[must_use]
    pub fn handled_events(&self) -> Vec<String> {
        let mut events: Vec<String> = lock(&self.handlers).keys().cloned().collect();
        events.sort();
        events
    }
}

impl SocketPeer for MockPeer {
    fn id(&self) -> &str {
        &self.id
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn emit(&self, event: &str, payload: Value) -> SurfaceResult<()> {
        if self.is_disconnected() {
            return Err(SurfaceError::Disconnected(self.id.clone()));
        }
        lock(&self.emitted).push((event.to_string(), payload));
        Ok(())
    }

    fn on(&self, event: &str, handler: EventHandler) {
        if !self.is_disconnected() {
            lock(&self.handlers).insert(event.to_string(), handler);
        }
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        lock(&self.handlers).clear();
    }
}

struct Namespace {
    on_connect: ConnectHandler,
    peers: Vec<Arc<MockPeer>>,
}

/// In-memory socket engine with fake clients.
#[derive(Default)]
pub struct MockSocketEngine {
    namespaces: Mutex<HashMap<String, Namespace>>,
    next_peer: AtomicU64,
}

impl MockSocketEngine {
    /// Create an engine with no namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a fake client to `namespace`.
    ///
    /// Returns `None` if the namespace is not open. The connection handler's
    /// result is returned alongside the peer.
    pub fn connect(&self, namespace: &str) -> Option<(Arc<MockPeer>, Result<(), AppFault>)> {
        let peer_id = self.next_peer.fetch_add(1, Ordering::SeqCst);
        let peer = Arc::new(MockPeer::new(
            format!("peer-{peer_id}"),
            namespace.to_string(),
        ));

        let on_connect = {
            let mut namespaces = lock(&self.namespaces);
            let ns = namespaces.get_mut(namespace)?;
            ns.peers.push(Arc::clone(&peer));
            Arc::clone(&ns.on_connect)
        };

        let connection: SocketConnection = Arc::clone(&peer) as SocketConnection;
        let outcome = on_connect(connection);
        Some((peer, outcome))
    }

    /// Whether `namespace` is open.
    #[must_use]
    pub fn is_open(&self, namespace: &str) -> bool {
        lock(&self.namespaces).contains_key(namespace)
    }

    /// All open namespaces, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.namespaces).keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of clients currently connected to `namespace`.
    #[must_use]
    pub fn connected(&self, namespace: &str) -> usize {
        lock(&self.namespaces)
            .get(namespace)
            .map_or(0, |ns| ns.peers.iter().filter(|p| !p.is_disconnected()).count())
    }
}

impl SocketEngine for MockSocketEngine {
    fn open_namespace(&self, namespace: &str, on_connect: ConnectHandler) -> SurfaceResult<()> {
        let mut namespaces = lock(&self.namespaces);
        if namespaces.contains_key(namespace) {
            return Err(SurfaceError::NamespaceOpen(namespace.to_string()));
        }
        namespaces.insert(
            namespace.to_string(),
            Namespace {
                on_connect,
                peers: Vec::new(),
            },
        );
        Ok(())
    }

    fn close_namespace(&self, namespace: &str) -> usize {
        let Some(ns) = lock(&self.namespaces).remove(namespace) else {
            return 0;
        };
        let mut count: usize = 0;
        for peer in ns.peers.iter().filter(|p| !p.is_disconnected()) {
            peer.disconnect();
            count = count.saturating_add(1);
        }
        count
    }
}

// ---------------------------------------------------------------------------
// Window manager
// ---------------------------------------------------------------------------

/// In-memory window manager.
///
/// In gated mode every `create_window` call waits for a permit released
/// with [`MockWindowManager::release`], which lets tests resolve windows
/// after the owning app has closed.
pub struct MockWindowManager {
    next_id: AtomicU64,
    live: Mutex<BTreeMap<WindowId, oneshot::Sender<()>>>,
    destroyed: Mutex<Vec<WindowId>>,
    created: Mutex<Vec<WindowOptions>>,
    gate: Option<Semaphore>,
    pending: AtomicUsize,
    fail_with: Mutex<Option<String>>,
}

impl MockWindowManager {
    /// Windows resolve immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Windows resolve only after [`release`](Self::release).
    #[must_use]
    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            live: Mutex::new(BTreeMap::new()),
            destroyed: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            gate,
            pending: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
        }
    }

    /// Let `n` waiting (or future) creations resolve.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Make the next creation fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *lock(&self.fail_with) = Some(message.into());
    }

    /// Number of creations currently waiting on the gate.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Simulate the user closing a window.
    pub fn close_natively(&self, id: WindowId) -> bool {
        let Some(closed) = lock(&self.live).remove(&id) else {
            return false;
        };
        let _ = closed.send(());
        true
    }

    /// Whether a window is still open.
    #[must_use]
    pub fn is_live(&self, id: WindowId) -> bool {
        lock(&self.live).contains_key(&id)
    }

    /// Ids of every open window.
    #[must_use]
    pub fn live_windows(&self) -> Vec<WindowId> {
        lock(&self.live).keys().copied().collect()
    }

    /// Ids destroyed through `destroy_window`, in order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<WindowId> {
        lock(&self.destroyed).clone()
    }

    /// Options of every window created, in order.
    #[must_use]
    pub fn created_options(&self) -> Vec<WindowOptions> {
        lock(&self.created).clone()
    }
}

impl Default for MockWindowManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowManager for MockWindowManager {
    async fn create_window(&self, options: WindowOptions) -> SurfaceResult<NativeWindow> {
        if let Some(gate) = &self.gate {
            self.pending.fetch_add(1, Ordering::SeqCst);
            let permit = gate.acquire().await;
            self.pending.fetch_sub(1, Ordering::SeqCst);
            match permit {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(SurfaceError::WindowFailed("gate closed".into())),
            }
        }

        if let Some(message) = lock(&self.fail_with).take() {
            return Err(SurfaceError::WindowFailed(message));
        }

        let id = WindowId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        lock(&self.live).insert(id, tx);
        lock(&self.created).push(options);
        Ok(NativeWindow { id, closed: rx })
    }

    fn destroy_window(&self, id: WindowId) -> bool {
        let Some(closed) = lock(&self.live).remove(&id) else {
            return false;
        };
        let _ = closed.send(());
        lock(&self.destroyed).push(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_handler(body: &'static str) -> RouteHandler {
        Arc::new(move |_req: &Request| Ok(Response::text(body)))
    }

    #[test]
    fn router_prefers_exact_then_longest_wildcard() {
        let router = MockRouter::new(3000);
        router.register_route(Verb::Get, "/a/*", ok_handler("a")).unwrap();
        router.register_route(Verb::Get, "/a/b/*", ok_handler("ab")).unwrap();
        router.register_route(Verb::Get, "/a/b/c", ok_handler("exact")).unwrap();

        let body = |path: &str| {
            router
                .request(Verb::Get, path)
                .and_then(|r| r.body_text().map(str::to_string))
        };
        assert_eq!(body("/a/b/c").as_deref(), Some("exact"));
        assert_eq!(body("/a/b/d").as_deref(), Some("ab"));
        assert_eq!(body("/a/x").as_deref(), Some("a"));
        assert_eq!(body("/b"), None);
        assert!(router.request(Verb::Post, "/a/b/c").is_none());
    }

    #[test]
    fn engine_disconnects_on_close() {
        let engine = MockSocketEngine::new();
        engine
            .open_namespace("/chat/", Arc::new(|_conn: SocketConnection| Ok(())))
            .unwrap();
        let (a, _) = engine.connect("/chat/").unwrap();
        let (b, _) = engine.connect("/chat/").unwrap();
        assert_eq!(engine.connected("/chat/"), 2);

        assert_eq!(engine.close_namespace("/chat/"), 2);
        assert!(a.is_disconnected() && b.is_disconnected());
        assert!(!engine.is_open("/chat/"));
        assert!(engine.connect("/chat/").is_none());
    }

    #[test]
    fn engine_rejects_duplicate_namespace() {
        let engine = MockSocketEngine::new();
        engine.open_namespace("/x/", Arc::new(|_: SocketConnection| Ok(()))).unwrap();
        assert!(engine.open_namespace("/x/", Arc::new(|_: SocketConnection| Ok(()))).is_err());
    }

    #[tokio::test]
    async fn window_closed_signal_fires_on_destroy() {
        let wm = MockWindowManager::new();
        let window = wm.create_window(WindowOptions::new()).await.unwrap();
        assert!(wm.is_live(window.id));

        assert!(wm.destroy_window(window.id));
        window.closed.await.unwrap();
        assert_eq!(wm.destroyed(), vec![window.id]);
        assert!(!wm.destroy_window(window.id));
    }

    #[tokio::test]
    async fn gated_windows_wait_for_release() {
        let wm = Arc::new(MockWindowManager::gated());
        let task = {
            let wm = Arc::clone(&wm);
            tokio::spawn(async move { wm.create_window(WindowOptions::new()).await })
        };
        while wm.pending() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(wm.live_windows().is_empty());

        wm.release(1);
        let window = task.await.unwrap().unwrap();
        assert!(wm.is_live(window.id));
    }
}
