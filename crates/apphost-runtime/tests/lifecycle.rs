//! Attach, launch, close and detach.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use apphost_core::{AppFault, Response, RouteHandler, Router, SurfaceResult, Verb};
use apphost_runtime::{
    AppModule, AppState, CachingModuleLoader, Facade, ModuleLoader, Registry, RegistryOptions,
    RuntimeError, StaticModuleLoader, Surfaces,
};
use apphost_test::{MockRouter, TestSurfaces, write_app_dir, write_package_json};

use common::{Harness, idle};

#[test]
fn second_attach_with_same_name_fails() {
    let h = Harness::new();
    let first = write_app_dir(h.root(), "a/notes", None);
    let second = write_app_dir(h.root(), "b/notes", None);

    let record = h.registry.attach(&first).unwrap();
    let err = h.registry.attach(&second).unwrap_err();

    assert!(matches!(err, RuntimeError::NameCollision(ref name) if name.as_str() == "notes"));
    assert_eq!(h.registry.len(), 1);
    assert!(Arc::ptr_eq(&h.registry.get("notes").unwrap(), &record));
    assert_eq!(h.registry.app_path("notes").unwrap(), first);
}

#[test]
fn manifest_names_collide_too() {
    let h = Harness::new();
    let first = write_app_dir(h.root(), "one", Some("name = \"shared\"\n"));
    let second = write_app_dir(h.root(), "two", Some("name = \"shared\"\n"));

    h.registry.attach(first).unwrap();
    assert!(matches!(
        h.registry.attach(second),
        Err(RuntimeError::NameCollision(_))
    ));
    assert_eq!(h.registry.app_names().len(), 1);
}

#[test]
fn missing_manifest_uses_defaults() {
    let h = Harness::new();
    let location = write_app_dir(h.root(), "todo", None);

    let record = h.registry.attach("todo").unwrap();

    assert_eq!(record.name().as_str(), "todo");
    assert_eq!(record.manifest().entry, "app");
    assert_eq!(record.location(), location.as_path());
    assert_eq!(record.state(), AppState::Attached);
    assert_eq!(record.generation(), 0);
}

#[test]
fn package_json_main_is_the_entry() {
    let h = Harness::new();
    let location = write_package_json(
        h.root(),
        "legacy",
        r#"{"name": "old-app", "main": "index", "version": "1.0.0"}"#,
    );
    h.loader.register(location.join("index"), || idle);

    let record = h.registry.attach(&location).unwrap();
    assert_eq!(record.name().as_str(), "old-app");
    assert_eq!(record.manifest().entry, "index");
    assert!(record.launch().is_ok());
}

#[test]
fn malformed_manifest_fails_attach() {
    let h = Harness::new();
    let location = write_app_dir(h.root(), "broken", Some("name = [unclosed"));

    assert!(matches!(
        h.registry.attach(location),
        Err(RuntimeError::Manifest { .. })
    ));
    assert!(h.registry.is_empty());
}

#[test]
fn close_before_launch_is_a_no_op() {
    let h = Harness::new();
    let record = h.registry.attach(h.app("idle", || idle)).unwrap();

    assert!(!record.close());
    assert_eq!(record.state(), AppState::Attached);
    assert!(h.surfaces.router.routes().is_empty());
    assert!(h.surfaces.sockets.namespaces().is_empty());
}

#[test]
fn second_close_is_a_no_op() {
    let h = Harness::new();
    let location = h.app("shop", || {
        |app: &Facade| -> Result<(), AppFault> {
            app.get("/cart", |_req| Ok(Response::text("empty")))?;
            Ok(())
        }
    });
    let record = h.registry.attach(location).unwrap();
    record.launch().unwrap();

    assert!(record.close());
    assert_eq!(record.state(), AppState::Closed);
    assert!(!record.close());
    assert!(h.surfaces.router.routes().is_empty());
}

#[test]
fn launch_twice_runs_entry_once() {
    let h = Harness::new();
    let launches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&launches);
    let location = h.app("counter", move || {
        let counter = Arc::clone(&counter);
        move |app: &Facade| -> Result<(), AppFault> {
            counter.fetch_add(1, Ordering::SeqCst);
            app.get("/hits", |_req| Ok(Response::text("1")))?;
            Ok(())
        }
    });
    let record = h.registry.attach(location).unwrap();

    record.launch().unwrap();
    let err = record.launch().unwrap_err();

    assert!(matches!(err, RuntimeError::AlreadyRunning(_)));
    assert_eq!(launches.load(Ordering::SeqCst), 1);
    assert_eq!(record.generation(), 1);
    assert_eq!(h.surfaces.router.routes().len(), 1);
}

#[test]
fn relaunch_rebinds_the_facade() {
    let h = Harness::new();
    let record = h.registry.attach(h.app("notes", || idle)).unwrap();

    let stale = record.launch().unwrap();
    assert!(record.close());
    let fresh = record.launch().unwrap();

    assert_eq!(stale.generation(), 1);
    assert_eq!(fresh.generation(), 2);
    assert!(!stale.is_active());
    assert!(fresh.is_active());

    let err = stale
        .get("/late", |_req| Ok(Response::text("late")))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::NotRunning(_)));
    assert!(!h.surfaces.router.has_route(Verb::Get, "/notes/late"));
    assert!(!stale.add_listener("late", |v: &serde_json::Value| Ok(v.clone())));

    fresh.get("/now", |_req| Ok(Response::text("now"))).unwrap();
    assert!(h.surfaces.router.has_route(Verb::Get, "/notes/now"));
}

#[test]
fn detach_reports_whether_running() {
    let h = Harness::new();
    h.registry.attach(h.app("idle", || idle)).unwrap();
    let running = h.registry.attach(h.app("busy", || idle)).unwrap();
    running.launch().unwrap();

    assert!(!h.registry.detach("idle").unwrap());
    assert!(h.registry.detach(&running).unwrap());
    assert!(running.is_detached());
    assert!(h.registry.is_empty());
}

#[test]
fn detach_unknown_is_not_found() {
    let h = Harness::new();
    assert!(matches!(
        h.registry.detach("ghost"),
        Err(RuntimeError::NotFound(ref name)) if name == "ghost"
    ));
}

#[test]
fn detached_record_cannot_launch() {
    let h = Harness::new();
    let record = h.registry.attach(h.app("gone", || idle)).unwrap();
    h.registry.detach(&record).unwrap();

    assert!(matches!(record.launch(), Err(RuntimeError::NotFound(_))));
    assert!(matches!(
        h.registry.detach(&record),
        Err(RuntimeError::NotFound(_))
    ));
}

#[test]
fn detach_by_record_requires_identity() {
    let h = Harness::new();
    let location = h.app("notes", || idle);
    let old = h.registry.attach(&location).unwrap();
    h.registry.detach(&old).unwrap();
    let new = h.registry.attach(&location).unwrap();

    assert!(matches!(
        h.registry.detach(&old),
        Err(RuntimeError::NotFound(_))
    ));
    assert!(Arc::ptr_eq(&h.registry.get("notes").unwrap(), &new));
    assert_ne!(old.id(), new.id());
}

#[test]
fn failed_load_leaves_record_attached() {
    let h = Harness::new();
    let location = write_app_dir(h.root(), "unregistered", None);
    let record = h.registry.attach(&location).unwrap();

    assert!(matches!(
        record.launch(),
        Err(RuntimeError::ModuleLoad { .. })
    ));
    assert_eq!(record.state(), AppState::Attached);
    assert_eq!(record.generation(), 0);

    h.loader.register(location.join("app"), || idle);
    assert!(record.launch().is_ok());
    assert_eq!(record.generation(), 1);
}

#[test]
fn faulting_launch_keeps_what_it_registered() {
    let h = Harness::new();
    let failing = h.app("failing", || {
        |app: &Facade| -> Result<(), AppFault> {
            app.get("/first", |_req| Ok(Response::text("ok")))?;
            Err(AppFault::new("gave up"))
        }
    });
    let panicking = h.app("panicking", || {
        |app: &Facade| -> Result<(), AppFault> {
            app.get("/first", |_req| Ok(Response::text("ok")))?;
            panic!("launch exploded");
        }
    });

    for location in [failing, panicking] {
        let record = h.registry.attach(location).unwrap();
        assert!(record.launch().is_ok());
        assert!(record.is_running());
    }
    assert!(h.surfaces.router.has_route(Verb::Get, "/failing/first"));
    assert!(h.surfaces.router.has_route(Verb::Get, "/panicking/first"));
}

#[test]
fn launch_and_close_by_name() {
    let h = Harness::new();
    h.registry.attach(h.app("named", || idle)).unwrap();

    let facade = h.registry.launch_app("named").unwrap();
    assert_eq!(facade.name().as_str(), "named");
    assert!(h.registry.close_app("named").unwrap());
    assert!(!h.registry.close_app("named").unwrap());
    assert!(matches!(
        h.registry.launch_app("other"),
        Err(RuntimeError::NotFound(_))
    ));
}

#[test]
fn detach_all_closes_everything() {
    let h = Harness::new();
    for dir in ["a", "b", "c"] {
        let location = h.app(dir, || {
            |app: &Facade| -> Result<(), AppFault> {
                app.get("/", |_req| Ok(Response::text("home")))?;
                Ok(())
            }
        });
        h.registry.attach(location).unwrap().launch().unwrap();
    }
    assert_eq!(h.surfaces.router.routes().len(), 3);

    assert_eq!(h.registry.detach_all(), 3);
    assert!(h.registry.is_empty());
    assert!(h.surfaces.router.routes().is_empty());
}

/// Records, for each launch, how many times this instance had launched
/// before.
struct Remembering {
    launches: AtomicUsize,
    log: Arc<Mutex<Vec<usize>>>,
}

impl AppModule for Remembering {
    fn launch(&self, _facade: &Facade) -> Result<(), AppFault> {
        let previous = self.launches.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(previous);
        Ok(())
    }
}

fn relaunch_log(cache: bool) -> Vec<usize> {
    let surfaces = TestSurfaces::new();
    let root = tempfile::tempdir().unwrap();
    let location = write_app_dir(root.path(), "stateful", None);

    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&log);
    let inner = StaticModuleLoader::new().with_module(location.join("app"), move || Remembering {
        launches: AtomicUsize::new(0),
        log: Arc::clone(&shared),
    });
    let loader: Arc<dyn ModuleLoader> = if cache {
        Arc::new(CachingModuleLoader::new(inner))
    } else {
        Arc::new(inner)
    };

    let registry = Registry::with_options(
        Surfaces::new(surfaces.router, surfaces.sockets, surfaces.storage),
        loader,
        RegistryOptions::new(root.path()),
    );
    let record = registry.attach(&location).unwrap();
    for _ in 0..2 {
        record.launch().unwrap();
        record.close();
    }

    log.lock().unwrap().clone()
}

#[test]
fn relaunch_loads_a_fresh_module() {
    assert_eq!(relaunch_log(false), vec![0, 0]);
}

#[test]
fn caching_loader_keeps_module_state() {
    assert_eq!(relaunch_log(true), vec![0, 1]);
}

type Hook = Box<dyn FnOnce() + Send>;

/// Router that runs a hook on the first route removal, while a close is
/// part way through its teardown.
struct TeardownRouter {
    inner: Arc<MockRouter>,
    on_remove: Mutex<Option<Hook>>,
}

impl TeardownRouter {
    fn set_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_remove.lock().unwrap() = Some(Box::new(hook));
    }
}

impl Router for TeardownRouter {
    fn register_route(&self, verb: Verb, path: &str, handler: RouteHandler) -> SurfaceResult<()> {
        self.inner.register_route(verb, path, handler)
    }

    fn remove_route(&self, verb: Verb, path: &str) -> bool {
        let hook = self.on_remove.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.remove_route(verb, path)
    }

    fn port(&self) -> u16 {
        self.inner.port()
    }
}

/// An app serving `GET /items` with an open socket namespace.
fn serving(app: &Facade) -> Result<(), AppFault> {
    app.get("/items", |_req| Ok(Response::text("[]")))?;
    app.add_socket_namespace(|_conn| Ok(()))?;
    Ok(())
}

struct TeardownHarness {
    surfaces: TestSurfaces,
    router: Arc<TeardownRouter>,
    loader: Arc<StaticModuleLoader>,
    registry: Registry,
    root: tempfile::TempDir,
}

impl TeardownHarness {
    fn new() -> Self {
        let surfaces = TestSurfaces::new();
        let router = Arc::new(TeardownRouter {
            inner: Arc::clone(&surfaces.router),
            on_remove: Mutex::new(None),
        });
        let loader = Arc::new(StaticModuleLoader::new());
        let root = tempfile::tempdir().unwrap();
        let registry = Registry::with_options(
            Surfaces::new(
                Arc::clone(&router) as Arc<dyn Router>,
                surfaces.sockets.clone(),
                surfaces.storage.clone(),
            ),
            Arc::clone(&loader) as Arc<dyn ModuleLoader>,
            RegistryOptions::new(root.path()),
        );
        Self {
            surfaces,
            router,
            loader,
            registry,
            root,
        }
    }

    fn serving_app(&self, dir: &str) -> std::path::PathBuf {
        let location = write_app_dir(self.root.path(), dir, None);
        self.loader.register(location.join("app"), || serving);
        location
    }

    fn serves_notes(&self) -> bool {
        self.surfaces.router.has_route(Verb::Get, "/notes/items")
            && self.surfaces.sockets.is_open("/notes/")
    }
}

#[test]
fn same_name_attach_during_detach_collides() {
    let h = TeardownHarness::new();
    let first = h.serving_app("a/notes");
    let second = h.serving_app("b/notes");
    h.registry.attach(&first).unwrap().launch().unwrap();

    let during = Arc::new(Mutex::new(None));
    {
        let registry = h.registry.clone();
        let second = second.clone();
        let during = Arc::clone(&during);
        h.router.set_hook(move || {
            let outcome = std::thread::spawn(move || registry.attach(&second).map(|_| ()))
                .join()
                .unwrap();
            *during.lock().unwrap() = Some(outcome);
        });
    }

    assert!(h.registry.detach("notes").unwrap());
    let outcome = during.lock().unwrap().take().unwrap();
    assert!(matches!(outcome, Err(RuntimeError::NameCollision(_))));
    assert!(h.registry.is_empty());
    assert!(!h.serves_notes());

    let record = h.registry.attach(&second).unwrap();
    record.launch().unwrap();
    assert!(h.serves_notes());
    let held = record.resources();
    assert_eq!(held.routes, vec![(Verb::Get, "/items".to_string())]);
    assert!(held.socket_namespace);
}

#[test]
fn relaunch_during_close_waits_for_teardown() {
    let h = TeardownHarness::new();
    let record = h.registry.attach(h.serving_app("notes")).unwrap();
    record.launch().unwrap();

    let pending = Arc::new(Mutex::new(None));
    {
        let record = Arc::clone(&record);
        let pending = Arc::clone(&pending);
        h.router.set_hook(move || {
            let relaunch = std::thread::spawn(move || record.launch().map(|app| app.generation()));
            *pending.lock().unwrap() = Some(relaunch);
        });
    }

    assert!(record.close());
    let relaunch = pending.lock().unwrap().take().unwrap();
    assert_eq!(relaunch.join().unwrap().unwrap(), 2);

    assert!(record.is_running());
    assert!(h.serves_notes());
    assert_eq!(record.resources().routes.len(), 1);
}
