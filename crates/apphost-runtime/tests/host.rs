//! Host boot and shutdown from configuration.

use std::sync::Arc;

use apphost_config::HostConfig;
use apphost_core::{AppFault, Response, Verb};
use apphost_runtime::{Facade, Host, RuntimeError, StaticModuleLoader, Surfaces};
use apphost_test::{TestSurfaces, write_app_dir, write_package_json};

fn greeter(app: &Facade) -> Result<(), AppFault> {
    let name = app.name().to_string();
    app.get("/hello", move |_req| Ok(Response::text(format!("hello from {name}"))))?;
    Ok(())
}

fn surfaces(test: &TestSurfaces) -> Surfaces {
    Surfaces::new(
        test.router.clone(),
        test.sockets.clone(),
        test.storage.clone(),
    )
    .with_windows(test.windows.clone())
}

#[test]
fn boot_attaches_autoload_then_discovered_apps() {
    let root = tempfile::tempdir().unwrap();
    let test = TestSurfaces::new();
    let loader = StaticModuleLoader::new();

    let alpha = write_app_dir(&root.path().join("apps"), "alpha", Some("name = \"alpha\"\n"));
    let beta = write_package_json(
        &root.path().join("apps"),
        "beta",
        r#"{"name": "beta", "main": "main"}"#,
    );
    write_app_dir(&root.path().join("apps"), "not-an-app", None);
    let broken = write_app_dir(root.path(), "broken", None);
    loader.register(alpha.join("app"), || greeter);
    loader.register(beta.join("main"), || greeter);

    let mut config = HostConfig::default();
    config.apps.autoload = vec![broken.clone()];
    config.apps.discover_dir = Some("apps".into());

    let host = Host::new(config, root.path(), surfaces(&test), Arc::new(loader));
    let report = host.boot();

    assert_eq!(report.attached, vec!["broken", "alpha", "beta"]);
    assert_eq!(report.launched, vec!["alpha", "beta"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, broken);
    assert!(matches!(report.failed[0].1, RuntimeError::ModuleLoad { .. }));

    let response = test.router.request(Verb::Get, "/beta/hello").unwrap();
    assert_eq!(response.body_text(), Some("hello from beta"));
    assert!(host.registry().get("not-an-app").is_none());

    assert_eq!(host.shutdown(), 3);
    assert!(host.registry().is_empty());
    assert!(test.router.routes().is_empty());
}

#[test]
fn boot_without_launch_only_attaches() {
    let root = tempfile::tempdir().unwrap();
    let test = TestSurfaces::new();
    let location = write_app_dir(root.path(), "quiet", None);
    let loader = StaticModuleLoader::new().with_module(location.join("app"), || greeter);

    let mut config = HostConfig::default();
    config.apps.autoload = vec!["quiet".into()];
    config.apps.launch_on_attach = false;

    let host = Host::new(config, root.path(), surfaces(&test), Arc::new(loader));
    let report = host.boot();

    assert_eq!(report.attached, vec!["quiet"]);
    assert!(report.launched.is_empty());
    assert!(!host.registry().get("quiet").unwrap().is_running());
    assert!(test.router.routes().is_empty());
}

#[test]
fn boot_skips_name_collisions() {
    let root = tempfile::tempdir().unwrap();
    let test = TestSurfaces::new();
    let first = write_app_dir(root.path(), "one", Some("name = \"dup\"\n"));
    let second = write_app_dir(root.path(), "two", Some("name = \"dup\"\n"));

    let mut config = HostConfig::default();
    config.apps.autoload = vec![first, second.clone()];
    config.apps.launch_on_attach = false;

    let host = Host::new(
        config,
        root.path(),
        surfaces(&test),
        Arc::new(StaticModuleLoader::new()),
    );
    let report = host.boot();

    assert_eq!(report.attached, vec!["dup"]);
    assert_eq!(report.failed[0].0, second);
    assert!(matches!(report.failed[0].1, RuntimeError::NameCollision(_)));
}

#[test]
fn boot_serves_configured_client_modules() {
    let root = tempfile::tempdir().unwrap();
    let test = TestSurfaces::new();
    std::fs::create_dir(root.path().join("vendor")).unwrap();
    std::fs::write(root.path().join("vendor/chart.js"), "export default 1;").unwrap();

    let mut config = HostConfig::default();
    config
        .apps
        .client_modules
        .insert("chart.js".into(), "vendor/chart.js".into());
    config
        .apps
        .client_modules
        .insert("nested/name".into(), "vendor/chart.js".into());

    let host = Host::new(
        config,
        root.path(),
        surfaces(&test),
        Arc::new(StaticModuleLoader::new()),
    );
    let report = host.boot();

    assert_eq!(report.client_modules, vec!["chart.js"]);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, RuntimeError::Route(_)));

    let response = test.router.request(Verb::Get, "/modules/chart.js").unwrap();
    assert_eq!(response.body_text(), Some("export default 1;"));

    host.shutdown();
    assert!(test.router.has_route(Verb::Get, "/modules/chart.js"));
}

#[test]
fn working_dir_and_host_come_from_config() {
    let root = tempfile::tempdir().unwrap();
    let test = TestSurfaces::new();
    let location = write_app_dir(&root.path().join("srv"), "web", None);

    let mut config = HostConfig::default();
    config.server.host = "localhost".into();
    config.apps.working_dir = Some("srv".into());

    let host = Host::new(
        config,
        root.path(),
        surfaces(&test),
        Arc::new(StaticModuleLoader::new()),
    );
    assert_eq!(host.registry().working_dir(), root.path().join("srv"));

    let record = host.registry().attach("web").unwrap();
    assert_eq!(record.location(), location.as_path());
    assert_eq!(host.registry().url(record.name()), "localhost:3000/web/");
}

#[test]
fn log_config_follows_logging_section() {
    let root = tempfile::tempdir().unwrap();
    let test = TestSurfaces::new();
    let mut config = HostConfig::default();
    config.logging.level = "DEBUG".into();
    config.logging.format = "json".into();

    let host = Host::new(
        config,
        root.path(),
        surfaces(&test),
        Arc::new(StaticModuleLoader::new()),
    );
    let log = host.log_config();
    assert_eq!(log.level, "debug");
    assert_eq!(log.format, apphost_telemetry::LogFormat::Json);
}
