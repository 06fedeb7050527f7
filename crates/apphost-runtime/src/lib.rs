//! Apphost Runtime - hosting many apps on shared dispatch surfaces.
//!
//! This crate provides:
//! - The [`Registry`], which owns every attached app and is the only
//!   component that talks to the shared router, socket engine, window
//!   manager and document store
//! - [`AppRecord`], the per-app lifecycle state machine that tracks every
//!   resource a launch registers so closing the app undoes all of it
//! - [`Facade`], the namespace-scoped handle an app's code receives
//! - Manifest reading, app discovery and module loading
//! - [`Host`], the process-wide context with boot and shutdown
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use apphost_core::{AppFault, Response};
//! use apphost_runtime::{Facade, Registry, StaticModuleLoader, Surfaces};
//! # fn surfaces() -> Surfaces { unimplemented!() }
//!
//! # fn example() -> apphost_runtime::RuntimeResult<()> {
//! let loader = StaticModuleLoader::new().with_module("/srv/apps/notes/app", || {
//!     |app: &Facade| -> Result<(), AppFault> {
//!         app.get("/items", |_req| Ok(Response::text("[]")))?;
//!         Ok(())
//!     }
//! });
//! let registry = Registry::new(surfaces(), Arc::new(loader));
//!
//! let record = registry.attach("/srv/apps/notes")?;
//! record.launch()?;
//! // GET /notes/items is now served.
//!
//! registry.detach(&record)?;
//! // ...and gone again.
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod discovery;
pub mod error;
pub mod facade;
pub mod host;
mod isolation;
pub mod listener;
pub mod loader;
pub mod manifest;
pub mod record;
pub mod registry;
mod static_files;

pub use discovery::discover_app_dirs;
pub use error::{RuntimeError, RuntimeResult};
pub use facade::Facade;
pub use host::{BootReport, Host, file_store};
pub use listener::{Listener, ListenerCall};
pub use loader::{AppModule, CachingModuleLoader, ModuleFactory, ModuleLoader, StaticModuleLoader};
pub use manifest::{AppManifest, load_manifest, manifest_path};
pub use record::{AppRecord, AppState, ResourceSummary};
pub use registry::{
    AppRef, CLIENT_MODULE_PREFIX, Registry, RegistryOptions, RouteHandle, Surfaces, WindowHandle,
    WindowOwner, WindowTarget,
};
