//! Prelude module - commonly used types for convenient import.
//!
//! Use `use apphost_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Registry and apps
pub use crate::{AppRecord, AppState, Facade, Registry, RegistryOptions, Surfaces};

// Modules
pub use crate::{AppModule, ModuleLoader, StaticModuleLoader};

// Listeners
pub use crate::ListenerCall;

// Host
pub use crate::Host;
