use std::path::PathBuf;

use thiserror::Error;

use apphost_core::{AppFault, AppName, CoreError, SurfaceError};
use apphost_storage::StorageError;

/// Errors reported by the registry, app records and facades.
///
/// Faults raised by app code never appear here: they are contained where
/// the app callback is invoked.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An app with the same name is already attached.
    #[error("an app named '{0}' is already attached")]
    NameCollision(AppName),

    /// No attached app matches the given name or record.
    #[error("no attached app named '{0}'")]
    NotFound(String),

    /// `launch` on a record that is already running.
    #[error("app '{0}' is already running")]
    AlreadyRunning(AppName),

    /// The record is not running, or the facade belongs to an earlier launch.
    #[error("app '{0}' is not running")]
    NotRunning(AppName),

    /// A dispatch surface the operation needs is absent from this host.
    #[error("{0} is not available in this host")]
    CollaboratorUnavailable(&'static str),

    /// The derived app name cannot be used as a namespace prefix.
    #[error(transparent)]
    InvalidName(#[from] CoreError),

    /// The manifest exists but could not be read or parsed.
    #[error("invalid manifest at {path}: {message}")]
    Manifest {
        /// Manifest file.
        path: PathBuf,
        /// Parse or read error.
        message: String,
    },

    /// The entry module could not be loaded.
    #[error("failed to load module {path}: {message}")]
    ModuleLoad {
        /// Entry module path.
        path: PathBuf,
        /// Loader error.
        message: String,
    },

    /// The app already has its socket namespace open.
    #[error("socket namespace {0} is already open")]
    SocketNamespaceOpen(String),

    /// The router refused a route.
    #[error("route rejected: {0}")]
    Route(#[source] SurfaceError),

    /// The socket engine refused an operation.
    #[error("socket engine error: {0}")]
    Socket(#[source] SurfaceError),

    /// The window manager failed to open a window.
    #[error("window error: {0}")]
    Window(#[source] SurfaceError),

    /// The document store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Lets app code use `?` on facade calls inside `launch` and handlers.
impl From<RuntimeError> for AppFault {
    fn from(error: RuntimeError) -> Self {
        AppFault::new(error.to_string())
    }
}
