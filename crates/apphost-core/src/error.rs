//! Error types shared across the apphost crates.

use thiserror::Error;

/// A fault raised by app-authored code (a route handler, socket callback,
/// listener, or module entry point).
///
/// App faults never propagate into the registry: they are caught at the
/// invocation site, logged, and converted into a neutral result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AppFault {
    message: String,
}

impl AppFault {
    /// Create a fault with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Build a fault from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "app code panicked".to_string()
        };
        Self { message }
    }
}

impl From<&str> for AppFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for AppFault {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Errors produced while validating core identity types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An app name cannot be used as a namespace prefix.
    #[error("invalid app name '{name}': {reason}")]
    InvalidAppName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors reported by a dispatch surface (router, socket engine, window manager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The route path is malformed or cannot be registered.
    #[error("invalid route {verb} {path}: {reason}")]
    InvalidRoute {
        /// HTTP verb of the route.
        verb: String,
        /// Path that was rejected.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A socket namespace with this path already exists.
    #[error("socket namespace already open: {0}")]
    NamespaceOpen(String),

    /// The socket peer is no longer connected.
    #[error("socket peer disconnected: {0}")]
    Disconnected(String),

    /// The native window could not be created.
    #[error("window creation failed: {0}")]
    WindowFailed(String),

    /// The surface refused the operation for another reason.
    #[error("surface rejected operation: {0}")]
    Rejected(String),
}

/// Result type for dispatch surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;
