//! Router surface trait.

use crate::error::SurfaceResult;
use crate::http::{RouteHandler, Verb};

/// The shared HTTP router.
///
/// Paths passed here are already namespaced (`/<app><path>`). Only the
/// registry calls these methods.
pub trait Router: Send + Sync {
    /// Register a handler for `verb path`.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`](crate::SurfaceError) if the router refuses
    /// the route.
    fn register_route(&self, verb: Verb, path: &str, handler: RouteHandler) -> SurfaceResult<()>;

    /// Remove every handler registered for `verb path`.
    ///
    /// Returns `false` if no such route existed.
    fn remove_route(&self, verb: Verb, path: &str) -> bool;

    /// The port the router is serving on.
    fn port(&self) -> u16;
}
