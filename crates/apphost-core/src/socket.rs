//! Socket engine surface traits.
//!
//! An app owns at most one namespace on the engine. Individual event names
//! live inside that namespace and are registered per connection through
//! [`SocketPeer::on`], so they are never tracked as separate resources.

use std::sync::Arc;

use crate::error::{AppFault, SurfaceResult};

/// Handler for a named event sent by a connected client.
pub type EventHandler = Arc<dyn Fn(&serde_json::Value) -> Result<(), AppFault> + Send + Sync>;

/// One connected client inside a namespace.
pub trait SocketPeer: Send + Sync {
    /// Connection id, unique within the engine.
    fn id(&self) -> &str;

    /// Namespace the client connected to.
    fn namespace(&self) -> &str;

    /// Send an event to this client.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Disconnected`](crate::SurfaceError::Disconnected)
    /// if the client is gone.
    fn emit(&self, event: &str, payload: serde_json::Value) -> SurfaceResult<()>;

    /// Register a handler for an event sent by this client.
    fn on(&self, event: &str, handler: EventHandler);

    /// Disconnect this client.
    fn disconnect(&self);
}

/// Shared handle to a connected client.
pub type SocketConnection = Arc<dyn SocketPeer>;

/// Handler invoked once per inbound connection to a namespace.
pub type ConnectHandler = Arc<dyn Fn(SocketConnection) -> Result<(), AppFault> + Send + Sync>;

/// The shared websocket engine.
pub trait SocketEngine: Send + Sync {
    /// Open `namespace` and invoke `on_connect` for every client joining it.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::NamespaceOpen`](crate::SurfaceError::NamespaceOpen)
    /// if the namespace already exists.
    fn open_namespace(&self, namespace: &str, on_connect: ConnectHandler) -> SurfaceResult<()>;

    /// Disconnect every member of `namespace`, drop its listeners and delete it.
    ///
    /// Returns the number of clients that were disconnected. Closing a
    /// namespace that does not exist is a no-op returning `0`.
    fn close_namespace(&self, namespace: &str) -> usize;
}
