//! Containment of app-code faults.
//!
//! Everything an app hands to a shared surface is wrapped here before the
//! surface sees it. A failing or panicking callback is logged and turned
//! into a neutral result; it never unwinds into the router, the socket
//! engine or the registry.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use apphost_core::{
    AppFault, AppName, ConnectHandler, EventHandler, Request, Response, RouteHandler,
    SocketConnection, SocketPeer, SurfaceResult,
};

/// Run app code, converting a panic into an [`AppFault`].
pub(crate) fn contain<T>(f: impl FnOnce() -> Result<T, AppFault>) -> Result<T, AppFault> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(AppFault::from_panic(payload.as_ref())))
}

/// Route handler that answers `500` instead of failing.
pub(crate) fn guard_route(app: AppName, route: String, handler: RouteHandler) -> RouteHandler {
    Arc::new(move |request: &Request| {
        Ok(contain(|| handler(request)).unwrap_or_else(|fault| {
            warn!(app = %app, route = %route, error = %fault, "Route handler faulted");
            Response::internal_error("internal error")
        }))
    })
}

/// Connection handler that never reports a fault to the engine. Its peers
/// guard every event handler the app adds the same way.
pub(crate) fn guard_connect(app: AppName, on_connect: ConnectHandler) -> ConnectHandler {
    Arc::new(move |connection: SocketConnection| {
        let peer: SocketConnection = Arc::new(IsolatedPeer {
            inner: connection,
            app: app.clone(),
        });
        if let Err(fault) = contain(|| on_connect(peer)) {
            warn!(app = %app, error = %fault, "Socket connection handler faulted");
        }
        Ok(())
    })
}

struct IsolatedPeer {
    inner: SocketConnection,
    app: AppName,
}

impl SocketPeer for IsolatedPeer {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn emit(&self, event: &str, payload: Value) -> SurfaceResult<()> {
        self.inner.emit(event, payload)
    }

    fn on(&self, event: &str, handler: EventHandler) {
        let app = self.app.clone();
        let name = event.to_string();
        let guarded: EventHandler = Arc::new(move |payload: &Value| {
            if let Err(fault) = contain(|| handler(payload)) {
                warn!(app = %app, event = %name, error = %fault, "Socket event handler faulted");
            }
            Ok(())
        });
        self.inner.on(event, guarded);
    }

    fn disconnect(&self) {
        self.inner.disconnect();
    }
}
