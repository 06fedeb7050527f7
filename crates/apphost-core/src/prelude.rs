//! Prelude module - commonly used types for convenient import.
//!
//! Use `use apphost_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{AppFault, CoreError, CoreResult, SurfaceError, SurfaceResult};

// Identity
pub use crate::{AppId, AppName};

// HTTP
pub use crate::{Request, Response, RouteHandler, Router, Verb};

// Sockets
pub use crate::{ConnectHandler, EventHandler, SocketConnection, SocketEngine, SocketPeer};

// Windows
pub use crate::{NativeWindow, WindowId, WindowManager, WindowOptions};
