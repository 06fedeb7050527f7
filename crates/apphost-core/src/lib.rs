//! Apphost Core - Foundation types shared by every apphost crate.
//!
//! This crate provides:
//! - App identity types ([`AppName`], [`AppId`]) and the namespacing rules
//!   that keep apps from colliding on shared surfaces
//! - HTTP request/response types used by route handlers
//! - The dispatch surface traits ([`Router`], [`SocketEngine`],
//!   [`WindowManager`]) implemented by the host's collaborators
//! - Error types for app-code faults and surface failures

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod http;
pub mod names;
pub mod router;
pub mod socket;
pub mod window;

pub use error::{AppFault, CoreError, CoreResult, SurfaceError, SurfaceResult};
pub use http::{Request, Response, RouteHandler, Verb};
pub use names::{AppId, AppName};
pub use router::Router;
pub use socket::{ConnectHandler, EventHandler, SocketConnection, SocketEngine, SocketPeer};
pub use window::{NativeWindow, WindowId, WindowManager, WindowOptions};
