//! Apphost Test - Shared test utilities for the apphost runtime.
//!
//! In-memory doubles for every dispatch surface, usable as a
//! dev-dependency from any apphost crate.
//!
//! ```toml
//! [dev-dependencies]
//! apphost-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use apphost_test::MockRouter;
//! use apphost_core::{Request, Verb};
//!
//! let router = MockRouter::new(3000);
//! // ... register routes through the registry ...
//! let response = router.dispatch(&Request::new(Verb::Get, "/notes/items"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
