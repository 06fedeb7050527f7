//! Commonly used test doubles.
//!
//! ```rust,ignore
//! use apphost_test::prelude::*;
//! ```

pub use crate::fixtures::{TestSurfaces, init_test_logging, write_app_dir, write_package_json};
pub use crate::mocks::{MockPeer, MockRouter, MockSocketEngine, MockWindowManager};
