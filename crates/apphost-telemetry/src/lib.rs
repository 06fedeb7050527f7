//! Logging for the apphost runtime.
//!
//! This crate provides:
//! - Configurable `tracing-subscriber` setup in several formats and targets
//! - A per-app span helper so lifecycle logs carry the app's identity
//!
//! # Example
//!
//! ```rust,no_run
//! use apphost_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), apphost_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("apphost_runtime=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("host starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;
mod span;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
pub use span::app_span;
