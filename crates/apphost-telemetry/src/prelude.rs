//! Commonly used types for convenient import.
//!
//! ```rust,no_run
//! use apphost_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! setup_logging(&LogConfig::new("debug").with_format(LogFormat::Compact))?;
//! let _guard = app_span("notes", "k3v9x0aa").entered();
//! tracing::info!("launching");
//! # Ok(())
//! # }
//! ```

pub use crate::{TelemetryError, TelemetryResult};

pub use crate::{FileRotation, LogConfig, LogFormat, LogTarget};

pub use crate::{app_span, setup_default_logging, setup_logging};
