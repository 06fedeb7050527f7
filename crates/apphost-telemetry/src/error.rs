//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging configuration is invalid (bad level or directive).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A global subscriber could not be installed, usually because one is
    /// already set.
    #[error("Initialization error: {0}")]
    InitError(String),

    /// IO error while preparing a log directory.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
