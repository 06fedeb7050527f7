//! Global subscriber installation. Kept in its own test binary because the
//! subscriber is process-wide.

use apphost_telemetry::{LogConfig, LogFormat, TelemetryError, setup_logging};

#[test]
fn second_install_is_an_init_error() {
    let config = LogConfig::new("debug")
        .with_format(LogFormat::Compact)
        .without_ansi();

    setup_logging(&config).unwrap();
    tracing::info!(app = "notes", "installed");

    let err = setup_logging(&config).unwrap_err();
    assert!(matches!(err, TelemetryError::InitError(_)));
}

#[test]
fn invalid_level_fails_before_install() {
    let err = setup_logging(&LogConfig::new("[nope")).unwrap_err();
    assert!(matches!(err, TelemetryError::ConfigError(_)));
}
