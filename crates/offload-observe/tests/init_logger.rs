//! Installs the process-wide subscriber, so it lives in its own test binary.

use offload_observe::{LoggerConfig, LoggerError, LoggerFormat, LoggerLevel, init_logger};

#[test]
fn installs_once_then_refuses() {
    let cfg = LoggerConfig {
        format: LoggerFormat::Json,
        level: LoggerLevel::new("warn,offload_core=debug").unwrap(),
        use_color: false,
        ..Default::default()
    };
    init_logger(&cfg).unwrap();
    tracing::warn!(task = "t-1", "logger installed");

    assert!(matches!(
        init_logger(&LoggerConfig::default()),
        Err(LoggerError::AlreadyInitialized)
    ));
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
#[test]
fn journald_without_support_is_a_config_error() {
    let cfg = LoggerConfig {
        format: LoggerFormat::Journald,
        ..Default::default()
    };
    assert!(matches!(
        init_logger(&cfg),
        Err(LoggerError::JournaldNotSupported)
    ));
}
