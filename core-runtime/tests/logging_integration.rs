//! Integration tests for logging system

use core_runtime::logging::{redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_logging_initialization() {
    // Logging can only be initialized once per process, so only the builder is tested here
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.enable_spans);
}

#[test]
fn test_redaction_of_bucket_credentials() {
    assert_eq!(
        redact_if_sensitive("secret_access_key", "wJalrXUtnFEMI"),
        "[REDACTED]"
    );
    assert_eq!(redact_if_sensitive("R2_ACCESS_KEY_ID", "AKIA"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
}

#[test]
fn test_redaction_of_emails() {
    let redacted = redact_if_sensitive("contact", "photographer@example.com");

    assert!(redacted.starts_with('p'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_normal_values_pass_through() {
    assert_eq!(redact_if_sensitive("bucket", "catalog"), "catalog");
    assert_eq!(redact_if_sensitive("key", "2024/beach.jpg"), "2024/beach.jpg");
    assert_eq!(redact_if_sensitive("album", "Iceland"), "Iceland");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[cfg(not(debug_assertions))]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_sync=trace")
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_sync=trace"));
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
