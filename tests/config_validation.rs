//! Integration tests for configuration validation

#![allow(clippy::expect_used)]

use std::time::Duration;
use stnp_login::config::{LogLevel, LoginConfig, RestConfig};
use tracing::Level;

fn local_config() -> LoginConfig {
    LoginConfig::default_with_overrides(|config| {
        config.store.db_file = String::new();
        config.logging.log_file = String::new();
    })
}

#[test]
fn test_local_config_validates() {
    let errors = local_config().validate();
    assert!(
        errors.is_empty(),
        "Config without files should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_default_ports() {
    let config = LoginConfig::default();
    assert_eq!(config.server.address, "0.0.0.0:4660");
    assert_eq!(config.rest.address, "0.0.0.0:8124");
    assert_eq!(config.logging.log_level, LogLevel::Info);
}

#[test]
fn test_invalid_server_address() {
    let mut config = local_config();
    config.server.address = "invalid_address".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Invalid server address")));
}

#[test]
fn test_empty_server_address() {
    let mut config = local_config();
    config.server.address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_zero_backpressure_limit() {
    let mut config = local_config();
    config.server.backpressure_limit = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Backpressure limit must be greater than 0")));
}

#[test]
fn test_short_shutdown_timeout() {
    let mut config = local_config();
    config.server.shutdown_timeout = Duration::from_millis(50);

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Shutdown timeout too short")));
}

#[test]
fn test_invalid_allow_list_entry() {
    let mut config = local_config();
    config.rest.allow_list.push("not-an-ip".to_string());

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Invalid allow-list address: 'not-an-ip'")));
    assert_eq!(config.rest.allowed_addrs().len(), 2);
}

#[test]
fn test_disabled_rest_skips_validation() {
    let rest = RestConfig {
        enabled: false,
        address: "nowhere".to_string(),
        ..RestConfig::default()
    };
    assert!(rest.validate().is_empty());
}

#[test]
fn test_missing_db_directory() {
    let mut config = local_config();
    config.store.db_file = "/definitely/not/here/db.json".to_string();

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Database directory does not exist")));
}

#[test]
fn test_empty_paths_disable_files() {
    let config = local_config();
    assert!(config.store.db_path().is_none());
    assert!(config.logging.log_path().is_none());
}

#[test]
fn test_multiple_errors_collected() {
    let mut config = local_config();
    config.server.address = "bad".to_string();
    config.server.backpressure_limit = 0;
    config.rest.workers = 0;

    let errors = config.validate();
    assert!(errors.len() >= 3, "got {errors:?}");
}

#[test]
fn test_validate_strict_reports_every_error() {
    let mut config = local_config();
    config.server.address = "bad".to_string();
    config.rest.workers = 0;

    let err = config.validate_strict().expect_err("should be rejected");
    let message = err.to_string();
    assert!(message.contains("Invalid server address"));
    assert!(message.contains("REST workers must be greater than 0"));
}

#[test]
fn test_log_levels() {
    for (text, level) in [
        ("debug", Level::DEBUG),
        ("info", Level::INFO),
        ("warning", Level::WARN),
        ("error", Level::ERROR),
        ("critical", Level::ERROR),
    ] {
        let parsed: LogLevel = text.parse().expect("valid level");
        assert_eq!(parsed.as_tracing(), level);
        assert_eq!(parsed.to_string(), text);
    }
    assert!("verbose".parse::<LogLevel>().is_err());
    assert!("INFO".parse::<LogLevel>().is_err());
}

#[test]
fn test_toml_partial_config() {
    let config = LoginConfig::from_toml(
        r#"
        [server]
        address = "127.0.0.1:5000"
        backpressure_limit = 16
        shutdown_timeout = 2000

        [logging]
        log_level = "warning"
        log_file = ""
        "#,
    )
    .expect("valid TOML");

    assert_eq!(config.server.address, "127.0.0.1:5000");
    assert_eq!(config.server.shutdown_timeout, Duration::from_secs(2));
    assert_eq!(config.logging.log_level, LogLevel::Warning);
    assert_eq!(config.rest.address, "0.0.0.0:8124");
}

#[test]
fn test_toml_bad_level_rejected() {
    let result = LoginConfig::from_toml(
        r#"
        [logging]
        log_level = "loud"
        log_file = ""
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("login.toml");

    let mut config = local_config();
    config.rest.workers = 7;
    config.save_to_file(&path).expect("save");

    let reloaded = LoginConfig::from_file(&path).expect("reload");
    assert_eq!(reloaded.rest.workers, 7);
    assert_eq!(reloaded.server.address, config.server.address);
}

#[test]
fn test_example_config_parses() {
    let example = LoginConfig::example_config();
    assert!(example.contains("[server]"));
    LoginConfig::from_toml(&example).expect("example config parses");
}

#[test]
fn test_env_overrides_layer_on_loaded_config() {
    let mut config = local_config();
    std::env::set_var("STNP_LOGIN_REST_ALLOW_LIST", "10.0.0.1, ::1,");
    std::env::set_var("STNP_LOGIN_LOG_LEVEL", "debug");
    let applied = config.apply_env();
    std::env::remove_var("STNP_LOGIN_REST_ALLOW_LIST");
    std::env::remove_var("STNP_LOGIN_LOG_LEVEL");

    applied.expect("valid overrides");
    assert_eq!(config.rest.allow_list, vec!["10.0.0.1", "::1"]);
    assert_eq!(config.logging.log_level, LogLevel::Debug);
    assert!(config.store.db_path().is_none());
}
