use std::fs;
use std::time::Duration;

use crawldash_app::platform::config::{self, AppConfig, ConfigError};
use crawldash_app::platform::logging::LogDestination;
use log::LevelFilter;
use pretty_assertions::assert_eq;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = config::load(&dir.path().join("absent.ron")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.base_url, "http://localhost:8000/api/v1");
    assert_eq!(config.page_size(), 10);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crawldash.ron");
    fs::write(
        &path,
        r#"(
            base_url: "https://crawler.internal/api/v1",
            page_size: 25,
            log_level: "debug",
            log_destination: Both,
        )"#,
    )
    .unwrap();

    let config = config::load(&path).unwrap();
    assert_eq!(config.base_url, "https://crawler.internal/api/v1");
    assert_eq!(config.page_size(), 25);
    assert_eq!(config.level_filter(), LevelFilter::Debug);
    assert_eq!(config.log_destination, LogDestination::Both);
    assert_eq!(
        config.api_settings().request_timeout,
        Duration::from_secs(30)
    );
}

#[test]
fn page_size_is_clamped_to_server_limit() {
    let config = AppConfig {
        page_size: 500,
        ..AppConfig::default()
    };
    assert_eq!(config.page_size(), 100);
    let config = AppConfig {
        page_size: 0,
        ..AppConfig::default()
    };
    assert_eq!(config.page_size(), 1);
}

#[test]
fn unknown_log_level_falls_back_to_info() {
    let config = AppConfig {
        log_level: "chatty".to_string(),
        ..AppConfig::default()
    };
    assert_eq!(config.level_filter(), LevelFilter::Info);
}

#[test]
fn malformed_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crawldash.ron");
    fs::write(&path, "(page_size: \"ten\")").unwrap();

    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("crawldash.ron"), "{err}");
}

#[test]
fn saved_configuration_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crawldash.ron");
    let config = AppConfig {
        base_url: "http://10.0.0.5:8000/api/v1".to_string(),
        request_timeout_ms: 5_000,
        log_destination: LogDestination::Terminal,
        ..AppConfig::default()
    };

    config::save(&path, &config).unwrap();
    assert_eq!(config::load(&path).unwrap(), config);
}
