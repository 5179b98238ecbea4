//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, and reset behavior.

use newsroom::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use newsroom::types::errors::SettingsError;
use newsroom::types::settings::ClientConfig;
use serde_json::json;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("config")
        .join("newsroom.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let config = engine.load().unwrap();
    assert_eq!(config.request_timeout_secs, ClientConfig::default().request_timeout_secs);
    assert_eq!(config.database_path, None);
}

#[test]
fn test_set_value_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine.set_value("request_timeout_secs", json!(30)).unwrap();
    engine.set_value("database_path", json!("/var/lib/newsroom/app.db")).unwrap();

    let mut reloaded = engine_in_temp(&dir);
    let config = reloaded.load().unwrap();
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.database_path.as_deref(), Some("/var/lib/newsroom/app.db"));
}

#[test]
fn test_set_value_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let err = engine.set_value("theme", json!("dark")).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidKey(_)));
    let err = engine.set_value("", json!(1)).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidKey(_)));
}

#[test]
fn test_set_value_rejects_wrong_type() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let err = engine.set_value("request_timeout_secs", json!("soon")).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidValue(_)));
    assert_eq!(engine.get_config().request_timeout_secs, 10, "config unchanged on error");
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in_temp(&dir);
    let path = engine.get_config_path().to_string();
    std::fs::create_dir_all(std::path::Path::new(&path).parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let mut engine = SettingsEngine::new(Some(path));
    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{"request_timeout_secs": 3}"#).unwrap();

    let mut engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));
    let config = engine.load().unwrap();
    assert_eq!(config.request_timeout_secs, 3);
    assert_eq!(config.log_filter, "info");
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.set_value("log_filter", json!("debug")).unwrap();
    engine.reset().unwrap();
    assert_eq!(engine.get_config().log_filter, "info");

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap().log_filter, "info");
}
