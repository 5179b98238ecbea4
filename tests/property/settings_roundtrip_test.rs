//! Property-based tests for client configuration persistence.
//!
//! Any configuration written through the settings engine loads back unchanged.

use newsroom::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use newsroom::types::settings::ClientConfig;
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn arb_config() -> impl Strategy<Value = ClientConfig> {
    (
        "https?://[a-z]{3,10}(\\.[a-z]{2,3})?(:[0-9]{2,4})?",
        1u64..600,
        proptest::option::of("/[a-z]{1,8}/[a-z]{1,8}\\.db"),
        prop_oneof![Just("info"), Just("debug"), Just("warn"), Just("newsroom=trace")],
    )
        .prop_map(|(api_base_url, request_timeout_secs, database_path, log_filter)| ClientConfig {
            api_base_url,
            request_timeout_secs,
            database_path,
            log_filter: log_filter.to_string(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn config_json_roundtrip(config in arb_config()) {
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, config);
    }

    #[test]
    fn config_persists_through_set_value(config in arb_config()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("newsroom.json").to_string_lossy().to_string();

        let mut engine = SettingsEngine::new(Some(path.clone()));
        engine.set_value("request_timeout_secs", json!(config.request_timeout_secs)).unwrap();
        engine.set_value("database_path", json!(config.database_path)).unwrap();
        engine.set_value("log_filter", json!(config.log_filter)).unwrap();

        let mut reloaded = SettingsEngine::new(Some(path));
        let loaded = reloaded.load().unwrap();
        prop_assert_eq!(loaded.request_timeout_secs, config.request_timeout_secs);
        prop_assert_eq!(loaded.database_path, config.database_path);
        prop_assert_eq!(loaded.log_filter, config.log_filter);
    }
}
