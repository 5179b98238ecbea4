// Newsroom Settings Engine
// Loads, saves and updates the client configuration.
// The configuration is a JSON file; environment variables override selected keys.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::types::errors::SettingsError;
use crate::types::settings::ClientConfig;

/// Default config file name when `NEWSROOM_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "newsroom.json";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ClientConfig, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_config(&self) -> &ClientConfig;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists the config as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    config: ClientConfig,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path. Otherwise uses
    /// `NEWSROOM_CONFIG`, falling back to `newsroom.json` in the working directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override
            .or_else(|| std::env::var("NEWSROOM_CONFIG").ok().filter(|p| !p.is_empty()))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        Self {
            config_path,
            config: ClientConfig::default(),
        }
    }

    /// Applies `NEWSROOM_API_URL` on top of whatever was loaded from disk.
    fn apply_env_overrides(config: &mut ClientConfig) {
        if let Ok(url) = std::env::var("NEWSROOM_API_URL") {
            if !url.is_empty() {
                debug!(%url, "api_base_url overridden from environment");
                config.api_base_url = url;
            }
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads the config from the JSON file.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    fn load(&mut self) -> Result<ClientConfig, SettingsError> {
        let path = Path::new(&self.config_path);

        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;
            serde_json::from_str(&content).map_err(|e| {
                SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
            })?
        } else {
            debug!(path = %self.config_path, "config file absent, using defaults");
            ClientConfig::default()
        };

        Self::apply_env_overrides(&mut config);
        info!(path = %self.config_path, api = %config.api_base_url, "configuration loaded");
        self.config = config;
        Ok(self.config.clone())
    }

    /// Saves the current config, creating parent directories as needed.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SettingsError::IoError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config(&self) -> &ClientConfig {
        &self.config
    }

    /// Updates one top-level key, validating the value against the config type, then saves.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut json_value = serde_json::to_value(&self.config).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        match json_value.as_object_mut() {
            Some(map) if map.contains_key(key) => {
                map.insert(key.to_string(), value);
            }
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "Key '{}' not found in config",
                    key
                )));
            }
        }

        let updated: ClientConfig = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.config = updated;
        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.config = ClientConfig::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
