use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default REST endpoint of the bookmark/auth server.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Client configuration persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// SQLite file holding the session, guest bookmarks and pending queue.
    /// `None` resolves to `newsroom.db` under the data directory.
    pub database_path: Option<String>,
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 10,
            database_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Resolves the database file, preferring the explicit setting, then
    /// `NEWSROOM_DATA_DIR`, then the working directory.
    pub fn resolved_database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return PathBuf::from(path);
        }
        match std::env::var("NEWSROOM_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("newsroom.db"),
            _ => PathBuf::from("newsroom.db"),
        }
    }
}
