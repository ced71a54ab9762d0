// Tabsleep runtime configuration
// Host-level knobs that are not user settings: where state lives, how often
// the event loop ticks, how long a page probe may take.
// Stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform;
use crate::types::errors::ConfigError;

/// Runtime configuration of the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file holding storage scopes, alarms and images.
    pub database_path: PathBuf,
    /// Extension page rendered in place of suspended tabs.
    pub placeholder_page: String,
    /// Base URL of the installed extension, e.g. `chrome-extension://<id>/`.
    pub extension_base_url: String,
    /// How often due triggers are checked.
    pub tick_interval_ms: u64,
    /// Upper bound for a page-context probe before it counts as failed.
    pub probe_timeout_ms: u64,
    /// Smallest delay the durable alarm service can represent.
    pub min_alarm_delay_ms: i64,
    /// Pause between rewriting a tab to the placeholder and discarding it.
    pub auto_discard_delay_ms: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: platform::get_data_dir().join("tabsleep.db"),
            placeholder_page: "suspended.html".to_string(),
            extension_base_url: "chrome-extension://tabsleep/".to_string(),
            tick_interval_ms: 1000,
            probe_timeout_ms: 2000,
            min_alarm_delay_ms: 30_000,
            auto_discard_delay_ms: 1500,
        }
    }
}

impl CoreConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        platform::get_config_dir().join("config.json")
    }

    /// Loads the config file. A missing file yields the defaults; a
    /// malformed one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Writes the config file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))
    }

    /// Full URL of the placeholder page for this installation.
    pub fn placeholder_url(&self) -> String {
        let base = self.extension_base_url.trim_end_matches('/');
        format!("{}/{}", base, self.placeholder_page)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
