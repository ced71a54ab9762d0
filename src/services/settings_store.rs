// Tabsleep Settings Store
// Reads and writes the suspension policy kept in the synced storage scope.
// Each setting is its own key so the settings UI can patch them independently.

use serde_json::{Map, Value};
use tracing::warn;

use crate::services::storage::{KeyValueStore, KeyValueStoreTrait};
use crate::types::errors::SettingsError;
use crate::types::event::StorageScope;
use crate::types::settings::{
    SettingsPatch, SuspendSettings, MAX_SUSPEND_MINUTES, MIN_SUSPEND_MINUTES, SYNC_SETTINGS_KEYS,
};

/// Trait defining the settings store interface.
pub trait SettingsStoreTrait {
    fn load(&self) -> Result<SuspendSettings, SettingsError>;
    fn set_value(&self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn apply_patch(&self, patch: &SettingsPatch) -> Result<Vec<String>, SettingsError>;
    fn add_whitelisted_domain(&self, domain: &str) -> Result<bool, SettingsError>;
    fn add_whitelisted_url(&self, url: &str) -> Result<bool, SettingsError>;
    fn remove_whitelisted_domain(&self, domain: &str) -> Result<bool, SettingsError>;
    fn remove_whitelisted_url(&self, url: &str) -> Result<bool, SettingsError>;
    fn reset(&self) -> Result<(), SettingsError>;
}

/// Settings store over the synced scope of the key-value store.
#[derive(Clone)]
pub struct SettingsStore {
    store: KeyValueStore,
}

impl SettingsStore {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Merges `updates` into the current settings and checks the result
    /// deserializes and passes range checks.
    fn validate(&self, updates: &Map<String, Value>) -> Result<SuspendSettings, SettingsError> {
        for key in updates.keys() {
            if !SYNC_SETTINGS_KEYS.contains(&key.as_str()) {
                return Err(SettingsError::InvalidKey(key.clone()));
            }
        }

        let current = self.load()?;
        let mut json_value = serde_json::to_value(&current)
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;
        if let Value::Object(map) = &mut json_value {
            for (key, value) in updates {
                map.insert(key.clone(), value.clone());
            }
        }

        let merged: SuspendSettings = serde_json::from_value(json_value)
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;

        if !(MIN_SUSPEND_MINUTES..=MAX_SUSPEND_MINUTES).contains(&merged.suspend_time) {
            return Err(SettingsError::InvalidValue(format!(
                "suspendTime must be between {} and {} minutes, got {}",
                MIN_SUSPEND_MINUTES, MAX_SUSPEND_MINUTES, merged.suspend_time
            )));
        }
        if merged.capture_quality > 100 {
            return Err(SettingsError::InvalidValue(format!(
                "captureQuality must be at most 100, got {}",
                merged.capture_quality
            )));
        }
        Ok(merged)
    }

    fn write(&self, updates: Map<String, Value>) -> Result<(), SettingsError> {
        self.validate(&updates)?;
        self.store.set(StorageScope::Sync, updates)?;
        Ok(())
    }

    fn update_list(
        &self,
        key: &str,
        mutate: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> Result<bool, SettingsError> {
        let settings = self.load()?;
        let mut list = match key {
            "whitelistedDomains" => settings.whitelisted_domains,
            "whitelistedUrls" => settings.whitelisted_urls,
            other => return Err(SettingsError::InvalidKey(other.to_string())),
        };
        if !mutate(&mut list) {
            return Ok(false);
        }
        let mut updates = Map::new();
        updates.insert(key.to_string(), Value::from(list));
        self.write(updates)?;
        Ok(true)
    }
}

impl SettingsStoreTrait for SettingsStore {
    /// Loads settings, falling back to the default for every key that is
    /// missing or holds a value of the wrong type.
    fn load(&self) -> Result<SuspendSettings, SettingsError> {
        let stored = self.store.get(StorageScope::Sync, &SYNC_SETTINGS_KEYS)?;

        if let Ok(settings) = serde_json::from_value::<SuspendSettings>(Value::Object(stored.clone())) {
            return Ok(settings);
        }

        let mut valid = Map::new();
        for (key, value) in stored {
            let mut single = Map::new();
            single.insert(key.clone(), value.clone());
            if serde_json::from_value::<SuspendSettings>(Value::Object(single)).is_ok() {
                valid.insert(key, value);
            } else {
                warn!(key = %key, "Ignoring malformed stored setting");
            }
        }
        serde_json::from_value(Value::Object(valid))
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))
    }

    /// Updates one synced setting by its storage key.
    fn set_value(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let mut updates = Map::new();
        updates.insert(key.to_string(), value);
        self.write(updates)
    }

    /// Writes every `Some` field of the patch. Returns the written keys.
    fn apply_patch(&self, patch: &SettingsPatch) -> Result<Vec<String>, SettingsError> {
        let updates = match serde_json::to_value(patch) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(SettingsError::InvalidValue(e.to_string())),
        };
        let keys: Vec<String> = updates.keys().cloned().collect();
        if keys.is_empty() {
            return Ok(keys);
        }
        self.write(updates)?;
        Ok(keys)
    }

    /// Returns false when the domain was already whitelisted.
    fn add_whitelisted_domain(&self, domain: &str) -> Result<bool, SettingsError> {
        if domain.is_empty() {
            return Err(SettingsError::InvalidValue("empty domain".to_string()));
        }
        self.update_list("whitelistedDomains", |list| {
            if list.iter().any(|d| d == domain) {
                false
            } else {
                list.push(domain.to_string());
                true
            }
        })
    }

    /// Returns false when the URL was already whitelisted.
    fn add_whitelisted_url(&self, url: &str) -> Result<bool, SettingsError> {
        if url.is_empty() {
            return Err(SettingsError::InvalidValue("empty url".to_string()));
        }
        self.update_list("whitelistedUrls", |list| {
            if list.iter().any(|u| u == url) {
                false
            } else {
                list.push(url.to_string());
                true
            }
        })
    }

    fn remove_whitelisted_domain(&self, domain: &str) -> Result<bool, SettingsError> {
        self.update_list("whitelistedDomains", |list| {
            let before = list.len();
            list.retain(|d| d != domain);
            list.len() != before
        })
    }

    fn remove_whitelisted_url(&self, url: &str) -> Result<bool, SettingsError> {
        self.update_list("whitelistedUrls", |list| {
            let before = list.len();
            list.retain(|u| u != url);
            list.len() != before
        })
    }

    /// Removes every synced key so defaults apply again.
    fn reset(&self) -> Result<(), SettingsError> {
        self.store.remove(StorageScope::Sync, &SYNC_SETTINGS_KEYS)?;
        Ok(())
    }
}
