//! Persistence of the suspended-tab map under the `suspendedTabs` local key.

use serde_json::Value;
use tracing::warn;

use crate::services::storage::KeyValueStore;
use crate::types::errors::StorageError;
use crate::types::event::StorageScope;
use crate::types::suspended::{SuspendedTabEntry, SuspendedTabs};
use crate::types::tab::TabId;

pub const SUSPENDED_TABS_KEY: &str = "suspendedTabs";

#[derive(Clone)]
pub struct TabStateStore {
    store: KeyValueStore,
}

impl TabStateStore {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Loads the map. Entries with a non-numeric id or without a URL are
    /// dropped instead of failing the whole load.
    pub fn load(&self) -> Result<SuspendedTabs, StorageError> {
        let mut tabs = SuspendedTabs::new();
        let Some(Value::Object(raw)) = self.store.get_one(StorageScope::Local, SUSPENDED_TABS_KEY)?
        else {
            return Ok(tabs);
        };

        for (key, value) in raw {
            let Ok(tab_id) = key.parse::<TabId>() else {
                warn!(key = %key, "Dropping suspended entry with invalid tab id");
                continue;
            };
            match serde_json::from_value::<SuspendedTabEntry>(value) {
                Ok(entry) if !entry.url.is_empty() => {
                    tabs.insert(tab_id, entry);
                }
                _ => warn!(tab_id, "Dropping suspended entry without a URL"),
            }
        }
        Ok(tabs)
    }

    pub fn save(&self, tabs: &SuspendedTabs) -> Result<(), StorageError> {
        self.store.set_typed(StorageScope::Local, SUSPENDED_TABS_KEY, tabs)
    }
}
