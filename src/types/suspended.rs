use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// What the core remembers about a suspended tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspendedTabEntry {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "favIconUrl", default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
}

impl SuspendedTabEntry {
    pub fn new(url: &str, title: &str, fav_icon_url: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            fav_icon_url: fav_icon_url
                .filter(|icon| !icon.is_empty())
                .map(str::to_string),
        }
    }
}

/// Persisted map of tab id to suspended-tab entry.
///
/// Serializes as a JSON object keyed by the decimal tab id, which is the
/// layout stored under the `suspendedTabs` local key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SuspendedTabs {
    entries: BTreeMap<TabId, SuspendedTabEntry>,
}

impl SuspendedTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tab_id: TabId) -> Option<&SuspendedTabEntry> {
        self.entries.get(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.entries.contains_key(&tab_id)
    }

    pub fn insert(&mut self, tab_id: TabId, entry: SuspendedTabEntry) -> Option<SuspendedTabEntry> {
        self.entries.insert(tab_id, entry)
    }

    pub fn remove(&mut self, tab_id: TabId) -> Option<SuspendedTabEntry> {
        self.entries.remove(&tab_id)
    }

    /// Finds the first entry whose original URL equals `url`.
    pub fn find_by_url(&self, url: &str) -> Option<(TabId, &SuspendedTabEntry)> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.url == url)
            .map(|(id, entry)| (*id, entry))
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TabId, &SuspendedTabEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
