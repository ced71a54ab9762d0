//! Migration of legacy storage and reconciliation of suspended-tab state
//! against the tabs that are actually open.
//!
//! After an update the extension id (and with it the placeholder URL) may
//! change; after a browser restart tab ids are renumbered. Both leave the
//! persisted map out of step with the tab strip, and the placeholder URLs
//! themselves are the only reliable source to rebuild it from.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::context::CoreContext;
use crate::host::BrowserHost;
use crate::services::image_store::{ImageSlot, ImageStore};
use crate::services::placeholder::{PlaceholderPage, PlaceholderParams};
use crate::services::storage::{KeyValueStore, KeyValueStoreTrait};
use crate::services::tab_state::{TabStateStore, SUSPENDED_TABS_KEY};
use crate::types::errors::StorageError;
use crate::types::event::StorageScope;
use crate::types::settings::LEGACY_LOCAL_SETTINGS_KEYS;
use crate::types::suspended::{SuspendedTabEntry, SuspendedTabs};
use crate::types::tab::{TabId, TabInfo, TabQuery};

/// What a migration run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub settings_moved: usize,
    pub entries_kept: usize,
    pub entries_dropped: usize,
    pub thumbnails_split: usize,
}

/// What a startup reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Placeholder tabs whose entry was rebuilt from the URL.
    pub rebuilt: usize,
    /// Tabs showing an entry's original URL that got the placeholder back.
    pub rerendered: usize,
    /// Entries moved from a vanished tab id onto an open tab.
    pub rekeyed: usize,
    pub purged: usize,
}

pub struct RecoveryManager {
    host: Arc<dyn BrowserHost>,
    store: KeyValueStore,
    state: TabStateStore,
    images: ImageStore,
    placeholder: PlaceholderPage,
}

impl RecoveryManager {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        store: KeyValueStore,
        state: TabStateStore,
        images: ImageStore,
        placeholder: PlaceholderPage,
    ) -> Self {
        Self {
            host,
            store,
            state,
            images,
            placeholder,
        }
    }

    /// Moves settings out of the local scope and splits thumbnails out of
    /// the legacy suspended-tabs blob.
    pub fn run_migration(&self) -> Result<MigrationReport, StorageError> {
        let mut report = MigrationReport::default();

        let legacy = self.store.get(StorageScope::Local, &LEGACY_LOCAL_SETTINGS_KEYS)?;
        if !legacy.is_empty() {
            report.settings_moved = legacy.len();
            let keys: Vec<String> = legacy.keys().cloned().collect();
            self.store.set(StorageScope::Sync, legacy)?;
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            self.store.remove(StorageScope::Local, &keys)?;
            info!(count = report.settings_moved, "Moved legacy settings to sync storage");
        }

        let Some(Value::Object(raw)) = self.store.get_one(StorageScope::Local, SUSPENDED_TABS_KEY)?
        else {
            return Ok(report);
        };

        let mut migrated = Map::new();
        let mut changed = false;
        for (key, value) in raw {
            let Ok(tab_id) = key.parse::<TabId>() else {
                warn!(key = %key, "Dropping legacy suspended entry with invalid tab id");
                report.entries_dropped += 1;
                continue;
            };
            let Some(entry) = legacy_entry(&value) else {
                warn!(tab_id, "Dropping legacy suspended entry without a URL");
                report.entries_dropped += 1;
                continue;
            };

            if let Some(thumbnail) = value.get("thumbnail").and_then(Value::as_str) {
                match self.images.put(ImageSlot::Thumbnail, tab_id, thumbnail) {
                    Ok(()) => report.thumbnails_split += 1,
                    Err(e) => warn!(tab_id, error = %e, "Dropping unreadable legacy thumbnail"),
                }
            }

            let entry = serde_json::to_value(&entry)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            changed |= entry != value;
            migrated.insert(key, entry);
            report.entries_kept += 1;
        }

        if changed || report.entries_dropped > 0 {
            let mut items = Map::new();
            items.insert(SUSPENDED_TABS_KEY.to_string(), Value::Object(migrated));
            self.store.set(StorageScope::Local, items)?;
            info!(
                kept = report.entries_kept,
                dropped = report.entries_dropped,
                thumbnails = report.thumbnails_split,
                "Migrated legacy suspended tabs"
            );
        }
        Ok(report)
    }

    /// Rebuilds entries from every open placeholder tab, whatever extension
    /// id it was created under, and points each one at this installation's
    /// placeholder URL. Returns the number of tabs recovered.
    pub async fn recover_open_tabs(&self, ctx: &mut CoreContext) -> usize {
        let tabs = match self.host.query_tabs(TabQuery::all()).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Tab query failed, skipping recovery");
                return 0;
            }
        };

        let mut recovered = 0;
        for tab in &tabs {
            let Some(params) = self.placeholder.parse_any(&tab.url) else {
                continue;
            };
            ctx.suspended.insert(tab.id, params.to_entry());
            self.rewrite_to_current(tab, &params).await;
            recovered += 1;
        }

        if recovered > 0 {
            self.persist(ctx);
            info!(recovered, "Recovered suspended tabs from open placeholders");
        }
        recovered
    }

    /// Repairs the map against the open tabs so that every entry's tab
    /// shows a placeholder encoding that entry.
    pub async fn reconcile(&self, ctx: &mut CoreContext, tabs: &[TabInfo]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut repaired = SuspendedTabs::new();
        let open: HashSet<TabId> = tabs.iter().map(|t| t.id).collect();

        for tab in tabs {
            if let Some(params) = self.placeholder.parse_any(&tab.url) {
                if ctx.suspended.get(tab.id) != Some(&params.to_entry()) {
                    report.rebuilt += 1;
                }
                repaired.insert(tab.id, params.to_entry());
                self.rewrite_to_current(tab, &params).await;
            }
        }

        for (tab_id, entry) in ctx.suspended.iter() {
            if repaired.contains(tab_id) {
                continue;
            }

            let target = if open.contains(&tab_id) {
                tabs.iter().find(|t| t.id == tab_id && t.url == entry.url)
            } else {
                tabs.iter().find(|t| {
                    t.url == entry.url
                        && !repaired.contains(t.id)
                        && !ctx.suspended.contains(t.id)
                })
            };

            let Some(tab) = target else {
                debug!(tab_id, "Purging stale suspended entry");
                self.drop_images(tab_id);
                report.purged += 1;
                continue;
            };

            let url = self.placeholder.build(tab.id, entry, false);
            if let Err(e) = self.host.update_tab_url(tab.id, &url).await {
                warn!(tab_id = tab.id, error = %e, "Failed to restore placeholder, purging entry");
                self.drop_images(tab_id);
                report.purged += 1;
                continue;
            }
            if tab.id == tab_id {
                report.rerendered += 1;
            } else {
                // The re-rendered placeholder carries no capture flag.
                debug!(from = tab_id, to = tab.id, "Re-keyed suspended entry");
                self.drop_images(tab_id);
                report.rekeyed += 1;
            }
            repaired.insert(tab.id, entry.clone());
        }

        let changed = repaired != ctx.suspended;
        ctx.suspended = repaired;
        if changed {
            self.persist(ctx);
        }
        if report != ReconcileReport::default() {
            info!(?report, "Reconciled suspended tabs");
        }
        report
    }

    fn drop_images(&self, tab_id: TabId) {
        if let Err(e) = self.images.remove_for_tab(tab_id) {
            warn!(tab_id, error = %e, "Failed to delete images of stale entry");
        }
    }

    /// Loads the persisted map, falling back to an empty one.
    pub fn load_suspended(&self) -> SuspendedTabs {
        self.state.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load suspended tabs");
            SuspendedTabs::new()
        })
    }

    async fn rewrite_to_current(&self, tab: &TabInfo, params: &PlaceholderParams) {
        let has_capture = params.has_capture
            && matches!(self.images.get(ImageSlot::TempImage, tab.id), Ok(Some(_)));
        let url = self.placeholder.build(tab.id, &params.to_entry(), has_capture);
        if url == tab.url {
            return;
        }
        if let Err(e) = self.host.update_tab_url(tab.id, &url).await {
            warn!(tab_id = tab.id, error = %e, "Failed to rewrite placeholder URL");
        }
    }

    fn persist(&self, ctx: &CoreContext) {
        if let Err(e) = self.state.save(&ctx.suspended) {
            warn!(error = %e, "Failed to persist suspended tabs");
        }
    }
}

/// Reads a legacy entry, which may carry an inline `thumbnail` and use
/// `favicon` instead of `favIconUrl`.
fn legacy_entry(value: &Value) -> Option<SuspendedTabEntry> {
    let url = value.get("url").and_then(Value::as_str).filter(|u| !u.is_empty())?;
    let title = value.get("title").and_then(Value::as_str).unwrap_or("");
    let icon = value
        .get("favIconUrl")
        .or_else(|| value.get("favicon"))
        .and_then(Value::as_str);
    Some(SuspendedTabEntry::new(url, title, icon))
}
