//! Unit tests for the synced settings store.

use std::sync::Arc;

use rstest::rstest;
use serde_json::{json, Value};
use tabsleep::database::Database;
use tabsleep::services::settings_store::{SettingsStore, SettingsStoreTrait};
use tabsleep::services::storage::{KeyValueStore, KeyValueStoreTrait};
use tabsleep::types::errors::SettingsError;
use tabsleep::types::event::StorageScope;
use tabsleep::types::settings::{SettingsPatch, SuspendSettings};

fn stores() -> (KeyValueStore, SettingsStore) {
    let kv = KeyValueStore::new(Arc::new(Database::open_in_memory().unwrap()));
    (kv.clone(), SettingsStore::new(kv))
}

#[test]
fn test_load_defaults_when_empty() {
    let (_, settings) = stores();
    let loaded = settings.load().unwrap();
    assert_eq!(loaded, SuspendSettings::default());
    assert_eq!(loaded.suspend_time, 40);
    assert!(loaded.is_enabled);
    assert!(loaded.auto_discard);
    assert_eq!(loaded.rediscard_delay, 30);
    assert_eq!(loaded.capture_quality, 50);
}

#[test]
fn test_set_value_persists_in_sync_scope() {
    let (kv, settings) = stores();
    settings.set_value("suspendTime", json!(5)).unwrap();

    assert_eq!(settings.load().unwrap().suspend_time, 5);
    assert_eq!(kv.get_one(StorageScope::Sync, "suspendTime").unwrap(), Some(json!(5)));
    assert_eq!(kv.get_one(StorageScope::Local, "suspendTime").unwrap(), None);
}

#[test]
fn test_set_value_rejects_unknown_key() {
    let (_, settings) = stores();
    let result = settings.set_value("theme", json!("dark"));
    assert_eq!(result, Err(SettingsError::InvalidKey("theme".to_string())));
}

#[rstest]
#[case("suspendTime", json!(0))]
#[case("suspendTime", json!(1441))]
#[case("suspendTime", json!("forty"))]
#[case("isEnabled", json!("yes"))]
#[case("captureQuality", json!(101))]
#[case("whitelistedDomains", json!("example.com"))]
fn test_set_value_rejects_invalid_values(#[case] key: &str, #[case] value: Value) {
    let (_, settings) = stores();
    let result = settings.set_value(key, value);
    assert!(
        matches!(result, Err(SettingsError::InvalidValue(_))),
        "{} should be rejected, got {:?}",
        key,
        result
    );
    assert_eq!(settings.load().unwrap(), SuspendSettings::default());
}

#[rstest]
#[case(1)]
#[case(40)]
#[case(1440)]
fn test_set_value_accepts_suspend_time_bounds(#[case] minutes: u32) {
    let (_, settings) = stores();
    settings.set_value("suspendTime", json!(minutes)).unwrap();
    assert_eq!(settings.load().unwrap().suspend_time, minutes);
}

#[test]
fn test_apply_patch_writes_only_present_fields() {
    let (kv, settings) = stores();
    let patch = SettingsPatch {
        suspend_time: Some(10),
        ignore_pinned: Some(false),
        ..SettingsPatch::default()
    };

    let mut keys = settings.apply_patch(&patch).unwrap();
    keys.sort();
    assert_eq!(keys, vec!["ignorePinned", "suspendTime"]);
    assert_eq!(kv.get_all(StorageScope::Sync).unwrap().len(), 2);

    let loaded = settings.load().unwrap();
    assert_eq!(loaded.suspend_time, 10);
    assert!(!loaded.ignore_pinned);
    assert!(loaded.ignore_audio);
}

#[test]
fn test_apply_empty_patch_is_noop() {
    let (kv, settings) = stores();
    assert!(settings.apply_patch(&SettingsPatch::default()).unwrap().is_empty());
    assert!(kv.get_all(StorageScope::Sync).unwrap().is_empty());
}

#[test]
fn test_apply_patch_is_all_or_nothing() {
    let (_, settings) = stores();
    let patch = SettingsPatch {
        suspend_time: Some(5000),
        ignore_audio: Some(false),
        ..SettingsPatch::default()
    };
    assert!(settings.apply_patch(&patch).is_err());
    assert!(settings.load().unwrap().ignore_audio);
}

#[test]
fn test_whitelist_domain_add_and_duplicate() {
    let (_, settings) = stores();
    assert!(settings.add_whitelisted_domain("example.com").unwrap());
    assert!(!settings.add_whitelisted_domain("example.com").unwrap());
    assert_eq!(
        settings.load().unwrap().whitelisted_domains,
        vec!["example.com".to_string()]
    );
}

#[test]
fn test_whitelist_url_add_and_remove() {
    let (_, settings) = stores();
    assert!(settings.add_whitelisted_url("https://a.com/page").unwrap());
    assert!(settings.remove_whitelisted_url("https://a.com/page").unwrap());
    assert!(!settings.remove_whitelisted_url("https://a.com/page").unwrap());
    assert!(settings.load().unwrap().whitelisted_urls.is_empty());
}

#[test]
fn test_whitelist_rejects_empty_entries() {
    let (_, settings) = stores();
    assert!(settings.add_whitelisted_domain("").is_err());
    assert!(settings.add_whitelisted_url("").is_err());
}

#[test]
fn test_remove_domain_keeps_others() {
    let (_, settings) = stores();
    settings.add_whitelisted_domain("a.com").unwrap();
    settings.add_whitelisted_domain("b.com").unwrap();
    assert!(settings.remove_whitelisted_domain("a.com").unwrap());
    assert_eq!(settings.load().unwrap().whitelisted_domains, vec!["b.com".to_string()]);
}

#[test]
fn test_load_tolerates_malformed_key() {
    let (kv, settings) = stores();
    kv.set_typed(StorageScope::Sync, "rediscardDelay", &"later").unwrap();
    kv.set_typed(StorageScope::Sync, "autoDiscard", &false).unwrap();

    let loaded = settings.load().unwrap();
    assert_eq!(loaded.rediscard_delay, 30);
    assert!(!loaded.auto_discard);
}

#[test]
fn test_reset_restores_defaults() {
    let (_, settings) = stores();
    settings.set_value("isEnabled", json!(false)).unwrap();
    settings.add_whitelisted_domain("a.com").unwrap();
    settings.reset().unwrap();
    assert_eq!(settings.load().unwrap(), SuspendSettings::default());
}
