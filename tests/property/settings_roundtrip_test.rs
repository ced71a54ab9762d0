//! Property-based tests for settings persistence.
//!
//! Any valid policy written through the settings store reads back
//! unchanged, and a rejected update never leaves a partial write behind.

use std::sync::Arc;

use proptest::prelude::*;
use tabsleep::database::Database;
use tabsleep::services::settings_store::{SettingsStore, SettingsStoreTrait};
use tabsleep::services::storage::KeyValueStore;
use tabsleep::types::settings::{SettingsPatch, SuspendSettings};

fn store() -> SettingsStore {
    let db = Arc::new(Database::open_in_memory().unwrap());
    SettingsStore::new(KeyValueStore::new(db))
}

fn arb_domain() -> impl Strategy<Value = String> {
    "[a-z]{1,10}\\.(com|org|net|dev)"
}

fn arb_url() -> impl Strategy<Value = String> {
    (prop_oneof![Just("http"), Just("https")], arb_domain(), "[a-z0-9/]{0,20}")
        .prop_map(|(scheme, host, path)| format!("{}://{}/{}", scheme, host, path))
}

fn arb_settings() -> impl Strategy<Value = SuspendSettings> {
    (
        (
            1u32..=1440,
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            prop::collection::vec(arb_domain(), 0..5),
            prop::collection::vec(arb_url(), 0..5),
        ),
        (
            any::<bool>(),
            0u8..=100,
            1u32..4096,
            1u32..4096,
            0u32..=4,
            any::<bool>(),
            0u64..86_400,
        ),
    )
        .prop_map(
            |(
                (
                    suspend_time,
                    is_enabled,
                    ignore_audio,
                    ignore_form_input,
                    ignore_notifications,
                    ignore_pinned,
                    whitelisted_domains,
                    whitelisted_urls,
                ),
                (
                    enable_screenshots,
                    capture_quality,
                    resize_width,
                    resize_height,
                    quarters,
                    auto_discard,
                    rediscard_delay,
                ),
            )| SuspendSettings {
                suspend_time,
                is_enabled,
                ignore_audio,
                ignore_form_input,
                ignore_notifications,
                ignore_pinned,
                whitelisted_domains,
                whitelisted_urls,
                enable_screenshots,
                capture_quality,
                resize_width,
                resize_height,
                resize_quality: f64::from(quarters) / 4.0,
                auto_discard,
                rediscard_delay,
            },
        )
}

fn full_patch(settings: &SuspendSettings) -> SettingsPatch {
    SettingsPatch {
        suspend_time: Some(settings.suspend_time),
        is_enabled: Some(settings.is_enabled),
        ignore_audio: Some(settings.ignore_audio),
        ignore_form_input: Some(settings.ignore_form_input),
        ignore_notifications: Some(settings.ignore_notifications),
        ignore_pinned: Some(settings.ignore_pinned),
        whitelisted_domains: Some(settings.whitelisted_domains.clone()),
        whitelisted_urls: Some(settings.whitelisted_urls.clone()),
        enable_screenshots: Some(settings.enable_screenshots),
        capture_quality: Some(settings.capture_quality),
        resize_width: Some(settings.resize_width),
        resize_height: Some(settings.resize_height),
        resize_quality: Some(settings.resize_quality),
        auto_discard: Some(settings.auto_discard),
        rediscard_delay: Some(settings.rediscard_delay),
    }
}

proptest! {
    #[test]
    fn prop_settings_roundtrip_through_store(settings in arb_settings()) {
        let store = store();
        let written = store.apply_patch(&full_patch(&settings)).unwrap();
        prop_assert_eq!(written.len(), 15);
        prop_assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn prop_out_of_range_suspend_time_leaves_store_untouched(
        settings in arb_settings(),
        bad in prop_oneof![Just(0u32), 1441u32..100_000],
        ignore_audio in any::<bool>(),
    ) {
        let store = store();
        store.apply_patch(&full_patch(&settings)).unwrap();

        let patch = SettingsPatch {
            suspend_time: Some(bad),
            ignore_audio: Some(ignore_audio),
            ..SettingsPatch::default()
        };
        prop_assert!(store.apply_patch(&patch).is_err());
        prop_assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn prop_whitelist_add_is_idempotent(domains in prop::collection::vec(arb_domain(), 1..8)) {
        let store = store();
        for domain in &domains {
            store.add_whitelisted_domain(domain).unwrap();
        }
        for domain in &domains {
            prop_assert!(!store.add_whitelisted_domain(domain).unwrap());
        }

        let stored = store.load().unwrap().whitelisted_domains;
        let mut expected: Vec<String> = Vec::new();
        for domain in domains {
            if !expected.contains(&domain) {
                expected.push(domain);
            }
        }
        prop_assert_eq!(stored, expected);
    }
}
