//! End-to-end tests of the event router against the simulated browser:
//! lifecycle scenarios, messages, commands, install and restart.

use std::sync::Arc;

use serde_json::{json, Value};
use tabsleep::context::Clock;
use tabsleep::database::Database;
use tabsleep::host::{PageState, SimulatedBrowser};
use tabsleep::router::{EventRouter, DARK_MODE_KEY};
use tabsleep::services::config::CoreConfig;
use tabsleep::services::placeholder::PlaceholderPage;
use tabsleep::services::settings_store::{SettingsStore, SettingsStoreTrait};
use tabsleep::services::storage::{KeyValueStore, KeyValueStoreTrait};
use tabsleep::services::tab_state::TabStateStore;
use tabsleep::types::event::{BrowserEvent, StorageScope};
use tabsleep::types::message::{InstallReason, MessageSender, OutboundMessage};
use tabsleep::types::suspended::SuspendedTabEntry;
use tabsleep::types::tab::{MenuItem, TabId};
use tabsleep::types::trigger::Trigger;

const START: i64 = 1_700_000_000_000;
const SECOND_MS: i64 = 1000;
const MINUTE_MS: i64 = 60_000;

struct Harness {
    config: CoreConfig,
    browser: Arc<SimulatedBrowser>,
    clock: Clock,
    db: Arc<Database>,
    router: EventRouter,
    /// Active tab of the focused window.
    a: TabId,
    /// Background tab in the same window.
    b: TabId,
}

fn build() -> Harness {
    let config = CoreConfig::default();
    let browser = Arc::new(SimulatedBrowser::new(&config.extension_base_url));
    let clock = Clock::manual(START);
    let db = Arc::new(Database::open_in_memory().unwrap());
    let window = browser.open_window(true);
    let a = browser.open_tab(window, "https://a.example.com/", "A");
    let b = browser.open_tab(window, "https://b.example.com/", "B");
    let router = EventRouter::new(&config, db.clone(), browser.clone(), clock.clone());
    Harness {
        config,
        browser,
        clock,
        db,
        router,
        a,
        b,
    }
}

async fn started() -> Harness {
    let mut h = build();
    h.router.handle(BrowserEvent::Startup).await;
    h
}

impl Harness {
    async fn send(&mut self, message: Value) {
        self.send_from(message, MessageSender::extension()).await;
    }

    async fn send_from(&mut self, message: Value, sender: MessageSender) {
        self.router
            .handle(BrowserEvent::Message { message, sender })
            .await;
    }

    async fn command(&mut self, name: &str) {
        self.router
            .handle(BrowserEvent::Command {
                name: name.to_string(),
            })
            .await;
    }

    /// The user switches to a tab.
    async fn activate(&mut self, tab_id: TabId) {
        self.browser.activate(tab_id);
        let window_id = self.browser.tab(tab_id).unwrap().window_id;
        self.router
            .handle(BrowserEvent::TabActivated { tab_id, window_id })
            .await;
    }

    /// A tab finished loading its current URL.
    async fn loaded(&mut self, tab_id: TabId) {
        let tab = self.browser.tab(tab_id).unwrap();
        self.router
            .handle(BrowserEvent::TabUpdated {
                tab_id,
                complete: true,
                tab,
            })
            .await;
    }

    async fn advance(&mut self, ms: i64) -> usize {
        self.clock.advance(ms);
        self.router.tick().await
    }

    fn url(&self, tab_id: TabId) -> String {
        self.browser.tab(tab_id).unwrap().url
    }

    fn is_suspended(&self, tab_id: TabId) -> bool {
        self.router.placeholder().is_placeholder(&self.url(tab_id))
    }

    fn deadline(&self, tab_id: TabId) -> Option<i64> {
        self.router.scheduler().suspend_deadline(tab_id).unwrap()
    }

    fn notification_titles(&self) -> Vec<String> {
        self.browser
            .notifications()
            .into_iter()
            .map(|n| n.title)
            .collect()
    }

    fn store(&self) -> KeyValueStore {
        KeyValueStore::new(self.db.clone())
    }
}

// ---- lifecycle scenarios ----

#[tokio::test]
async fn test_idle_tab_suspended_after_one_minute_then_discarded() {
    let mut h = started().await;
    h.send(json!({"action": "updateSuspendTime", "minutes": 1})).await;
    assert_eq!(h.deadline(h.b), Some(START + MINUTE_MS));
    assert_eq!(h.deadline(h.a), None);

    assert_eq!(h.advance(59 * SECOND_MS).await, 0);
    assert!(!h.is_suspended(h.b));

    assert_eq!(h.advance(SECOND_MS).await, 1);
    assert!(h.is_suspended(h.b));
    assert!(!h.is_suspended(h.a));
    let entry = h.router.context().suspended.get(h.b).unwrap();
    assert_eq!(entry.url, "https://b.example.com/");

    h.advance(1500).await;
    assert_eq!(h.browser.discarded(), vec![h.b]);
}

#[tokio::test]
async fn test_pinned_tab_survives_its_trigger() {
    let mut h = started().await;
    h.browser.set_pinned(h.b, true);

    assert_eq!(h.advance(41 * MINUTE_MS).await, 1);

    assert_eq!(h.url(h.b), "https://b.example.com/");
    assert!(h.router.context().suspended.is_empty());
}

#[tokio::test]
async fn test_tab_with_unsaved_form_survives_its_trigger() {
    let mut h = started().await;
    h.browser.set_page_state(
        h.b,
        PageState {
            form_dirty: true,
            ..PageState::default()
        },
    );

    h.advance(41 * MINUTE_MS).await;

    assert!(!h.is_suspended(h.b));
}

#[tokio::test]
async fn test_shorter_suspend_time_rearms_existing_trigger() {
    let mut h = started().await;
    assert_eq!(h.deadline(h.b), Some(START + 40 * MINUTE_MS));

    h.clock.advance(MINUTE_MS);
    h.send(json!({"action": "updateSuspendTime", "minutes": 5})).await;
    assert_eq!(h.router.context().settings.suspend_time, 5);
    assert_eq!(h.deadline(h.b), Some(START + 6 * MINUTE_MS));

    assert_eq!(h.advance(5 * MINUTE_MS - SECOND_MS).await, 0);
    assert_eq!(h.advance(SECOND_MS).await, 1);
    assert!(h.is_suspended(h.b));
}

#[tokio::test]
async fn test_activation_moves_the_trigger_to_the_previous_tab() {
    let mut h = started().await;
    h.clock.advance(5 * MINUTE_MS);

    h.activate(h.b).await;

    assert_eq!(h.router.context().active_tab, Some(h.b));
    assert_eq!(h.deadline(h.b), None);
    assert_eq!(h.deadline(h.a), Some(START + 45 * MINUTE_MS));
}

#[tokio::test]
async fn test_suspended_tab_rediscarded_after_losing_focus() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.activate(h.b).await;
    h.activate(h.a).await;

    assert_eq!(h.advance(29 * SECOND_MS).await, 0);
    assert!(h.browser.discarded().is_empty());
    assert_eq!(h.advance(SECOND_MS).await, 1);
    assert_eq!(h.browser.discarded(), vec![h.b]);
}

#[tokio::test]
async fn test_closing_a_suspended_tab_forgets_it() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.browser.close_tab(h.b);
    h.router
        .handle(BrowserEvent::TabRemoved { tab_id: h.b })
        .await;

    assert!(h.router.context().suspended.is_empty());
    assert!(TabStateStore::new(h.store()).load().unwrap().is_empty());
    assert_eq!(h.advance(2 * SECOND_MS).await, 0);
}

#[tokio::test]
async fn test_placeholder_restored_when_tab_reloads_original_url() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.browser.navigate(h.b, "https://b.example.com/", "B");
    h.loaded(h.b).await;

    assert!(h.is_suspended(h.b));
    assert!(h.router.context().suspended.contains(h.b));
    assert_eq!(h.deadline(h.b), None);
}

#[tokio::test]
async fn test_navigating_away_from_placeholder_drops_entry() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.browser.navigate(h.b, "https://elsewhere.example.com/", "Elsewhere");
    h.loaded(h.b).await;

    assert!(!h.router.context().suspended.contains(h.b));
    assert!(h.deadline(h.b).is_some());
}

#[tokio::test]
async fn test_resume_message_from_placeholder() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.send_from(
        json!({"action": "resumeTab", "origUrl": "https://b.example.com/"}),
        MessageSender::tab(h.b),
    )
    .await;

    assert_eq!(h.url(h.b), "https://b.example.com/");
    assert!(h.router.context().suspended.is_empty());
    assert_eq!(h.advance(2 * SECOND_MS).await, 0);
}

#[tokio::test]
async fn test_resume_message_without_sender_tab_is_ignored() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.send(json!({"action": "resumeTab", "origUrl": "https://b.example.com/"}))
        .await;

    assert!(h.is_suspended(h.b));
}

#[tokio::test]
async fn test_alarm_fired_event_suspends_immediately() {
    let mut h = started().await;

    h.router
        .handle(BrowserEvent::AlarmFired {
            name: Trigger::suspend(h.b).alarm_name(),
        })
        .await;
    h.router
        .handle(BrowserEvent::AlarmFired {
            name: "mystery".to_string(),
        })
        .await;

    assert!(h.is_suspended(h.b));
    assert_eq!(h.deadline(h.b), None);
}

#[tokio::test]
async fn test_window_focus_change_activates_its_tab() {
    let mut h = started().await;
    let window = h.browser.open_window(false);
    let c = h.browser.open_tab(window, "https://c.example.com/", "C");

    h.browser.focus_window(window);
    h.router
        .handle(BrowserEvent::WindowFocusChanged {
            window_id: Some(window),
        })
        .await;
    assert_eq!(h.router.context().active_tab, Some(c));
    assert!(h.deadline(h.a).is_some());

    h.router
        .handle(BrowserEvent::WindowFocusChanged { window_id: None })
        .await;
    assert_eq!(h.router.context().active_tab, Some(c));
}

// ---- settings ----

#[tokio::test]
async fn test_enable_toggle_clears_and_rearms_triggers() {
    let mut h = started().await;
    assert_eq!(h.router.scheduler().tracked_tabs().unwrap(), vec![h.b]);

    h.send(json!({"action": "updateEnabled", "isEnabled": false})).await;
    assert!(!h.router.context().settings.is_enabled);
    assert!(h.router.scheduler().tracked_tabs().unwrap().is_empty());
    assert_eq!(h.advance(41 * MINUTE_MS).await, 0);
    assert!(!h.is_suspended(h.b));

    h.send(json!({"action": "updateEnabled", "isEnabled": true})).await;
    assert_eq!(h.deadline(h.b), Some(START + 81 * MINUTE_MS));
}

#[tokio::test]
async fn test_settings_patch_message() {
    let mut h = started().await;

    h.send(json!({
        "action": "updateSettings",
        "settings": {"ignorePinned": false, "whitelistedDomains": ["b.example.com"]}
    }))
    .await;

    let settings = &h.router.context().settings;
    assert!(!settings.ignore_pinned);
    assert_eq!(settings.whitelisted_domains, vec!["b.example.com".to_string()]);

    h.advance(41 * MINUTE_MS).await;
    assert!(!h.is_suspended(h.b));
}

#[tokio::test]
async fn test_sync_storage_change_reloads_settings() {
    let mut h = started().await;
    let settings = SettingsStore::new(h.store());

    settings.set_value("suspendTime", json!(5)).unwrap();
    h.router
        .handle(BrowserEvent::StorageChanged {
            scope: StorageScope::Sync,
            keys: vec!["suspendTime".to_string()],
        })
        .await;
    assert_eq!(h.router.context().settings.suspend_time, 5);
    assert_eq!(h.deadline(h.b), Some(START + 5 * MINUTE_MS));

    settings.set_value("suspendTime", json!(7)).unwrap();
    h.router
        .handle(BrowserEvent::StorageChanged {
            scope: StorageScope::Local,
            keys: vec!["suspendTime".to_string()],
        })
        .await;
    h.router
        .handle(BrowserEvent::StorageChanged {
            scope: StorageScope::Sync,
            keys: vec!["darkMode".to_string()],
        })
        .await;
    assert_eq!(h.router.context().settings.suspend_time, 5);
}

#[tokio::test]
async fn test_malformed_messages_are_rejected_without_side_effects() {
    let mut h = started().await;

    h.send(json!({"action": "resumeTab"})).await;
    h.send(json!({"origUrl": "https://b.example.com/"})).await;
    h.send(json!({"action": "selfDestruct"})).await;
    h.send(json!({"action": "updateSuspendTime", "minutes": 0})).await;
    h.send(json!({"action": "updateSuspendTime", "minutes": "ten"})).await;
    h.send(json!("not an object")).await;

    assert_eq!(h.router.context().settings.suspend_time, 40);
    assert!(h.browser.url_updates().is_empty());

    h.send(json!({"action": "updateSuspendTime", "minutes": 5})).await;
    assert_eq!(h.router.context().settings.suspend_time, 5);
}

#[tokio::test]
async fn test_theme_update_reaches_placeholder_tabs_only() {
    let mut h = started().await;
    assert!(h.router.suspend_tab(h.b, false).await);

    h.send(json!({"action": "updateTheme", "isDark": true})).await;

    assert_eq!(
        h.browser.sent_messages(),
        vec![(h.b, OutboundMessage::UpdateTheme { is_dark: true })]
    );
    assert_eq!(
        h.store().get_one(StorageScope::Local, DARK_MODE_KEY).unwrap(),
        Some(json!(true))
    );
}

// ---- force suspend and resume ----

#[tokio::test]
async fn test_force_suspend_message_bypasses_protection() {
    let mut h = started().await;
    h.browser.set_pinned(h.b, true);

    h.send(json!({"action": "suspendTab", "tabId": h.b})).await;

    assert!(h.is_suspended(h.b));
    assert!(h.browser.notifications().is_empty());

    h.send(json!({"action": "unsuspendTab", "tabId": h.b})).await;
    assert_eq!(h.url(h.b), "https://b.example.com/");
}

#[tokio::test]
async fn test_force_suspend_message_defaults_to_current_tab() {
    let mut h = started().await;

    h.send(json!({"action": "suspendTab"})).await;

    assert!(h.is_suspended(h.a));
    assert!(!h.is_suspended(h.b));
}

#[tokio::test]
async fn test_suspend_and_unsuspend_commands_notify() {
    let mut h = started().await;

    h.command("suspend-current-tab").await;
    assert!(h.is_suspended(h.a));

    h.command("unsuspend-current-tab").await;
    assert_eq!(h.url(h.a), "https://a.example.com/");

    h.command("unsuspend-current-tab").await;
    let notifications = h.browser.notifications();
    assert_eq!(
        h.notification_titles(),
        vec!["Tab suspended", "Tab restored", "Tab not suspended"]
    );
    assert_eq!(notifications[2].message, "This tab is not suspended.");
}

#[tokio::test]
async fn test_unknown_command_is_ignored() {
    let mut h = started().await;
    h.command("do-a-barrel-roll").await;
    assert!(h.browser.notifications().is_empty());
}

// ---- whitelisting ----

#[tokio::test]
async fn test_whitelist_domain_command_is_idempotent() {
    let mut h = started().await;

    h.command("whitelist-current-domain").await;
    h.command("whitelist-current-domain").await;

    assert_eq!(
        h.router.context().settings.whitelisted_domains,
        vec!["a.example.com".to_string()]
    );
    assert_eq!(
        h.store().get_one(StorageScope::Sync, "whitelistedDomains").unwrap(),
        Some(json!(["a.example.com"]))
    );
    assert_eq!(
        h.notification_titles(),
        vec!["Domain whitelisted", "Already whitelisted"]
    );
    let notifications = h.browser.notifications();
    assert_ne!(notifications[0].id, notifications[1].id);
}

#[tokio::test]
async fn test_whitelist_domain_of_internal_page_fails_with_notice() {
    let mut h = started().await;
    let window = h.browser.open_window(true);
    h.browser.open_tab(window, "chrome://settings", "Settings");

    h.command("whitelist-current-domain").await;

    assert_eq!(h.notification_titles(), vec!["Cannot whitelist"]);
    assert!(h.router.context().settings.whitelisted_domains.is_empty());
}

#[tokio::test]
async fn test_context_menu_whitelists_page_and_suspends() {
    let mut h = started().await;
    let b = h.browser.tab(h.b).unwrap();

    h.router
        .handle(BrowserEvent::ContextMenuClicked {
            menu_item_id: MenuItem::WhitelistUrl.id().to_string(),
            tab: b.clone(),
        })
        .await;
    assert_eq!(
        h.router.context().settings.whitelisted_urls,
        vec!["https://b.example.com/".to_string()]
    );
    h.advance(41 * MINUTE_MS).await;
    assert!(!h.is_suspended(h.b));

    h.router
        .handle(BrowserEvent::ContextMenuClicked {
            menu_item_id: MenuItem::SuspendPage.id().to_string(),
            tab: b,
        })
        .await;
    assert!(h.is_suspended(h.b));
    assert_eq!(
        h.notification_titles(),
        vec!["Page whitelisted", "Tab suspended"]
    );
}

// ---- install and restart ----

#[tokio::test]
async fn test_install_migrates_and_recovers_placeholders() {
    let mut h = build();
    let stale = PlaceholderPage::new("chrome-extension://previous-id/suspended.html");
    let entry = SuspendedTabEntry::new("https://c.example.com/", "C", None);
    let c = h.browser.open_tab(1, &stale.build(99, &entry, false), "C");
    let mut legacy = serde_json::Map::new();
    legacy.insert("suspendTime".to_string(), json!(10));
    h.store().set(StorageScope::Local, legacy).unwrap();

    h.router
        .handle(BrowserEvent::Installed {
            reason: InstallReason::Update,
        })
        .await;

    assert_eq!(h.browser.context_menus(), MenuItem::ALL.to_vec());
    assert_eq!(h.router.context().settings.suspend_time, 10);
    assert_eq!(h.router.context().suspended.get(c), Some(&entry));
    assert!(h.is_suspended(c));
    assert_eq!(h.router.scheduler().tracked_tabs().unwrap(), vec![h.b]);
    assert_eq!(h.deadline(h.b), Some(START + 10 * MINUTE_MS));
}

#[tokio::test]
async fn test_browser_update_skips_migration() {
    let mut h = build();

    h.router
        .handle(BrowserEvent::Installed {
            reason: InstallReason::BrowserUpdate,
        })
        .await;

    assert!(h.browser.context_menus().is_empty());
    assert_eq!(h.router.scheduler().tracked_tabs().unwrap(), vec![h.b]);
}

#[tokio::test]
async fn test_restart_restores_state_from_the_same_database() {
    let mut h = started().await;
    h.advance(41 * MINUTE_MS).await;
    assert!(h.is_suspended(h.b));
    let c = h.browser.open_tab(1, "https://c.example.com/", "C");
    h.loaded(c).await;

    let mut restarted = EventRouter::new(&h.config, h.db.clone(), h.browser.clone(), h.clock.clone());
    restarted.handle(BrowserEvent::Startup).await;

    assert!(restarted.context().suspended.contains(h.b));
    assert_eq!(restarted.context().active_tab, Some(h.a));

    h.clock.advance(39 * MINUTE_MS);
    assert_eq!(restarted.tick().await, 0);
    h.clock.advance(MINUTE_MS);
    assert_eq!(restarted.tick().await, 1);
    assert!(h.is_suspended(c));
}

#[tokio::test]
async fn test_app_opens_database_file_and_drains_events() {
    use tabsleep::app::App;
    use tokio::sync::mpsc;

    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        database_path: dir.path().join("state").join("tabsleep.db"),
        ..CoreConfig::default()
    };
    let browser = Arc::new(SimulatedBrowser::new(&config.extension_base_url));
    let window = browser.open_window(true);
    browser.open_tab(window, "https://a.example.com/", "A");
    let b = browser.open_tab(window, "https://b.example.com/", "B");

    let mut app = App::new(config.clone(), browser.clone()).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(BrowserEvent::Startup).unwrap();
    drop(tx);
    app.run(rx).await;

    assert!(config.database_path.exists());
    assert_eq!(app.router.scheduler().tracked_tabs().unwrap(), vec![b]);
}
