//! Event router: receives browser events and dispatches them to the
//! scheduler, the suspend/resume engine and the recovery manager.
//!
//! The router owns the [`CoreContext`] and lends it to each component.
//! Handlers never propagate errors; a failing event is logged and the next
//! one is processed normally.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::context::{Clock, CoreContext};
use crate::database::Database;
use crate::host::BrowserHost;
use crate::managers::recovery_manager::RecoveryManager;
use crate::managers::scheduler::Scheduler;
use crate::managers::suspend_manager::{ResumeOutcome, SuspendManager};
use crate::services::alarm_service::SqliteAlarms;
use crate::services::config::CoreConfig;
use crate::services::image_store::ImageStore;
use crate::services::placeholder::PlaceholderPage;
use crate::services::protection::ProtectionEvaluator;
use crate::services::settings_store::{SettingsStore, SettingsStoreTrait};
use crate::services::storage::KeyValueStore;
use crate::services::tab_state::TabStateStore;
use crate::types::errors::SettingsError;
use crate::types::event::{BrowserEvent, StorageScope};
use crate::types::message::{Command, CoreMessage, InstallReason, MessageSender, OutboundMessage};
use crate::types::settings::SYNC_SETTINGS_KEYS;
use crate::types::tab::{MenuItem, Notification, TabId, TabInfo, TabQuery};
use crate::types::trigger::{Trigger, TriggerKind};

/// Local key holding the placeholder theme.
pub const DARK_MODE_KEY: &str = "darkMode";

pub struct EventRouter {
    ctx: CoreContext,
    host: Arc<dyn BrowserHost>,
    store: KeyValueStore,
    settings: SettingsStore,
    placeholder: PlaceholderPage,
    scheduler: Scheduler,
    suspender: SuspendManager,
    recovery: RecoveryManager,
}

impl EventRouter {
    /// Wires every component on top of one database and one host.
    pub fn new(
        config: &CoreConfig,
        db: Arc<Database>,
        host: Arc<dyn BrowserHost>,
        clock: Clock,
    ) -> Self {
        let store = KeyValueStore::new(db.clone());
        let settings = SettingsStore::new(store.clone());
        let state = TabStateStore::new(store.clone());
        let images = ImageStore::new(db.clone());
        let placeholder = PlaceholderPage::new(&config.placeholder_url());
        let alarms = Arc::new(SqliteAlarms::new(db, config.min_alarm_delay_ms));

        let scheduler = Scheduler::new(host.clone(), alarms, placeholder.clone(), clock);
        let suspender = SuspendManager::new(
            host.clone(),
            scheduler.clone(),
            ProtectionEvaluator::new(config.probe_timeout()),
            placeholder.clone(),
            state.clone(),
            images.clone(),
            config.auto_discard_delay_ms,
        );
        let recovery = RecoveryManager::new(
            host.clone(),
            store.clone(),
            state,
            images,
            placeholder.clone(),
        );

        Self {
            ctx: CoreContext::default(),
            host,
            store,
            settings,
            placeholder,
            scheduler,
            suspender,
            recovery,
        }
    }

    pub fn context(&self) -> &CoreContext {
        &self.ctx
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn suspender(&self) -> &SuspendManager {
        &self.suspender
    }

    pub fn placeholder(&self) -> &PlaceholderPage {
        &self.placeholder
    }

    /// Suspends a tab through the engine using the router's context.
    pub async fn suspend_tab(&mut self, tab_id: TabId, force: bool) -> bool {
        self.suspender.suspend(&mut self.ctx, tab_id, force).await
    }

    /// Rebuilds volatile state from storage and the open tabs: settings,
    /// suspended map, active tab, reconciliation, then suspend triggers
    /// for eligible tabs that have none.
    pub async fn initialize(&mut self) {
        self.ctx.settings = self.settings.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            Default::default()
        });
        self.ctx.suspended = self.recovery.load_suspended();
        if let Some(active) = self.current_tab().await {
            self.ctx.active_tab = Some(active.id);
        }

        let tabs = match self.host.query_tabs(TabQuery::all()).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Tab query failed during initialization");
                return;
            }
        };
        self.recovery.reconcile(&mut self.ctx, &tabs).await;

        if self.ctx.settings.is_enabled {
            match self.scheduler.arm_untracked(&self.ctx, &tabs).await {
                Ok(armed) => info!(armed, suspended = self.ctx.suspended.len(), "Core initialized"),
                Err(e) => warn!(error = %e, "Failed to arm suspend triggers"),
            }
        }
    }

    /// Dispatches one browser event.
    pub async fn handle(&mut self, event: BrowserEvent) {
        match event {
            BrowserEvent::TabUpdated { tab_id, complete, tab } => {
                if complete {
                    self.on_tab_loaded(tab_id, tab).await;
                }
            }
            BrowserEvent::TabActivated { tab_id, .. } => self.on_activated(tab_id).await,
            BrowserEvent::TabRemoved { tab_id } => {
                self.suspender.on_tab_removed(&mut self.ctx, tab_id);
            }
            BrowserEvent::WindowFocusChanged { window_id } => {
                let Some(window_id) = window_id else {
                    return;
                };
                match self.host.query_tabs(TabQuery::active_in_window(window_id)).await {
                    Ok(tabs) => {
                        if let Some(tab) = tabs.first() {
                            self.on_activated(tab.id).await;
                        }
                    }
                    Err(e) => debug!(window_id, error = %e, "Active tab query failed"),
                }
            }
            BrowserEvent::AlarmFired { name } => self.on_alarm(&name).await,
            BrowserEvent::Message { message, sender } => {
                self.on_message(&message, sender).await;
            }
            BrowserEvent::StorageChanged { scope, keys } => {
                let settings_changed = scope == StorageScope::Sync
                    && keys.iter().any(|k| SYNC_SETTINGS_KEYS.contains(&k.as_str()));
                if settings_changed {
                    self.reload_settings().await;
                }
            }
            BrowserEvent::Command { name } => match Command::from_name(&name) {
                Some(command) => self.on_command(command).await,
                None => warn!(command = %name, "Ignoring unknown command"),
            },
            BrowserEvent::ContextMenuClicked { menu_item_id, tab } => {
                match MenuItem::from_id(&menu_item_id) {
                    Some(item) => self.on_menu(item, &tab).await,
                    None => warn!(menu_item_id = %menu_item_id, "Ignoring unknown menu item"),
                }
            }
            BrowserEvent::Installed { reason } => self.on_installed(reason).await,
            BrowserEvent::Startup => self.initialize().await,
        }
    }

    /// Fires every trigger that is due by the scheduler's clock.
    pub async fn tick(&mut self) -> usize {
        let due = match self.scheduler.take_due(&mut self.ctx) {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "Failed to read due triggers");
                return 0;
            }
        };
        let fired = due.len();
        for trigger in due {
            self.fire(trigger).await;
        }
        fired
    }

    async fn fire(&mut self, trigger: Trigger) {
        debug!(tab_id = trigger.tab_id, kind = ?trigger.kind, "Trigger fired");
        match trigger.kind {
            TriggerKind::Suspend => {
                self.suspender.suspend(&mut self.ctx, trigger.tab_id, false).await;
            }
            TriggerKind::Discard => {
                self.suspender.discard(&self.ctx, trigger.tab_id).await;
            }
        }
    }

    async fn on_alarm(&mut self, name: &str) {
        let Some(trigger) = Trigger::parse(name) else {
            warn!(name, "Ignoring alarm with unknown name");
            return;
        };
        // The alarm fired outside the tick loop; drop our copy of it.
        let cleared = match trigger.kind {
            TriggerKind::Suspend => self.scheduler.cancel_suspend(trigger.tab_id),
            TriggerKind::Discard => self.scheduler.cancel_discard(&mut self.ctx, trigger.tab_id),
        };
        if let Err(e) = cleared {
            warn!(name, error = %e, "Failed to clear fired alarm");
        }
        self.fire(trigger).await;
    }

    async fn on_tab_loaded(&mut self, tab_id: TabId, tab: TabInfo) {
        if self.placeholder.is_placeholder(&tab.url) {
            return;
        }

        match self.ctx.suspended.get(tab_id).cloned() {
            Some(entry) if entry.url == tab.url => {
                debug!(tab_id, "Suspended tab came back, restoring placeholder");
                self.suspender
                    .restore_placeholder(&mut self.ctx, tab_id, entry)
                    .await;
                return;
            }
            Some(_) => {
                // Navigated away from the placeholder without resuming.
                self.suspender.drop_entry(&mut self.ctx, tab_id);
            }
            None => {}
        }

        if self.ctx.active_tab != Some(tab_id) && !tab.active && tab.is_web_page() {
            self.schedule_suspend(tab_id).await;
        }
    }

    async fn on_activated(&mut self, tab_id: TabId) {
        let previous = self.ctx.active_tab.replace(tab_id);

        if let Err(e) = self.scheduler.cancel_all(&mut self.ctx, tab_id) {
            warn!(tab_id, error = %e, "Failed to clear triggers of active tab");
        }

        let Some(previous) = previous.filter(|p| *p != tab_id) else {
            return;
        };
        let tab = match self.host.get_tab(previous).await {
            Ok(tab) => tab,
            Err(e) => {
                debug!(tab_id = previous, error = %e, "Previously active tab is gone");
                return;
            }
        };

        if self.placeholder.is_placeholder(&tab.url) {
            if self.ctx.settings.auto_discard {
                let delay = self.ctx.settings.rediscard_delay;
                self.scheduler.schedule_discard(&mut self.ctx, previous, delay);
            }
        } else if tab.is_web_page() {
            self.schedule_suspend(previous).await;
        }
    }

    async fn schedule_suspend(&mut self, tab_id: TabId) {
        if let Err(e) = self.scheduler.schedule_suspend(&self.ctx, tab_id).await {
            warn!(tab_id, error = %e, "Failed to schedule suspend");
        }
    }

    async fn on_message(&mut self, raw: &Value, sender: MessageSender) {
        let message = match CoreMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Rejected message");
                return;
            }
        };

        match message {
            CoreMessage::ResumeTab { orig_url } => match sender.tab_id {
                Some(tab_id) => {
                    self.suspender.resume(&mut self.ctx, tab_id, &orig_url).await;
                }
                None => warn!("Resume request without a sender tab"),
            },
            CoreMessage::UpdateTheme { is_dark } => self.update_theme(is_dark).await,
            CoreMessage::UpdateSettings { settings } => {
                let result = self.settings.apply_patch(&settings).map(|_| ());
                self.after_settings_write(result).await;
            }
            CoreMessage::UpdateSuspendTime { minutes } => {
                let result = self.settings.set_value("suspendTime", json!(minutes));
                self.after_settings_write(result).await;
            }
            CoreMessage::UpdateEnabled { is_enabled } => {
                let result = self.settings.set_value("isEnabled", json!(is_enabled));
                self.after_settings_write(result).await;
            }
            CoreMessage::ForceSuspend { tab_id } => {
                if let Some(tab_id) = self.resolve_tab(tab_id).await {
                    self.suspender.suspend(&mut self.ctx, tab_id, true).await;
                }
            }
            CoreMessage::ForceResume { tab_id } => {
                if let Some(tab_id) = self.resolve_tab(tab_id).await {
                    self.suspender.force_resume(&mut self.ctx, tab_id).await;
                }
            }
        }
    }

    async fn after_settings_write(&mut self, result: Result<(), SettingsError>) {
        match result {
            Ok(()) => self.reload_settings().await,
            Err(e) => warn!(error = %e, "Rejected settings update"),
        }
    }

    /// Reloads settings and brings the triggers in line with them.
    async fn reload_settings(&mut self) {
        let settings = match self.settings.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to reload settings");
                return;
            }
        };
        let was_enabled = self.ctx.settings.is_enabled;
        self.ctx.settings = settings;

        let result = match (was_enabled, self.ctx.settings.is_enabled) {
            (true, false) => self.scheduler.clear_all_suspends(),
            (false, true) => match self.host.query_tabs(TabQuery::all()).await {
                Ok(tabs) => self.scheduler.arm_untracked(&self.ctx, &tabs).await,
                Err(e) => {
                    warn!(error = %e, "Tab query failed while enabling");
                    Ok(0)
                }
            },
            _ => self.scheduler.rearm_tracked(&self.ctx).await,
        };
        match result {
            Ok(count) => debug!(count, enabled = self.ctx.settings.is_enabled, "Settings applied"),
            Err(e) => warn!(error = %e, "Failed to update triggers after settings change"),
        }
    }

    async fn update_theme(&mut self, is_dark: bool) {
        if let Err(e) = self.store.set_typed(StorageScope::Local, DARK_MODE_KEY, &is_dark) {
            warn!(error = %e, "Failed to persist theme");
        }
        let tabs = match self.host.query_tabs(TabQuery::all()).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Tab query failed during theme broadcast");
                return;
            }
        };
        let message = OutboundMessage::UpdateTheme { is_dark };
        for tab in tabs.iter().filter(|t| self.placeholder.is_placeholder(&t.url)) {
            if let Err(e) = self.host.send_tab_message(tab.id, &message).await {
                debug!(tab_id = tab.id, error = %e, "Theme update not delivered");
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        let Some(tab) = self.current_tab().await else {
            debug!(command = command.name(), "No current tab for command");
            return;
        };
        match command {
            Command::SuspendCurrentTab => self.force_suspend_with_notice(tab.id).await,
            Command::UnsuspendCurrentTab => self.force_resume_with_notice(tab.id).await,
            Command::WhitelistCurrentPage => self.whitelist_url(&tab).await,
            Command::WhitelistCurrentDomain => self.whitelist_domain(&tab).await,
        }
    }

    async fn on_menu(&mut self, item: MenuItem, tab: &TabInfo) {
        match item {
            MenuItem::WhitelistDomain => self.whitelist_domain(tab).await,
            MenuItem::WhitelistUrl => self.whitelist_url(tab).await,
            MenuItem::SuspendPage => self.force_suspend_with_notice(tab.id).await,
        }
    }

    async fn force_suspend_with_notice(&mut self, tab_id: TabId) {
        if self.suspender.suspend(&mut self.ctx, tab_id, true).await {
            self.notify("Tab suspended", "The tab has been suspended.").await;
        } else {
            self.notify("Tab not suspended", "This page cannot be suspended.").await;
        }
    }

    async fn force_resume_with_notice(&mut self, tab_id: TabId) {
        match self.suspender.force_resume(&mut self.ctx, tab_id).await {
            ResumeOutcome::Resumed(_) => {
                self.notify("Tab restored", "The tab has been restored.").await;
            }
            ResumeOutcome::NotSuspended => {
                self.notify("Tab not suspended", "This tab is not suspended.").await;
            }
            ResumeOutcome::Failed => {
                self.notify("Tab not restored", "The tab could not be restored.").await;
            }
        }
    }

    async fn whitelist_domain(&mut self, tab: &TabInfo) {
        let domain = Url::parse(&tab.url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .and_then(|url| url.host_str().map(str::to_string));
        let Some(domain) = domain else {
            self.notify("Cannot whitelist", "This page has no web domain.").await;
            return;
        };

        match self.settings.add_whitelisted_domain(&domain) {
            Ok(true) => {
                self.reload_settings().await;
                self.notify("Domain whitelisted", &format!("{} will not be suspended.", domain))
                    .await;
            }
            Ok(false) => {
                self.notify("Already whitelisted", &format!("{} is already whitelisted.", domain))
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to whitelist domain");
                self.notify("Whitelist failed", "The domain could not be whitelisted.").await;
            }
        }
    }

    async fn whitelist_url(&mut self, tab: &TabInfo) {
        if !tab.is_web_page() {
            self.notify("Cannot whitelist", "Only web pages can be whitelisted.").await;
            return;
        }
        match self.settings.add_whitelisted_url(&tab.url) {
            Ok(true) => {
                self.reload_settings().await;
                self.notify("Page whitelisted", "This page will not be suspended.").await;
            }
            Ok(false) => {
                self.notify("Already whitelisted", "This page is already whitelisted.").await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to whitelist page");
                self.notify("Whitelist failed", "The page could not be whitelisted.").await;
            }
        }
    }

    async fn on_installed(&mut self, reason: InstallReason) {
        info!(?reason, "Extension installed or updated");
        if reason.needs_migration() {
            match self.recovery.run_migration() {
                Ok(report) => debug!(?report, "Migration finished"),
                Err(e) => warn!(error = %e, "Migration failed"),
            }
            self.ctx.suspended = self.recovery.load_suspended();
            self.recovery.recover_open_tabs(&mut self.ctx).await;

            for item in MenuItem::ALL {
                if let Err(e) = self.host.create_context_menu(item).await {
                    warn!(menu = item.id(), error = %e, "Failed to create context menu");
                }
            }
        }
        self.initialize().await;
    }

    async fn notify(&self, title: &str, message: &str) {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            message: message.to_string(),
        };
        if let Err(e) = self.host.create_notification(notification).await {
            warn!(error = %e, "Failed to show notification");
        }
    }

    async fn current_tab(&self) -> Option<TabInfo> {
        match self.host.query_tabs(TabQuery::active_in_current_window()).await {
            Ok(tabs) => tabs.into_iter().next(),
            Err(e) => {
                debug!(error = %e, "Current tab query failed");
                None
            }
        }
    }

    async fn resolve_tab(&self, tab_id: Option<TabId>) -> Option<TabId> {
        match tab_id {
            Some(tab_id) => Some(tab_id),
            None => self.current_tab().await.map(|tab| tab.id),
        }
    }
}
