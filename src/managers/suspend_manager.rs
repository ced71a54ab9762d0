//! Suspend/resume engine.
//!
//! `suspend` moves a live tab to the placeholder page, `resume` moves it
//! back. Both re-fetch the tab before every mutation since it may close or
//! navigate at any await point, and both report failures as `false`
//! instead of propagating them.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::context::CoreContext;
use crate::host::BrowserHost;
use crate::managers::scheduler::Scheduler;
use crate::services::image_store::{ImageSlot, ImageStore};
use crate::services::placeholder::PlaceholderPage;
use crate::services::protection::{Protection, ProtectionEvaluator, ProtectionReason};
use crate::services::tab_state::TabStateStore;
use crate::types::errors::{HostError, SuspendError};
use crate::types::suspended::SuspendedTabEntry;
use crate::types::tab::{TabId, TabInfo, TabQuery};

/// Result of a suspend attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SuspendOutcome {
    /// The tab now shows this placeholder URL.
    Suspended(String),
    TabGone,
    ActiveTab,
    AlreadySuspended,
    Protected(ProtectionReason),
    /// The tab navigated elsewhere while it was being evaluated.
    Navigated,
}

/// Result of a user-requested resume.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    Resumed(String),
    NotSuspended,
    Failed,
}

pub struct SuspendManager {
    host: Arc<dyn BrowserHost>,
    scheduler: Scheduler,
    protection: ProtectionEvaluator,
    placeholder: PlaceholderPage,
    state: TabStateStore,
    images: ImageStore,
    auto_discard_delay_ms: i64,
}

impl SuspendManager {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        scheduler: Scheduler,
        protection: ProtectionEvaluator,
        placeholder: PlaceholderPage,
        state: TabStateStore,
        images: ImageStore,
        auto_discard_delay_ms: i64,
    ) -> Self {
        Self {
            host,
            scheduler,
            protection,
            placeholder,
            state,
            images,
            auto_discard_delay_ms,
        }
    }

    /// Suspends the tab. Returns true only if the tab now shows the
    /// placeholder page as a result of this call.
    pub async fn suspend(&self, ctx: &mut CoreContext, tab_id: TabId, force: bool) -> bool {
        match self.try_suspend(ctx, tab_id, force).await {
            Ok(SuspendOutcome::Suspended(_)) => true,
            Ok(outcome) => {
                debug!(tab_id, force, ?outcome, "Tab not suspended");
                false
            }
            Err(e) => {
                error!(tab_id, error = %e, "Failed to suspend tab");
                false
            }
        }
    }

    pub async fn try_suspend(
        &self,
        ctx: &mut CoreContext,
        tab_id: TabId,
        force: bool,
    ) -> Result<SuspendOutcome, SuspendError> {
        self.refresh_active_tab(ctx).await;

        let tab = match self.host.get_tab(tab_id).await {
            Ok(tab) => tab,
            Err(HostError::TabNotFound(_)) => return Ok(SuspendOutcome::TabGone),
            Err(e) => return Err(e.into()),
        };
        if !force && ctx.active_tab == Some(tab_id) {
            return Ok(SuspendOutcome::ActiveTab);
        }
        if self.placeholder.is_placeholder(&tab.url) {
            return Ok(SuspendOutcome::AlreadySuspended);
        }

        let settings = ctx.settings.clone();
        if let Protection::Protected(reason) =
            self.protection.evaluate(self.host.as_ref(), &settings, &tab, force).await
        {
            return Ok(SuspendOutcome::Protected(reason));
        }

        // The probe is an await point: the tab may have moved on meanwhile.
        let tab = match self.host.get_tab(tab_id).await {
            Ok(current) if current.url == tab.url => current,
            Ok(_) => return Ok(SuspendOutcome::Navigated),
            Err(HostError::TabNotFound(_)) => return Ok(SuspendOutcome::TabGone),
            Err(e) => return Err(e.into()),
        };
        if !force && ctx.active_tab == Some(tab_id) {
            return Ok(SuspendOutcome::ActiveTab);
        }

        let entry = SuspendedTabEntry::new(&tab.url, &tab.title, tab.fav_icon_url.as_deref());
        ctx.suspended.insert(tab_id, entry.clone());
        self.persist(ctx);

        let has_capture = settings.enable_screenshots && self.capture(&tab, settings.capture_quality).await;
        let placeholder_url = self.placeholder.build(tab_id, &entry, has_capture);

        if let Err(e) = self.host.update_tab_url(tab_id, &placeholder_url).await {
            self.drop_entry(ctx, tab_id);
            return match e {
                HostError::TabNotFound(_) => Ok(SuspendOutcome::TabGone),
                other => Err(other.into()),
            };
        }

        if let Err(e) = self.scheduler.cancel_suspend(tab_id) {
            warn!(tab_id, error = %e, "Failed to clear suspend trigger");
        }
        if settings.auto_discard {
            self.scheduler
                .schedule_discard_ms(ctx, tab_id, self.auto_discard_delay_ms);
        }

        info!(tab_id, url = %entry.url, "Tab suspended");
        Ok(SuspendOutcome::Suspended(placeholder_url))
    }

    /// Captures the tab only while it is the visible tab of a focused
    /// window; `capture_visible_tab` grabs whatever that window shows.
    async fn capture(&self, tab: &TabInfo, quality: u8) -> bool {
        let focused = match self.host.get_window(tab.window_id).await {
            Ok(window) => window.focused,
            Err(e) => {
                debug!(tab_id = tab.id, error = %e, "Window lookup failed, skipping capture");
                false
            }
        };
        if !focused || !tab.active {
            return false;
        }

        let data_url = match self.host.capture_visible_tab(tab.window_id, quality).await {
            Ok(data_url) => data_url,
            Err(e) => {
                warn!(tab_id = tab.id, error = %e, "Capture failed");
                return false;
            }
        };
        match self.images.put(ImageSlot::TempImage, tab.id, &data_url) {
            Ok(()) => true,
            Err(e) => {
                warn!(tab_id = tab.id, error = %e, "Failed to store capture");
                false
            }
        }
    }

    /// Restores the tab to `orig_url`, dropping its entry and images.
    pub async fn resume(&self, ctx: &mut CoreContext, tab_id: TabId, orig_url: &str) -> bool {
        let target = if is_http_url(orig_url) {
            orig_url.to_string()
        } else if let Some(entry) = ctx.suspended.get(tab_id) {
            warn!(tab_id, "Resume URL is not a web page, using stored URL");
            entry.url.clone()
        } else {
            warn!(tab_id, "Refusing to resume to a non-web URL");
            return false;
        };

        if let Err(e) = self.scheduler.cancel_discard(ctx, tab_id) {
            warn!(tab_id, error = %e, "Failed to clear discard trigger");
        }
        self.drop_entry(ctx, tab_id);

        match self.host.update_tab_url(tab_id, &target).await {
            Ok(()) => {
                info!(tab_id, url = %target, "Tab resumed");
                true
            }
            Err(e) => {
                warn!(tab_id, error = %e, "Failed to restore tab URL");
                false
            }
        }
    }

    /// Resumes a tab without a URL from the page: the stored entry wins,
    /// otherwise the placeholder's own `origUrl` is used.
    pub async fn force_resume(&self, ctx: &mut CoreContext, tab_id: TabId) -> ResumeOutcome {
        let orig_url = match ctx.suspended.get(tab_id) {
            Some(entry) => Some(entry.url.clone()),
            None => match self.host.get_tab(tab_id).await {
                Ok(tab) => self.placeholder.parse_any(&tab.url).map(|p| p.orig_url),
                Err(e) => {
                    debug!(tab_id, error = %e, "Tab lookup failed during resume");
                    None
                }
            },
        };

        let Some(orig_url) = orig_url else {
            return ResumeOutcome::NotSuspended;
        };
        if self.resume(ctx, tab_id, &orig_url).await {
            ResumeOutcome::Resumed(orig_url)
        } else {
            ResumeOutcome::Failed
        }
    }

    /// Shows the placeholder for an entry again, without protection
    /// checks. Used when a tab comes back on a URL it was suspended from.
    pub async fn restore_placeholder(
        &self,
        ctx: &mut CoreContext,
        tab_id: TabId,
        entry: SuspendedTabEntry,
    ) -> bool {
        let url = self.placeholder.build(tab_id, &entry, false);
        ctx.suspended.insert(tab_id, entry);
        self.persist(ctx);
        if let Err(e) = self.scheduler.cancel_suspend(tab_id) {
            warn!(tab_id, error = %e, "Failed to clear suspend trigger");
        }

        match self.host.update_tab_url(tab_id, &url).await {
            Ok(()) => {
                debug!(tab_id, "Placeholder restored");
                true
            }
            Err(e) => {
                warn!(tab_id, error = %e, "Failed to restore placeholder");
                self.drop_entry(ctx, tab_id);
                false
            }
        }
    }

    /// Asks the browser to discard the tab. Failures are expected (the tab
    /// became active or closed) and only logged.
    pub async fn discard(&self, ctx: &CoreContext, tab_id: TabId) -> bool {
        if ctx.active_tab == Some(tab_id) {
            debug!(tab_id, "Skipping discard of active tab");
            return false;
        }
        match self.host.discard_tab(tab_id).await {
            Ok(()) => {
                debug!(tab_id, "Tab discarded");
                true
            }
            Err(e) => {
                debug!(tab_id, error = %e, "Discard skipped");
                false
            }
        }
    }

    /// Drops everything the core holds for a closed tab.
    pub fn on_tab_removed(&self, ctx: &mut CoreContext, tab_id: TabId) {
        if let Err(e) = self.scheduler.cancel_all(ctx, tab_id) {
            warn!(tab_id, error = %e, "Failed to clear triggers of closed tab");
        }
        if ctx.active_tab == Some(tab_id) {
            ctx.active_tab = None;
        }
        self.drop_entry(ctx, tab_id);
    }

    /// Removes the entry and images of a tab, persisting the change.
    pub fn drop_entry(&self, ctx: &mut CoreContext, tab_id: TabId) {
        if ctx.suspended.remove(tab_id).is_some() {
            self.persist(ctx);
        }
        if let Err(e) = self.images.remove_for_tab(tab_id) {
            warn!(tab_id, error = %e, "Failed to delete tab images");
        }
    }

    /// Writes the suspended map. A failed write leaves memory authoritative.
    pub fn persist(&self, ctx: &CoreContext) {
        if let Err(e) = self.state.save(&ctx.suspended) {
            error!(error = %e, "Failed to persist suspended tabs");
        }
    }

    async fn refresh_active_tab(&self, ctx: &mut CoreContext) {
        match self.host.query_tabs(TabQuery::active_in_current_window()).await {
            Ok(tabs) => {
                if let Some(active) = tabs.first() {
                    ctx.active_tab = Some(active.id);
                }
            }
            Err(e) => debug!(error = %e, "Active tab query failed"),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
