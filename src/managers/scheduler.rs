//! Per-tab trigger scheduling.
//!
//! Suspend triggers are durable alarms named `suspend_tab_<id>`; discard
//! triggers are short in-memory deadlines kept in the context. Arming a
//! trigger always supersedes the previous one for the same (kind, tab).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::{Clock, CoreContext};
use crate::host::BrowserHost;
use crate::services::alarm_service::AlarmService;
use crate::services::placeholder::PlaceholderPage;
use crate::types::errors::AlarmError;
use crate::types::tab::{TabId, TabInfo};
use crate::types::trigger::{Trigger, SUSPEND_ALARM_PREFIX};

/// Schedules and cancels suspend and discard triggers.
#[derive(Clone)]
pub struct Scheduler {
    host: Arc<dyn BrowserHost>,
    alarms: Arc<dyn AlarmService>,
    placeholder: PlaceholderPage,
    clock: Clock,
}

impl Scheduler {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        alarms: Arc<dyn AlarmService>,
        placeholder: PlaceholderPage,
        clock: Clock,
    ) -> Self {
        Self {
            host,
            alarms,
            placeholder,
            clock,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Replaces the tab's suspend trigger. The new trigger is only armed
    /// while suspension is enabled, the tab is not active and it is not
    /// already showing the placeholder. Returns the deadline if armed.
    pub async fn schedule_suspend(
        &self,
        ctx: &CoreContext,
        tab_id: TabId,
    ) -> Result<Option<i64>, AlarmError> {
        self.cancel_suspend(tab_id)?;

        if !ctx.settings.is_enabled || ctx.active_tab == Some(tab_id) {
            return Ok(None);
        }

        let tab = match self.host.get_tab(tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                debug!(tab_id, error = %e, "Not scheduling suspend for missing tab");
                return Ok(None);
            }
        };
        // The active pointer may have moved while the tab was fetched.
        if ctx.active_tab == Some(tab_id) || self.placeholder.is_placeholder(&tab.url) {
            return Ok(None);
        }

        let name = Trigger::suspend(tab_id).alarm_name();
        let fire_at = self
            .alarms
            .create(&name, self.now_ms(), ctx.settings.suspend_delay_ms())?;
        debug!(tab_id, fire_at, "Suspend trigger armed");
        Ok(Some(fire_at))
    }

    /// Removes the tab's suspend trigger, if any.
    pub fn cancel_suspend(&self, tab_id: TabId) -> Result<bool, AlarmError> {
        self.alarms.clear(&Trigger::suspend(tab_id).alarm_name())
    }

    /// Replaces the tab's discard trigger with one firing after
    /// `delay_secs` seconds.
    pub fn schedule_discard(&self, ctx: &mut CoreContext, tab_id: TabId, delay_secs: u64) -> i64 {
        let delay_ms = i64::try_from(delay_secs.saturating_mul(1000)).unwrap_or(i64::MAX / 2);
        self.schedule_discard_ms(ctx, tab_id, delay_ms)
    }

    pub fn schedule_discard_ms(&self, ctx: &mut CoreContext, tab_id: TabId, delay_ms: i64) -> i64 {
        let deadline = self.now_ms().saturating_add(delay_ms.max(0));
        ctx.discard_timers.arm(tab_id, deadline);
        debug!(tab_id, deadline, "Discard trigger armed");
        deadline
    }

    /// Removes the tab's discard trigger, including a durable one left by
    /// an older release.
    pub fn cancel_discard(&self, ctx: &mut CoreContext, tab_id: TabId) -> Result<bool, AlarmError> {
        let in_memory = ctx.discard_timers.cancel(tab_id);
        let durable = self.alarms.clear(&Trigger::discard(tab_id).alarm_name())?;
        Ok(in_memory || durable)
    }

    /// Cancels both triggers of a tab.
    pub fn cancel_all(&self, ctx: &mut CoreContext, tab_id: TabId) -> Result<(), AlarmError> {
        self.cancel_suspend(tab_id)?;
        self.cancel_discard(ctx, tab_id)?;
        Ok(())
    }

    /// Deadline of the tab's suspend trigger, if armed.
    pub fn suspend_deadline(&self, tab_id: TabId) -> Result<Option<i64>, AlarmError> {
        Ok(self
            .alarms
            .get(&Trigger::suspend(tab_id).alarm_name())?
            .map(|alarm| alarm.scheduled_time))
    }

    /// Tabs that currently carry a suspend trigger.
    pub fn tracked_tabs(&self) -> Result<Vec<TabId>, AlarmError> {
        Ok(self
            .alarms
            .get_all()?
            .iter()
            .filter(|alarm| alarm.name.starts_with(SUSPEND_ALARM_PREFIX))
            .filter_map(|alarm| Trigger::parse(&alarm.name))
            .map(|trigger| trigger.tab_id)
            .collect())
    }

    /// Re-arms every existing suspend trigger under the current settings.
    /// Tabs without a trigger are left alone.
    pub async fn rearm_tracked(&self, ctx: &CoreContext) -> Result<usize, AlarmError> {
        let mut rearmed = 0;
        for tab_id in self.tracked_tabs()? {
            match self.schedule_suspend(ctx, tab_id).await {
                Ok(Some(_)) => rearmed += 1,
                Ok(None) => {}
                Err(e) => warn!(tab_id, error = %e, "Failed to re-arm suspend trigger"),
            }
        }
        debug!(rearmed, "Suspend triggers re-armed");
        Ok(rearmed)
    }

    /// Arms triggers for eligible tabs that do not have one yet.
    pub async fn arm_untracked(&self, ctx: &CoreContext, tabs: &[TabInfo]) -> Result<usize, AlarmError> {
        let tracked = self.tracked_tabs()?;
        let mut armed = 0;
        for tab in tabs {
            if tracked.contains(&tab.id) || tab.active || ctx.active_tab == Some(tab.id) {
                continue;
            }
            if !tab.is_web_page() {
                continue;
            }
            match self.schedule_suspend(ctx, tab.id).await {
                Ok(Some(_)) => armed += 1,
                Ok(None) => {}
                Err(e) => warn!(tab_id = tab.id, error = %e, "Failed to arm suspend trigger"),
            }
        }
        Ok(armed)
    }

    /// Clears every suspend trigger.
    pub fn clear_all_suspends(&self) -> Result<usize, AlarmError> {
        let mut cleared = 0;
        for tab_id in self.tracked_tabs()? {
            if self.cancel_suspend(tab_id)? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Removes and returns every trigger due now: durable alarms first,
    /// then in-memory discard deadlines.
    pub fn take_due(&self, ctx: &mut CoreContext) -> Result<Vec<Trigger>, AlarmError> {
        let now = self.now_ms();
        let mut due = Vec::new();
        for alarm in self.alarms.take_due(now)? {
            match Trigger::parse(&alarm.name) {
                Some(trigger) => due.push(trigger),
                None => warn!(name = %alarm.name, "Ignoring alarm with unknown name"),
            }
        }
        due.extend(ctx.discard_timers.take_due(now).into_iter().map(Trigger::discard));
        Ok(due)
    }
}

