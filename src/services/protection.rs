//! Protection evaluator: decides whether a tab is exempt from suspension.
//!
//! Checks run in a fixed order and stop at the first hit. Anything that
//! cannot be determined (bad URL, probe refused, probe timed out) counts as
//! protected.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::host::BrowserHost;
use crate::types::settings::SuspendSettings;
use crate::types::tab::{PageProbe, TabInfo};

/// Why a tab is exempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionReason {
    NotWebPage,
    Pinned,
    WhitelistedDomain,
    WhitelistedUrl,
    PlayingAudio,
    UnsavedFormInput,
    NotificationsGranted,
    /// The page probe could not run or did not answer in time.
    ProbeFailed,
}

/// Outcome of a protection check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Unprotected,
    Protected(ProtectionReason),
}

impl Protection {
    pub fn is_protected(&self) -> bool {
        matches!(self, Protection::Protected(_))
    }
}

/// Stateless evaluator; reads settings and page state, never mutates.
#[derive(Debug, Clone)]
pub struct ProtectionEvaluator {
    probe_timeout: Duration,
}

impl ProtectionEvaluator {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Checks that need no page access: scheme, force, pinned, whitelists,
    /// audio. `None` means the page probe decides.
    pub fn static_check(settings: &SuspendSettings, tab: &TabInfo, force: bool) -> Option<Protection> {
        if !tab.is_web_page() {
            return Some(Protection::Protected(ProtectionReason::NotWebPage));
        }
        if force {
            return Some(Protection::Unprotected);
        }
        if settings.ignore_pinned && tab.pinned {
            return Some(Protection::Protected(ProtectionReason::Pinned));
        }

        let host = match Url::parse(&tab.url) {
            Ok(url) => url.host_str().map(str::to_string),
            Err(_) => return Some(Protection::Protected(ProtectionReason::NotWebPage)),
        };
        if let Some(host) = host {
            if settings.is_domain_whitelisted(&host) {
                return Some(Protection::Protected(ProtectionReason::WhitelistedDomain));
            }
        }
        if settings.is_url_whitelisted(&tab.url) {
            return Some(Protection::Protected(ProtectionReason::WhitelistedUrl));
        }

        if settings.ignore_audio && tab.audible {
            return Some(Protection::Protected(ProtectionReason::PlayingAudio));
        }
        if !settings.ignore_form_input && !settings.ignore_notifications {
            return Some(Protection::Unprotected);
        }
        None
    }

    /// Full evaluation including the page-context probe.
    pub async fn evaluate(
        &self,
        host: &dyn BrowserHost,
        settings: &SuspendSettings,
        tab: &TabInfo,
        force: bool,
    ) -> Protection {
        if let Some(outcome) = Self::static_check(settings, tab, force) {
            return outcome;
        }

        let probe = PageProbe {
            check_form_input: settings.ignore_form_input,
            check_notifications: settings.ignore_notifications,
        };
        let report = match tokio::time::timeout(self.probe_timeout, host.probe_page(tab.id, probe)).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                debug!(tab_id = tab.id, error = %e, "Page probe failed, protecting tab");
                return Protection::Protected(ProtectionReason::ProbeFailed);
            }
            Err(_) => {
                debug!(tab_id = tab.id, "Page probe timed out, protecting tab");
                return Protection::Protected(ProtectionReason::ProbeFailed);
            }
        };

        if report.form_dirty {
            Protection::Protected(ProtectionReason::UnsavedFormInput)
        } else if report.notifications_granted {
            Protection::Protected(ProtectionReason::NotificationsGranted)
        } else {
            Protection::Unprotected
        }
    }

    pub async fn should_protect(
        &self,
        host: &dyn BrowserHost,
        settings: &SuspendSettings,
        tab: &TabInfo,
        force: bool,
    ) -> bool {
        self.evaluate(host, settings, tab, force).await.is_protected()
    }
}
