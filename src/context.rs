//! Mutable core state shared by the router and its components.
//!
//! Everything here is volatile: it is rebuilt from persisted storage and
//! live tab queries whenever the process starts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::settings::SuspendSettings;
use crate::types::suspended::SuspendedTabs;
use crate::types::tab::TabId;

/// Wall clock in milliseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub enum Clock {
    System,
    /// Manually advanced clock for simulations and tests.
    Manual(Arc<AtomicI64>),
}

impl Clock {
    pub fn manual(start_ms: i64) -> Self {
        Clock::Manual(Arc::new(AtomicI64::new(start_ms)))
    }

    pub fn now_ms(&self) -> i64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as i64,
            Clock::Manual(now) => now.load(Ordering::SeqCst),
        }
    }

    /// Moves a manual clock forward. No-op for the system clock.
    pub fn advance(&self, ms: i64) {
        if let Clock::Manual(now) = self {
            now.fetch_add(ms, Ordering::SeqCst);
        }
    }
}

/// In-memory discard deadlines, at most one per tab.
#[derive(Debug, Clone, Default)]
pub struct DiscardTimers {
    deadlines: HashMap<TabId, i64>,
}

impl DiscardTimers {
    /// Arms (or re-arms) the tab's discard deadline.
    pub fn arm(&mut self, tab_id: TabId, deadline_ms: i64) {
        self.deadlines.insert(tab_id, deadline_ms);
    }

    pub fn cancel(&mut self, tab_id: TabId) -> bool {
        self.deadlines.remove(&tab_id).is_some()
    }

    pub fn deadline(&self, tab_id: TabId) -> Option<i64> {
        self.deadlines.get(&tab_id).copied()
    }

    /// Removes and returns the tabs whose deadline passed, earliest first.
    pub fn take_due(&mut self, now_ms: i64) -> Vec<TabId> {
        let mut due: Vec<(i64, TabId)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now_ms)
            .map(|(tab_id, deadline)| (*deadline, *tab_id))
            .collect();
        due.sort();
        for (_, tab_id) in &due {
            self.deadlines.remove(tab_id);
        }
        due.into_iter().map(|(_, tab_id)| tab_id).collect()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

/// State owned by the event router and lent to each component.
#[derive(Debug, Clone, Default)]
pub struct CoreContext {
    pub settings: SuspendSettings,
    /// The focused tab. It never carries a suspend trigger.
    pub active_tab: Option<TabId>,
    pub suspended: SuspendedTabs,
    pub discard_timers: DiscardTimers,
}
