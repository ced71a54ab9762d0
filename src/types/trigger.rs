use serde::{Deserialize, Serialize};

use super::tab::TabId;

pub const SUSPEND_ALARM_PREFIX: &str = "suspend_tab_";
pub const DISCARD_ALARM_PREFIX: &str = "discard_tab_";

/// The two kinds of per-tab trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Suspend,
    Discard,
}

impl TriggerKind {
    fn prefix(&self) -> &'static str {
        match self {
            TriggerKind::Suspend => SUSPEND_ALARM_PREFIX,
            TriggerKind::Discard => DISCARD_ALARM_PREFIX,
        }
    }
}

/// A trigger key: at most one trigger exists per (kind, tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub tab_id: TabId,
}

impl Trigger {
    pub fn suspend(tab_id: TabId) -> Self {
        Self {
            kind: TriggerKind::Suspend,
            tab_id,
        }
    }

    pub fn discard(tab_id: TabId) -> Self {
        Self {
            kind: TriggerKind::Discard,
            tab_id,
        }
    }

    /// Alarm name, e.g. `suspend_tab_42`.
    pub fn alarm_name(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.tab_id)
    }

    /// Parses an alarm name back into a trigger. Unknown prefixes and
    /// non-numeric ids yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        [TriggerKind::Suspend, TriggerKind::Discard]
            .into_iter()
            .find_map(|kind| {
                name.strip_prefix(kind.prefix())
                    .and_then(|id| id.parse::<TabId>().ok())
                    .map(|tab_id| Trigger { kind, tab_id })
            })
    }
}

/// A durable alarm as stored by the alarm service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub scheduled_time: i64,
}
