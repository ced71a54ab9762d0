use serde_json::Value;

use super::message::{InstallReason, MessageSender};
use super::tab::{TabId, TabInfo, WindowId};

/// Storage scopes of the external key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Settings, synced across the user's browsers.
    Sync,
    /// Tab and session state for this browser only.
    Local,
}

impl StorageScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageScope::Sync => "sync",
            StorageScope::Local => "local",
        }
    }
}

/// Browser lifecycle events delivered to the router.
#[derive(Debug, Clone)]
pub enum BrowserEvent {
    /// A tab changed; `complete` is set once it finished loading.
    TabUpdated {
        tab_id: TabId,
        complete: bool,
        tab: TabInfo,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabRemoved {
        tab_id: TabId,
    },
    /// `None` when every browser window lost focus.
    WindowFocusChanged {
        window_id: Option<WindowId>,
    },
    AlarmFired {
        name: String,
    },
    Message {
        message: Value,
        sender: MessageSender,
    },
    StorageChanged {
        scope: StorageScope,
        keys: Vec<String>,
    },
    Command {
        name: String,
    },
    ContextMenuClicked {
        menu_item_id: String,
        tab: TabInfo,
    },
    Installed {
        reason: InstallReason,
    },
    Startup,
}
