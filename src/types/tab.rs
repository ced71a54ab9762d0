use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier.
pub type TabId = i64;

/// Browser-assigned window identifier.
pub type WindowId = i64;

/// Snapshot of a browser tab as reported by the host.
///
/// The core never owns tabs: a snapshot may be stale the moment it is
/// returned, so every mutation re-fetches before acting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub audible: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub discarded: bool,
}

impl TabInfo {
    /// Returns true if the tab's URL uses the http or https scheme.
    pub fn is_web_page(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Snapshot of a browser window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub focused: bool,
}

/// Filter for tab queries. `None` fields match any tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabQuery {
    pub active: Option<bool>,
    pub window_id: Option<WindowId>,
    pub current_window: bool,
}

impl TabQuery {
    /// Every open tab in every window.
    pub fn all() -> Self {
        Self::default()
    }

    /// The active tab of the last focused window.
    pub fn active_in_current_window() -> Self {
        Self {
            active: Some(true),
            window_id: None,
            current_window: true,
        }
    }

    /// The active tab of a specific window.
    pub fn active_in_window(window_id: WindowId) -> Self {
        Self {
            active: Some(true),
            window_id: Some(window_id),
            current_window: false,
        }
    }
}

/// What a page-context probe should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProbe {
    pub check_form_input: bool,
    pub check_notifications: bool,
}

/// Result of a page-context probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// A form field's current value differs from its default value.
    pub form_dirty: bool,
    /// The page has been granted notification permission.
    pub notifications_granted: bool,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
}

/// Context-menu entries registered on install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    WhitelistDomain,
    WhitelistUrl,
    SuspendPage,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [
        MenuItem::WhitelistDomain,
        MenuItem::WhitelistUrl,
        MenuItem::SuspendPage,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            MenuItem::WhitelistDomain => "whitelistDomain",
            MenuItem::WhitelistUrl => "whitelistUrl",
            MenuItem::SuspendPage => "suspendPage",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MenuItem::WhitelistDomain => "Whitelist this domain",
            MenuItem::WhitelistUrl => "Whitelist this page",
            MenuItem::SuspendPage => "Suspend This Page",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|item| item.id() == id)
    }
}
