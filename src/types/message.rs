use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::MessageError;
use super::settings::SettingsPatch;
use super::tab::TabId;

/// Inbound runtime messages accepted by the core, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action")]
pub enum CoreMessage {
    /// Sent by the placeholder page when the user clicks it.
    #[serde(rename = "resumeTab")]
    ResumeTab {
        #[serde(rename = "origUrl")]
        orig_url: String,
    },
    #[serde(rename = "updateTheme")]
    UpdateTheme {
        #[serde(rename = "isDark")]
        is_dark: bool,
    },
    #[serde(rename = "updateSettings")]
    UpdateSettings { settings: SettingsPatch },
    #[serde(rename = "updateSuspendTime")]
    UpdateSuspendTime { minutes: u32 },
    #[serde(rename = "updateEnabled")]
    UpdateEnabled {
        #[serde(rename = "isEnabled")]
        is_enabled: bool,
    },
    /// Suspend a tab regardless of protection. Defaults to the current tab.
    #[serde(rename = "suspendTab")]
    ForceSuspend {
        #[serde(rename = "tabId", default)]
        tab_id: Option<TabId>,
    },
    /// Restore a suspended tab. Defaults to the current tab.
    #[serde(rename = "unsuspendTab")]
    ForceResume {
        #[serde(rename = "tabId", default)]
        tab_id: Option<TabId>,
    },
}

impl CoreMessage {
    /// Decodes a raw message object at the boundary.
    pub fn decode(raw: &Value) -> Result<Self, MessageError> {
        let action = raw
            .get("action")
            .and_then(|a| a.as_str())
            .ok_or(MessageError::MissingAction)?;

        serde_json::from_value(raw.clone()).map_err(|e| {
            if e.to_string().contains("unknown variant") {
                MessageError::UnknownAction(action.to_string())
            } else {
                MessageError::Malformed(format!("{}: {}", action, e))
            }
        })
    }
}

/// Who sent an inbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSender {
    /// Set when the message came from a page running in a tab.
    pub tab_id: Option<TabId>,
}

impl MessageSender {
    pub fn tab(tab_id: TabId) -> Self {
        Self { tab_id: Some(tab_id) }
    }

    pub fn extension() -> Self {
        Self { tab_id: None }
    }
}

/// Messages the core sends to pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action")]
pub enum OutboundMessage {
    #[serde(rename = "updateTheme")]
    UpdateTheme {
        #[serde(rename = "isDark")]
        is_dark: bool,
    },
}

/// Keyboard commands declared by the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SuspendCurrentTab,
    UnsuspendCurrentTab,
    WhitelistCurrentPage,
    WhitelistCurrentDomain,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "suspend-current-tab" => Some(Command::SuspendCurrentTab),
            "unsuspend-current-tab" => Some(Command::UnsuspendCurrentTab),
            "whitelist-current-page" => Some(Command::WhitelistCurrentPage),
            "whitelist-current-domain" => Some(Command::WhitelistCurrentDomain),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SuspendCurrentTab => "suspend-current-tab",
            Command::UnsuspendCurrentTab => "unsuspend-current-tab",
            Command::WhitelistCurrentPage => "whitelist-current-page",
            Command::WhitelistCurrentDomain => "whitelist-current-domain",
        }
    }
}

/// Why the extension's install hook fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    BrowserUpdate,
    SharedModuleUpdate,
}

impl InstallReason {
    /// Install and update carry persisted state that may need migration.
    pub fn needs_migration(&self) -> bool {
        matches!(self, InstallReason::Install | InstallReason::Update)
    }
}
