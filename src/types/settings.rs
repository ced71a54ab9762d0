use serde::{Deserialize, Serialize};

/// Keys of the synced settings scope. A storage change touching any of
/// these requires a settings reload.
pub const SYNC_SETTINGS_KEYS: [&str; 15] = [
    "suspendTime",
    "isEnabled",
    "ignoreAudio",
    "ignoreFormInput",
    "ignoreNotifications",
    "ignorePinned",
    "whitelistedDomains",
    "whitelistedUrls",
    "enableScreenshots",
    "captureQuality",
    "resizeWidth",
    "resizeHeight",
    "resizeQuality",
    "autoDiscard",
    "rediscardDelay",
];

/// Settings that older releases kept in the local scope.
pub const LEGACY_LOCAL_SETTINGS_KEYS: [&str; 8] = [
    "suspendTime",
    "isEnabled",
    "ignoreAudio",
    "ignoreFormInput",
    "ignoreNotifications",
    "ignorePinned",
    "whitelistedDomains",
    "whitelistedUrls",
];

pub const MIN_SUSPEND_MINUTES: u32 = 1;
pub const MAX_SUSPEND_MINUTES: u32 = 1440;

/// User-configurable suspension policy.
///
/// Every field has its own default so a partially written sync scope still
/// loads; unknown keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SuspendSettings {
    /// Minutes of inactivity before a tab is suspended.
    pub suspend_time: u32,
    pub is_enabled: bool,
    pub ignore_audio: bool,
    pub ignore_form_input: bool,
    pub ignore_notifications: bool,
    pub ignore_pinned: bool,
    pub whitelisted_domains: Vec<String>,
    pub whitelisted_urls: Vec<String>,
    pub enable_screenshots: bool,
    pub capture_quality: u8,
    pub resize_width: u32,
    pub resize_height: u32,
    pub resize_quality: f64,
    pub auto_discard: bool,
    /// Seconds a suspended tab may stay loaded after losing focus.
    pub rediscard_delay: u64,
}

impl Default for SuspendSettings {
    fn default() -> Self {
        Self {
            suspend_time: 40,
            is_enabled: true,
            ignore_audio: true,
            ignore_form_input: true,
            ignore_notifications: true,
            ignore_pinned: true,
            whitelisted_domains: Vec::new(),
            whitelisted_urls: Vec::new(),
            enable_screenshots: false,
            capture_quality: 50,
            resize_width: 1280,
            resize_height: 720,
            resize_quality: 0.5,
            auto_discard: true,
            rediscard_delay: 30,
        }
    }
}

impl SuspendSettings {
    pub fn suspend_delay_ms(&self) -> i64 {
        i64::from(self.suspend_time) * 60 * 1000
    }

    pub fn is_domain_whitelisted(&self, host: &str) -> bool {
        self.whitelisted_domains.iter().any(|d| d == host)
    }

    pub fn is_url_whitelisted(&self, url: &str) -> bool {
        self.whitelisted_urls.iter().any(|u| u == url)
    }
}

/// Partial settings update sent by the settings UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_audio: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_form_input: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelisted_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelisted_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_screenshots: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_discard: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rediscard_delay: Option<u64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &SettingsPatch::default()
    }
}
