//! Browser host abstraction.
//!
//! Every outbound action the core performs goes through [`BrowserHost`]:
//! tab and window queries, URL rewrites, discards, captures, page probes,
//! notifications and page messages. Calls may fail at any time because
//! tabs close independently of the core.

pub mod simulated;

use async_trait::async_trait;

use crate::types::errors::HostError;
use crate::types::message::OutboundMessage;
use crate::types::tab::{
    MenuItem, Notification, PageProbe, ProbeReport, TabId, TabInfo, TabQuery, WindowId,
    WindowInfo,
};

pub use simulated::{PageState, SimulatedBrowser};

/// Browser-side operations used by the core.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError>;
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError>;
    async fn get_window(&self, window_id: WindowId) -> Result<WindowInfo, HostError>;
    async fn update_tab_url(&self, tab_id: TabId, url: &str) -> Result<(), HostError>;
    /// Frees the tab's page process while keeping the tab strip entry.
    async fn discard_tab(&self, tab_id: TabId) -> Result<(), HostError>;
    /// Captures the visible tab of a window as a JPEG data URL.
    async fn capture_visible_tab(&self, window_id: WindowId, quality: u8)
        -> Result<String, HostError>;
    /// Runs a probe in the page context of the tab.
    async fn probe_page(&self, tab_id: TabId, probe: PageProbe) -> Result<ProbeReport, HostError>;
    async fn create_notification(&self, notification: Notification) -> Result<(), HostError>;
    async fn send_tab_message(&self, tab_id: TabId, message: &OutboundMessage)
        -> Result<(), HostError>;
    async fn create_context_menu(&self, item: MenuItem) -> Result<(), HostError>;
}
