//! In-memory browser used by the demo binary and the test suites.
//!
//! Models windows, tabs with page state (dirty forms, notification grants,
//! restricted pages) and records every outbound action so callers can
//! assert on what the core did.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::BrowserHost;
use crate::types::errors::HostError;
use crate::types::message::OutboundMessage;
use crate::types::tab::{
    MenuItem, Notification, PageProbe, ProbeReport, TabId, TabInfo, TabQuery, WindowId,
    WindowInfo,
};

/// Page-context state a probe can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub form_dirty: bool,
    pub notifications_granted: bool,
    /// Browser-internal or store pages cannot be scripted.
    pub scriptable: bool,
    /// The probe never answers.
    pub probe_hangs: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            form_dirty: false,
            notifications_granted: false,
            scriptable: true,
            probe_hangs: false,
        }
    }
}

struct SimTab {
    info: TabInfo,
    page: PageState,
}

#[derive(Default)]
struct SimState {
    tabs: Vec<SimTab>,
    windows: Vec<WindowInfo>,
    next_tab_id: TabId,
    next_window_id: WindowId,
    capture_fails: bool,
    notifications: Vec<Notification>,
    sent_messages: Vec<(TabId, OutboundMessage)>,
    discarded: Vec<TabId>,
    url_updates: Vec<(TabId, String)>,
    context_menus: Vec<MenuItem>,
}

impl SimState {
    fn tab(&self, tab_id: TabId) -> Result<&SimTab, HostError> {
        self.tabs
            .iter()
            .find(|t| t.info.id == tab_id)
            .ok_or(HostError::TabNotFound(tab_id))
    }

    fn tab_mut(&mut self, tab_id: TabId) -> Result<&mut SimTab, HostError> {
        self.tabs
            .iter_mut()
            .find(|t| t.info.id == tab_id)
            .ok_or(HostError::TabNotFound(tab_id))
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.windows.iter().find(|w| w.focused).map(|w| w.id)
    }
}

/// Simulated browser host.
pub struct SimulatedBrowser {
    extension_base_url: String,
    state: Mutex<SimState>,
}

impl SimulatedBrowser {
    /// `extension_base_url` identifies pages that belong to the extension
    /// (and can therefore receive runtime messages).
    pub fn new(extension_base_url: &str) -> Self {
        Self {
            extension_base_url: extension_base_url.to_string(),
            state: Mutex::new(SimState {
                next_tab_id: 1,
                next_window_id: 1,
                ..SimState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a window; a focused window takes focus from the others.
    pub fn open_window(&self, focused: bool) -> WindowId {
        let mut state = self.lock();
        let id = state.next_window_id;
        state.next_window_id += 1;
        if focused {
            state.windows.iter_mut().for_each(|w| w.focused = false);
        }
        state.windows.push(WindowInfo { id, focused });
        id
    }

    /// Opens a tab in a window. The first tab of a window becomes active.
    pub fn open_tab(&self, window_id: WindowId, url: &str, title: &str) -> TabId {
        let mut state = self.lock();
        let id = state.next_tab_id;
        state.next_tab_id += 1;
        let first_in_window = !state.tabs.iter().any(|t| t.info.window_id == window_id);
        state.tabs.push(SimTab {
            info: TabInfo {
                id,
                window_id,
                url: url.to_string(),
                title: title.to_string(),
                fav_icon_url: None,
                pinned: false,
                audible: false,
                active: first_in_window,
                discarded: false,
            },
            page: PageState::default(),
        });
        id
    }

    /// Makes the tab active in its window and focuses that window.
    pub fn activate(&self, tab_id: TabId) {
        let mut state = self.lock();
        let Some(window_id) = state
            .tabs
            .iter()
            .find(|t| t.info.id == tab_id)
            .map(|t| t.info.window_id)
        else {
            return;
        };
        for tab in state.tabs.iter_mut().filter(|t| t.info.window_id == window_id) {
            tab.info.active = tab.info.id == tab_id;
            if tab.info.active {
                tab.info.discarded = false;
            }
        }
        for window in state.windows.iter_mut() {
            window.focused = window.id == window_id;
        }
    }

    pub fn focus_window(&self, window_id: WindowId) {
        let mut state = self.lock();
        for window in state.windows.iter_mut() {
            window.focused = window.id == window_id;
        }
    }

    pub fn close_tab(&self, tab_id: TabId) {
        self.lock().tabs.retain(|t| t.info.id != tab_id);
    }

    /// Simulates the user navigating the tab.
    pub fn navigate(&self, tab_id: TabId, url: &str, title: &str) {
        if let Ok(tab) = self.lock().tab_mut(tab_id) {
            tab.info.url = url.to_string();
            tab.info.title = title.to_string();
            tab.page = PageState::default();
        }
    }

    pub fn set_pinned(&self, tab_id: TabId, pinned: bool) {
        if let Ok(tab) = self.lock().tab_mut(tab_id) {
            tab.info.pinned = pinned;
        }
    }

    pub fn set_audible(&self, tab_id: TabId, audible: bool) {
        if let Ok(tab) = self.lock().tab_mut(tab_id) {
            tab.info.audible = audible;
        }
    }

    pub fn set_fav_icon(&self, tab_id: TabId, icon: &str) {
        if let Ok(tab) = self.lock().tab_mut(tab_id) {
            tab.info.fav_icon_url = Some(icon.to_string());
        }
    }

    pub fn set_page_state(&self, tab_id: TabId, page: PageState) {
        if let Ok(tab) = self.lock().tab_mut(tab_id) {
            tab.page = page;
        }
    }

    pub fn set_capture_failure(&self, fails: bool) {
        self.lock().capture_fails = fails;
    }

    pub fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.lock().tab(tab_id).ok().map(|t| t.info.clone())
    }

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.lock().tabs.iter().map(|t| t.info.clone()).collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn sent_messages(&self) -> Vec<(TabId, OutboundMessage)> {
        self.lock().sent_messages.clone()
    }

    pub fn discarded(&self) -> Vec<TabId> {
        self.lock().discarded.clone()
    }

    pub fn url_updates(&self) -> Vec<(TabId, String)> {
        self.lock().url_updates.clone()
    }

    pub fn context_menus(&self) -> Vec<MenuItem> {
        self.lock().context_menus.clone()
    }
}

#[async_trait]
impl BrowserHost for SimulatedBrowser {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.lock().tab(tab_id).map(|t| t.info.clone())
    }

    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError> {
        let state = self.lock();
        let current = state.focused_window();
        Ok(state
            .tabs
            .iter()
            .map(|t| &t.info)
            .filter(|t| query.active.map_or(true, |a| t.active == a))
            .filter(|t| query.window_id.map_or(true, |w| t.window_id == w))
            .filter(|t| !query.current_window || Some(t.window_id) == current)
            .cloned()
            .collect())
    }

    async fn get_window(&self, window_id: WindowId) -> Result<WindowInfo, HostError> {
        self.lock()
            .windows
            .iter()
            .find(|w| w.id == window_id)
            .cloned()
            .ok_or(HostError::WindowNotFound(window_id))
    }

    async fn update_tab_url(&self, tab_id: TabId, url: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        let tab = state.tab_mut(tab_id)?;
        tab.info.url = url.to_string();
        tab.info.discarded = false;
        tab.page = PageState::default();
        state.url_updates.push((tab_id, url.to_string()));
        Ok(())
    }

    async fn discard_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut state = self.lock();
        let tab = state.tab_mut(tab_id)?;
        if tab.info.active {
            return Err(HostError::Unavailable(format!(
                "cannot discard active tab {}",
                tab_id
            )));
        }
        tab.info.discarded = true;
        state.discarded.push(tab_id);
        Ok(())
    }

    async fn capture_visible_tab(
        &self,
        window_id: WindowId,
        quality: u8,
    ) -> Result<String, HostError> {
        let state = self.lock();
        if state.capture_fails {
            return Err(HostError::PermissionDenied("capture not allowed".to_string()));
        }
        if !state.windows.iter().any(|w| w.id == window_id) {
            return Err(HostError::WindowNotFound(window_id));
        }
        let pixels = [0xFF, 0xD8, 0xFF, 0xE0, quality];
        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(pixels)))
    }

    async fn probe_page(&self, tab_id: TabId, probe: PageProbe) -> Result<ProbeReport, HostError> {
        let page = {
            let state = self.lock();
            let tab = state.tab(tab_id)?;
            if !tab.page.scriptable || !tab.info.is_web_page() {
                return Err(HostError::Restricted(tab.info.url.clone()));
            }
            tab.page
        };
        if page.probe_hangs {
            std::future::pending::<()>().await;
        }
        Ok(ProbeReport {
            form_dirty: probe.check_form_input && page.form_dirty,
            notifications_granted: probe.check_notifications && page.notifications_granted,
        })
    }

    async fn create_notification(&self, notification: Notification) -> Result<(), HostError> {
        self.lock().notifications.push(notification);
        Ok(())
    }

    async fn send_tab_message(
        &self,
        tab_id: TabId,
        message: &OutboundMessage,
    ) -> Result<(), HostError> {
        let mut state = self.lock();
        let tab = state.tab(tab_id)?;
        if !tab.info.url.starts_with(&self.extension_base_url) {
            return Err(HostError::Unavailable(format!(
                "no message receiver in tab {}",
                tab_id
            )));
        }
        state.sent_messages.push((tab_id, message.clone()));
        Ok(())
    }

    async fn create_context_menu(&self, item: MenuItem) -> Result<(), HostError> {
        let mut state = self.lock();
        if !state.context_menus.contains(&item) {
            state.context_menus.push(item);
        }
        Ok(())
    }
}
