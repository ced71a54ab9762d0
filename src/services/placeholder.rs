//! Placeholder page URL codec.
//!
//! A suspended tab shows `<extension>/suspended.html?origUrl=..&title=..
//! &favIconUrl=..&tabId=..[&hasCapture=true]`. The query carries everything
//! needed to rebuild the suspended-tab entry, which is what recovery relies
//! on after the extension id changes.

use url::form_urlencoded;
use url::Url;

use crate::types::suspended::SuspendedTabEntry;
use crate::types::tab::TabId;

/// Parameters encoded in a placeholder URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderParams {
    pub orig_url: String,
    pub title: String,
    pub fav_icon_url: Option<String>,
    pub tab_id: Option<TabId>,
    pub has_capture: bool,
}

impl PlaceholderParams {
    pub fn to_entry(&self) -> SuspendedTabEntry {
        SuspendedTabEntry::new(&self.orig_url, &self.title, self.fav_icon_url.as_deref())
    }
}

/// Builds and recognises placeholder URLs for one installation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderPage {
    base_url: String,
    page_name: String,
}

impl PlaceholderPage {
    /// `base_url` is the full placeholder URL without query, e.g.
    /// `chrome-extension://abc/suspended.html`.
    pub fn new(base_url: &str) -> Self {
        let page_name = base_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("suspended.html")
            .to_string();
        Self {
            base_url: base_url.to_string(),
            page_name,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Encodes an entry into this installation's placeholder URL.
    ///
    /// Values are percent-encoded the way the page decodes them, so a space
    /// is `%20`, never `+`.
    pub fn build(&self, tab_id: TabId, entry: &SuspendedTabEntry, has_capture: bool) -> String {
        let tab_id = tab_id.to_string();
        let mut pairs = vec![
            ("origUrl", entry.url.as_str()),
            ("title", entry.title.as_str()),
            ("favIconUrl", entry.fav_icon_url.as_deref().unwrap_or("")),
            ("tabId", tab_id.as_str()),
        ];
        if has_capture {
            pairs.push(("hasCapture", "true"));
        }
        let query = pairs
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, encode_component(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.base_url, query)
    }

    /// True if the URL is this installation's placeholder page.
    pub fn is_placeholder(&self, url: &str) -> bool {
        url.starts_with(&self.base_url)
    }

    /// Parses a placeholder URL of *any* installation of the extension:
    /// the host (extension id) is ignored, only the scheme family and the
    /// page path must match. Returns `None` when `origUrl` is missing or
    /// empty.
    pub fn parse_any(&self, url: &str) -> Option<PlaceholderParams> {
        let parsed = Url::parse(url).ok()?;
        if !parsed.scheme().ends_with("-extension") {
            return None;
        }
        if parsed.path().trim_start_matches('/') != self.page_name {
            return None;
        }
        parsed.query()?;

        let mut params = PlaceholderParams {
            orig_url: String::new(),
            title: String::new(),
            fav_icon_url: None,
            tab_id: None,
            has_capture: false,
        };
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "origUrl" => params.orig_url = value.into_owned(),
                "title" => params.title = value.into_owned(),
                "favIconUrl" if !value.is_empty() => params.fav_icon_url = Some(value.into_owned()),
                "tabId" => params.tab_id = value.parse().ok(),
                "hasCapture" => params.has_capture = value == "true",
                _ => {}
            }
        }

        if params.orig_url.is_empty() {
            None
        } else {
            Some(params)
        }
    }
}

// `byte_serialize` escapes a literal `+` as `%2B`, so every `+` left in its
// output stands for a space.
fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
