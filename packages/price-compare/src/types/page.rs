//! Page snapshot handed to adapters and the AI fallback.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the host runtime can tell us about the page being viewed.
///
/// The DOM itself stays with the host; adapters receive this snapshot
/// and read whatever they need from `text` and `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Full URL of the page
    pub url: String,

    /// Host, lowercased, without `www.`
    pub domain: String,

    /// `<title>` or `og:title`
    #[serde(default)]
    pub meta_title: Option<String>,

    /// Visible text of the page (or the lot container)
    #[serde(default)]
    pub text: String,

    /// Two-letter locale declared by the page
    #[serde(default)]
    pub locale: Option<String>,

    /// Screenshot bytes for vision-capable providers, base64 encoded
    #[serde(default)]
    pub screenshot_base64: Option<String>,

    /// Extra metadata (`og:*`, JSON-LD fragments, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PageSnapshot {
    /// Create a snapshot for a URL, deriving the domain.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let domain = domain_of(&url);
        Self {
            url,
            domain,
            ..Default::default()
        }
    }

    pub fn with_meta_title(mut self, title: impl Into<String>) -> Self {
        self.meta_title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Best title available from page metadata alone.
    pub fn fallback_title(&self) -> String {
        self.meta_title
            .clone()
            .or_else(|| self.metadata.get("og:title").cloned())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.domain.clone())
    }
}

/// Extract the bare host of a URL (lowercase, no `www.`).
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of_strips_www() {
        assert_eq!(domain_of("https://www.Drouot.com/l/123"), "drouot.com");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn test_fallback_title_prefers_meta() {
        let page = PageSnapshot::new("https://catawiki.com/l/1")
            .with_metadata("og:title", "From OG")
            .with_meta_title("From title");
        assert_eq!(page.fallback_title(), "From title");

        let bare = PageSnapshot::new("https://catawiki.com/l/1");
        assert_eq!(bare.fallback_title(), "catawiki.com");
    }
}
