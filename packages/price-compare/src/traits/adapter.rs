//! Site adapter trait and the domain lookup table.
//!
//! Adapters are schema-exact extractors for one auction site. They live
//! outside this crate (selectors change with every redesign); the core
//! only needs the capability set below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{auction::AuctionData, page::PageSnapshot};

/// Where and how often to watch the page for live price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationConfig {
    /// CSS selector of the element whose mutations matter
    pub target_selector: String,

    /// Minimum spacing between re-extractions
    pub debounce_ms: u64,

    /// Observer options (`childList`, `subtree`, `characterData`, ...)
    #[serde(default)]
    pub options: HashMap<String, bool>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            target_selector: "body".to_string(),
            debounce_ms: 1000,
            options: HashMap::from([
                ("childList".to_string(), true),
                ("subtree".to_string(), true),
            ]),
        }
    }
}

/// Per-domain extractor capability set.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Domain this adapter handles (e.g. `drouot.com`).
    fn domain(&self) -> &str;

    /// Read the lot from the current page state.
    ///
    /// Returns `None` when the page holds nothing recognizable.
    async fn extract_data(&self, page: &PageSnapshot) -> Option<AuctionData>;

    /// Whether the page is a single-lot page worth comparing.
    fn is_lot_page(&self, page: &PageSnapshot) -> bool;

    /// Mutation-observer settings for live updates.
    fn mutation_config(&self) -> MutationConfig {
        MutationConfig::default()
    }
}

/// Live view of the page the host is showing.
///
/// Each call to `snapshot` re-reads the page, so a retry after a delay
/// sees prices that rendered asynchronously.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn snapshot(&self) -> PageSnapshot;
}

#[async_trait]
impl PageSource for PageSnapshot {
    async fn snapshot(&self) -> PageSnapshot {
        self.clone()
    }
}

/// Domain → adapter lookup table.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own domain.
    pub fn register(mut self, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.adapters
            .insert(adapter.domain().to_lowercase(), adapter);
        self
    }

    /// Find the adapter for a domain, walking up subdomains.
    ///
    /// `fr.catawiki.com` resolves to an adapter registered for `catawiki.com`.
    pub fn for_domain(&self, domain: &str) -> Option<Arc<dyn SiteAdapter>> {
        let domain = domain.to_lowercase();
        let mut candidate = domain.trim_start_matches("www.");
        loop {
            if let Some(adapter) = self.adapters.get(candidate) {
                return Some(Arc::clone(adapter));
            }
            match candidate.split_once('.') {
                Some((_, rest)) if rest.contains('.') => candidate = rest,
                _ => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAdapter;

    #[test]
    fn test_registry_resolves_subdomains() {
        let registry =
            AdapterRegistry::new().register(Arc::new(MockAdapter::new("catawiki.com")));

        assert!(registry.for_domain("catawiki.com").is_some());
        assert!(registry.for_domain("fr.catawiki.com").is_some());
        assert!(registry.for_domain("www.catawiki.com").is_some());
        assert!(registry.for_domain("ebay.com").is_none());
        assert!(registry.for_domain("com").is_none());
    }
}
