//! Web price searcher trait.
//!
//! The core does not care which shopping/search provider answers, only
//! that results carry enough fields for scoring (title, price, source).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{SearchError, SearchResult};
use crate::types::price::WebPriceResult;

/// A single price search.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuery {
    pub query: String,

    /// Two-letter locale (selects the market, e.g. `fr` → google.fr)
    pub locale: String,

    /// Currency the auction is priced in
    pub currency: String,

    pub limit: usize,
}

impl PriceQuery {
    pub fn new(query: impl Into<String>, locale: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            locale: locale.into(),
            currency: currency.into(),
            limit: 20,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Web search for current market prices.
#[async_trait]
pub trait PriceSearcher: Send + Sync {
    async fn search(&self, query: &PriceQuery) -> SearchResult<Vec<WebPriceResult>>;
}

/// Mock price searcher for testing.
///
/// Answers from a query → results table; unknown queries return nothing.
/// Queries registered with `failing` return a provider error.
#[derive(Default)]
pub struct MockPriceSearcher {
    results: RwLock<HashMap<String, Vec<WebPriceResult>>>,
    failing: RwLock<Vec<String>>,
    calls: RwLock<Vec<String>>,
}

impl MockPriceSearcher {
    /// Create a new mock searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for a query.
    pub fn with_results(self, query: &str, results: Vec<WebPriceResult>) -> Self {
        self.results
            .write()
            .unwrap()
            .insert(query.to_string(), results);
        self
    }

    /// Make a query fail with an HTTP error.
    pub fn failing(self, query: &str) -> Self {
        self.failing.write().unwrap().push(query.to_string());
        self
    }

    /// Queries received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PriceSearcher for MockPriceSearcher {
    async fn search(&self, query: &PriceQuery) -> SearchResult<Vec<WebPriceResult>> {
        self.calls.write().unwrap().push(query.query.clone());

        if self.failing.read().unwrap().contains(&query.query) {
            return Err(SearchError::Http("mock provider unreachable".into()));
        }

        let mut results = self
            .results
            .read()
            .unwrap()
            .get(&query.query)
            .cloned()
            .unwrap_or_default();
        results.truncate(query.limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_price_searcher() {
        let searcher = MockPriceSearcher::new().with_results(
            "apple iphone 13 128",
            vec![
                WebPriceResult::new("iPhone 13 128GB", 450.0, "Back Market"),
                WebPriceResult::new("Apple iPhone 13 128 Go", 470.0, "Fnac"),
            ],
        );

        let query = PriceQuery::new("apple iphone 13 128", "fr", "EUR").with_limit(1);
        let results = searcher.search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(searcher.calls(), vec!["apple iphone 13 128".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_failing_query() {
        let searcher = MockPriceSearcher::new().failing("down");
        let result = searcher.search(&PriceQuery::new("down", "en", "USD")).await;
        assert!(matches!(result, Err(SearchError::Http(_))));
    }
}
