//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the comparison
//! library without making real AI or network calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{NormalizationError, NormalizationResult};
use crate::traits::{
    adapter::SiteAdapter,
    ai::{AiExtraction, ProductAI},
};
use crate::types::{
    auction::AuctionData,
    page::PageSnapshot,
    price::{ConfidenceLevel, PriceStats, Verdict, VerdictStatus, WebPriceResult},
    product::{AiProductGuess, NormalizeRequest},
    response::CompareResponse,
};

/// A mock AI implementation for testing.
///
/// Returns configurable responses keyed by raw title (normalization) or
/// by page domain (extraction fallback). Unknown inputs get an empty
/// answer, never an error, unless the mock was built with `failing`.
#[derive(Default)]
pub struct MockAI {
    /// Predefined guesses by raw title
    guesses: Arc<RwLock<HashMap<String, AiProductGuess>>>,

    /// Predefined fallback extractions by domain
    extractions: Arc<RwLock<HashMap<String, AiExtraction>>>,

    fail: bool,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAICall>>>,
}

/// Record of a call made to the mock AI.
#[derive(Debug, Clone, PartialEq)]
pub enum MockAICall {
    Normalize { raw_title: String },
    ExtractFallback { domain: String },
}

impl MockAI {
    /// Create a new mock AI with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predefined guess for a raw title.
    pub fn with_guess(self, raw_title: impl Into<String>, guess: AiProductGuess) -> Self {
        self.guesses.write().unwrap().insert(raw_title.into(), guess);
        self
    }

    /// Add a predefined fallback extraction for a domain.
    pub fn with_page_extraction(self, domain: impl Into<String>, extraction: AiExtraction) -> Self {
        self.extractions
            .write()
            .unwrap()
            .insert(domain.into(), extraction);
        self
    }

    /// Make every call fail with a provider error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn provider_error() -> NormalizationError {
        NormalizationError::ProviderError(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Mock provider unreachable",
        )))
    }
}

#[async_trait]
impl ProductAI for MockAI {
    async fn normalize(&self, request: &NormalizeRequest) -> NormalizationResult<AiProductGuess> {
        self.calls.write().unwrap().push(MockAICall::Normalize {
            raw_title: request.raw_title.clone(),
        });

        if self.fail {
            return Err(Self::provider_error());
        }

        Ok(self
            .guesses
            .read()
            .unwrap()
            .get(&request.raw_title)
            .cloned()
            .unwrap_or_default())
    }

    async fn extract_fallback(&self, page: &PageSnapshot) -> NormalizationResult<AiExtraction> {
        self.calls.write().unwrap().push(MockAICall::ExtractFallback {
            domain: page.domain.clone(),
        });

        if self.fail {
            return Err(Self::provider_error());
        }

        Ok(self
            .extractions
            .read()
            .unwrap()
            .get(&page.domain)
            .cloned()
            .unwrap_or_else(|| AiExtraction {
                title: None,
                price: None,
                confidence: 0.0,
                domain: page.domain.clone(),
                lot_page_info: Default::default(),
            }))
    }
}

/// A mock site adapter for testing.
///
/// Hands out queued results in order; the last one repeats once the
/// queue is down to a single entry.
pub struct MockAdapter {
    domain: String,
    results: Mutex<VecDeque<Option<AuctionData>>>,
    lot_page: bool,
    calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    /// Create an adapter that finds nothing until results are queued.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            results: Mutex::new(VecDeque::new()),
            lot_page: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue the result of the next `extract_data` call.
    pub fn then_return(self, result: Option<AuctionData>) -> Self {
        self.results.lock().unwrap().push_back(result);
        self
    }

    /// Report every page as something other than a lot page.
    pub fn not_a_lot_page(mut self) -> Self {
        self.lot_page = false;
        self
    }

    /// Shared counter of `extract_data` calls.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SiteAdapter for MockAdapter {
    fn domain(&self) -> &str {
        &self.domain
    }

    async fn extract_data(&self, _page: &PageSnapshot) -> Option<AuctionData> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut results = self.results.lock().unwrap();
        if results.len() > 1 {
            results.pop_front().flatten()
        } else {
            results.front().cloned().flatten()
        }
    }

    fn is_lot_page(&self, _page: &PageSnapshot) -> bool {
        self.lot_page
    }
}

/// A fresh-fetch style response with three results, for cache tests.
pub fn sample_response(query: &str) -> CompareResponse {
    let results = vec![
        WebPriceResult::new(format!("{query} A"), 100.0, "shop-a").with_relevance(0.9),
        WebPriceResult::new(format!("{query} B"), 150.0, "shop-b").with_relevance(0.8),
        WebPriceResult::new(format!("{query} C"), 200.0, "shop-c").with_relevance(0.7),
    ];

    CompareResponse {
        query_used: query.to_string(),
        results,
        stats: PriceStats {
            min: 100.0,
            max: 200.0,
            median: 150.0,
            average: 150.0,
            count: 3,
        },
        confidence: ConfidenceLevel::Medium,
        verdict: Verdict {
            status: VerdictStatus::Borderline,
            margin: -20.0,
            reason: "120.00 is between the lowest (100.00) and median (150.00) market prices"
                .to_string(),
        },
        cache: None,
        normalized: None,
        usage: None,
    }
}
