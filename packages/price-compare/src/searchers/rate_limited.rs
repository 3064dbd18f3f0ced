//! Rate-limited searcher wrapper.
//!
//! Wraps any PriceSearcher implementation with rate limiting using the
//! governor crate. Search providers bill per call and throttle bursts,
//! so every outgoing query goes through one shared quota.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use crate::error::{SearchError, SearchResult};
use crate::traits::searcher::{PriceQuery, PriceSearcher};
use crate::types::price::WebPriceResult;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A searcher wrapper that enforces rate limits.
pub struct RateLimitedSearcher<S: PriceSearcher> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
    fail_fast: bool,
}

impl<S: PriceSearcher> RateLimitedSearcher<S> {
    /// Create a new rate-limited searcher (minimum 1 request per second).
    pub fn new(searcher: S, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(searcher, Quota::per_second(rps))
    }

    /// Create with a custom quota.
    pub fn with_quota(searcher: S, quota: Quota) -> Self {
        Self {
            inner: searcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
            fail_fast: false,
        }
    }

    /// Create with burst support.
    pub fn with_burst(searcher: S, requests_per_second: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(burst).unwrap_or(nonzero!(1u32));
        Self::with_quota(searcher, Quota::per_second(rps).allow_burst(burst))
    }

    /// Reject over-quota calls with [`SearchError::RateLimited`] instead
    /// of waiting for a permit.
    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }
}

#[async_trait]
impl<S: PriceSearcher> PriceSearcher for RateLimitedSearcher<S> {
    async fn search(&self, query: &PriceQuery) -> SearchResult<Vec<WebPriceResult>> {
        if self.fail_fast {
            if self.limiter.check().is_err() {
                debug!(query = %query.query, "Search quota exhausted");
                return Err(SearchError::RateLimited);
            }
        } else {
            self.limiter.until_ready().await;
        }
        self.inner.search(query).await
    }
}

/// Extension trait for easy rate limiting.
pub trait SearcherExt: PriceSearcher + Sized {
    /// Wrap this searcher with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedSearcher<Self> {
        RateLimitedSearcher::new(self, requests_per_second)
    }
}

impl<S: PriceSearcher + Sized> SearcherExt for S {}
