//! The Comparator - main entry point for price comparison.
//!
//! Runs one auction through normalization, the tiered cache and, on a
//! miss, the web price search. Cache instances are injected so every
//! request handler shares the same ones.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{CacheTier, ComparisonCache, ResponseMemo};
use crate::error::{CompareError, Result};
use crate::normalize::{cache_key, normalize_with_ai, signatures};
use crate::scoring;
use crate::traits::{
    ai::ProductAI,
    searcher::{PriceQuery, PriceSearcher},
};
use crate::types::{
    auction::AuctionData,
    config::CompareConfig,
    price::WebPriceResult,
    product::{NormalizeRequest, NormalizedProduct, ProductSignatures},
    response::{CacheInfo, CacheSource, CompareResponse, UsageInfo},
};

/// Compares auction lots against current web prices.
///
/// # Example
///
/// ```rust,ignore
/// let comparator = Comparator::new(Arc::new(ai), searcher, CompareConfig::default());
///
/// let response = comparator.compare(&auction).await?;
/// println!("{:?}: {}", response.verdict.status, response.verdict.reason);
/// ```
pub struct Comparator<A: ProductAI, S: PriceSearcher> {
    ai: Arc<A>,
    searcher: S,
    cache: Arc<ComparisonCache>,
    memo: Arc<ResponseMemo>,
    config: CompareConfig,
    fresh_fetches: AtomicU64,
    cache_hits: AtomicU64,
}

impl<A: ProductAI, S: PriceSearcher> Comparator<A, S> {
    /// Create a comparator with caches sized from `config.cache`.
    pub fn new(ai: Arc<A>, searcher: S, config: CompareConfig) -> Self {
        Self {
            ai,
            searcher,
            cache: Arc::new(ComparisonCache::from_config(&config.cache)),
            memo: Arc::new(ResponseMemo::new(config.cache.memo_capacity)),
            config,
            fresh_fetches: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Use a shared comparison cache.
    pub fn with_cache(mut self, cache: Arc<ComparisonCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a shared response memo.
    pub fn with_memo(mut self, memo: Arc<ResponseMemo>) -> Self {
        self.memo = memo;
        self
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ComparisonCache> {
        &self.cache
    }

    pub fn searcher(&self) -> &S {
        &self.searcher
    }

    /// Quota counters since this comparator was created.
    pub fn usage(&self) -> UsageInfo {
        UsageInfo {
            fresh_fetches: self.fresh_fetches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Full comparison for one auction.
    ///
    /// Search failures surface as [`CompareError::Api`]; they are never
    /// turned into a verdict.
    pub async fn compare(&self, auction: &AuctionData) -> Result<CompareResponse> {
        if !auction.has_usable_price() {
            return Err(CompareError::NoPrice);
        }

        let memo_key = cache_key(
            &auction.title,
            &auction.currency,
            &auction.locale,
            None,
            None,
        );
        if let Some(response) = self.memo.get(&memo_key) {
            let source = memo_source(&response);
            debug!(key = %memo_key, tier = ?source, "Response memo hit");
            return Ok(self.finish_cached(response, auction, source));
        }

        let request = NormalizeRequest::new(&auction.title, &auction.locale)
            .with_site_domain(&auction.site_domain);
        let normalized = normalize_with_ai(self.ai.as_ref(), &request)
            .await
            .map_err(|e| CompareError::InvalidInput {
                reason: e.to_string(),
            })?;
        let product = normalized.product;
        let sigs = signatures(&product);

        if let Some(hit) = self.cache.get(&sigs.strict, &sigs.loose) {
            let source = hit.tier.source();
            let response = match hit.tier {
                CacheTier::Strict => hit.response,
                // Another condition: same market, but the verdict is ours
                CacheTier::Loose => {
                    let mut response = hit.response;
                    response.normalized = Some(product.clone());
                    response
                }
            };
            let response = self.finish_cached(response, auction, source);
            self.memo_response(&memo_key, &response);
            return Ok(response);
        }
        debug!(signature = %sigs.strict, "Cache miss");

        let response = self.fetch_fresh(auction, &product, &sigs).await?;
        self.memo_response(&memo_key, &response);
        Ok(response)
    }

    /// Compare with cancellation support.
    ///
    /// A cancelled comparison leaves the caches untouched.
    pub async fn compare_with_cancel(
        &self,
        auction: &AuctionData,
        cancel: CancellationToken,
    ) -> Result<CompareResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CompareError::Cancelled),
            result = self.compare(auction) => result,
        }
    }

    /// Search, score and store a comparison nobody cached yet.
    async fn fetch_fresh(
        &self,
        auction: &AuctionData,
        product: &NormalizedProduct,
        sigs: &ProductSignatures,
    ) -> Result<CompareResponse> {
        let mut seen = HashSet::new();
        let mut relevant = self.search_relevant(auction, product, &product.query, &mut seen).await?;

        if relevant.len() < self.config.min_results {
            for alt in &product.alt_queries {
                if alt == &product.query {
                    continue;
                }
                debug!(query = %alt, found = relevant.len(), "Too few results, trying alternate query");
                relevant.extend(self.search_relevant(auction, product, alt, &mut seen).await?);
                if relevant.len() >= self.config.min_results {
                    break;
                }
            }
        }

        let stats = scoring::stats(&relevant);
        let confidence = scoring::confidence(&relevant);
        let verdict = scoring::verdict(auction.total_price, &stats, self.config.margin_pct);

        let mut response = CompareResponse {
            query_used: product.query.clone(),
            results: relevant,
            stats,
            confidence,
            verdict,
            cache: None,
            normalized: Some(product.clone()),
            usage: None,
        };

        // Every await is behind us: a cancelled request never gets here
        let fetched_at = Utc::now();
        let id = self
            .cache
            .put(&sigs.strict, &sigs.loose, response.clone(), self.config.cache_ttl);

        let fresh = self.fresh_fetches.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            signature = %sigs.strict,
            results = response.results.len(),
            fresh_fetches = fresh,
            "Fresh comparison cached"
        );

        response.cache = Some(CacheInfo {
            source: CacheSource::FreshFetch,
            cache_entry_id: Some(id),
            fetched_at: Some(fetched_at),
            expires_at: chrono::Duration::from_std(self.config.cache_ttl)
                .ok()
                .and_then(|ttl| fetched_at.checked_add_signed(ttl)),
            signature_used: Some(sigs.strict.clone()),
        });
        response.usage = Some(self.usage());
        Ok(response)
    }

    /// One search call, scored and filtered, minus results already seen.
    async fn search_relevant(
        &self,
        auction: &AuctionData,
        product: &NormalizedProduct,
        query: &str,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<WebPriceResult>> {
        let query = PriceQuery::new(query, &product.locale, &auction.currency);
        let mut results = self.searcher.search(&query).await?;

        scoring::score_results(
            &mut results,
            &auction.title,
            product.brand.as_deref(),
            product.model.as_deref(),
        );

        Ok(scoring::filter_relevant(results, self.config.min_relevance)
            .into_iter()
            .filter(|r| seen.insert(dedupe_key(r)))
            .collect())
    }

    /// Re-score a cached response for this auction and stamp usage.
    fn finish_cached(
        &self,
        mut response: CompareResponse,
        auction: &AuctionData,
        source: CacheSource,
    ) -> CompareResponse {
        response.verdict =
            scoring::verdict(auction.total_price, &response.stats, self.config.margin_pct);

        let mut cache = response
            .cache
            .take()
            .unwrap_or_else(|| CacheInfo::new(source));
        cache.source = source;
        response.cache = Some(cache);

        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        response.usage = Some(self.usage());
        response
    }

    fn memo_response(&self, key: &str, response: &CompareResponse) {
        if let Some(expires_at) = response.cache.as_ref().and_then(|c| c.expires_at) {
            self.memo.put(key, response.clone(), expires_at);
        }
    }
}

/// Tier reported for a memoized response.
///
/// A memoized fresh fetch is now a strict reuse; a cross-condition
/// (loose) answer stays loose.
fn memo_source(response: &CompareResponse) -> CacheSource {
    match response.cache_source() {
        Some(CacheSource::CacheLoose) => CacheSource::CacheLoose,
        _ => CacheSource::CacheStrict,
    }
}

fn dedupe_key(result: &WebPriceResult) -> String {
    if result.url.is_empty() {
        format!("{}|{}", result.title, result.source)
    } else {
        result.url.clone()
    }
}
