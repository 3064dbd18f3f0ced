//! Resilient auction extraction.
//!
//! `AdapterAttempt → RetryLoop → AiFallback → Merge → Minimal`, each
//! step running only when the previous one left the price unusable.
//! Adapter data is schema-exact and wins over AI data whenever both
//! exist; the AI only supplies what the adapter could not.

pub mod defaults;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ExtractionFailure;
use crate::traits::adapter::{AdapterRegistry, PageSource, SiteAdapter};
use crate::traits::ai::{AiExtraction, ProductAI};
use crate::types::{auction::AuctionData, config::ExtractorConfig, page::PageSnapshot};

pub use watcher::{LiveWatcher, PageSignal};

/// Orchestrates adapter extraction, retries and the AI fallback.
pub struct Extractor<A: ProductAI> {
    registry: AdapterRegistry,
    ai: Arc<A>,
    config: ExtractorConfig,
}

impl<A: ProductAI> Extractor<A> {
    pub fn new(registry: AdapterRegistry, ai: Arc<A>) -> Self {
        Self {
            registry,
            ai,
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Extract one `AuctionData` from the page.
    ///
    /// Fails only when no path produced a title or a price.
    pub async fn extract<P: PageSource + ?Sized>(
        &self,
        page: &P,
    ) -> Result<AuctionData, ExtractionFailure> {
        let mut snapshot = page.snapshot().await;
        let domain = snapshot.domain.clone();
        let mut adapter_data = None;

        if let Some(adapter) = self.registry.for_domain(&domain) {
            if !adapter.is_lot_page(&snapshot) {
                return Err(ExtractionFailure::new(&domain, "not a lot page"));
            }
            let (data, latest) = self.run_adapter(adapter.as_ref(), page, snapshot).await;
            adapter_data = data;
            snapshot = latest;

            if let Some(data) = adapter_data.as_ref().filter(|d| d.has_usable_price()) {
                return Ok(data.clone());
            }
            debug!(domain = %domain, "Adapter left price unusable, trying AI fallback");
        } else {
            debug!(domain = %domain, "No adapter registered, trying AI fallback");
        }

        match self.ai.extract_fallback(&snapshot).await {
            Ok(ai_data) => {
                if let Some(merged) = merge(adapter_data.clone(), ai_data, &snapshot) {
                    return Ok(merged);
                }
            }
            Err(e) => {
                warn!(domain = %domain, code = e.code(), error = %e, "AI extraction fallback failed");
            }
        }

        // A title without a price still renders; callers skip comparison at zero
        adapter_data.ok_or_else(|| ExtractionFailure::new(&domain, "no title or price found"))
    }

    /// Like [`extract`](Self::extract), degrading to a minimal record.
    pub async fn extract_or_minimal<P: PageSource + ?Sized>(&self, page: &P) -> AuctionData {
        match self.extract(page).await {
            Ok(data) => data,
            Err(failure) => {
                info!(domain = %failure.domain, reason = %failure.reason, "Extraction failed, using minimal record");
                minimal_record(&page.snapshot().await)
            }
        }
    }

    /// First adapter call plus the bounded, sequential retry loop.
    ///
    /// Returns the best data seen and the snapshot it was read from.
    async fn run_adapter<P: PageSource + ?Sized>(
        &self,
        adapter: &dyn SiteAdapter,
        page: &P,
        mut snapshot: PageSnapshot,
    ) -> (Option<AuctionData>, PageSnapshot) {
        let mut best = adapter
            .extract_data(&snapshot)
            .await
            .map(|d| complete_adapter_data(d, &snapshot));

        let mut waited = Duration::ZERO;
        for attempt in 1..=self.config.max_retries {
            if best.as_ref().is_some_and(AuctionData::has_usable_price) {
                break;
            }

            let delay = self.config.retry_base_delay * attempt;
            if waited + delay > self.config.max_total_wait {
                debug!(attempt, waited_ms = waited.as_millis() as u64, "Retry budget exhausted");
                break;
            }
            tokio::time::sleep(delay).await;
            waited += delay;

            snapshot = page.snapshot().await;
            debug!(domain = %snapshot.domain, attempt, "Retrying adapter extraction");
            if let Some(data) = adapter.extract_data(&snapshot).await {
                best = Some(complete_adapter_data(data, &snapshot));
            }
        }

        (best, snapshot)
    }
}

/// Fill what adapters commonly leave out and restore the total invariant.
fn complete_adapter_data(mut data: AuctionData, snapshot: &PageSnapshot) -> AuctionData {
    if data.site_domain.is_empty() {
        data.site_domain = snapshot.domain.clone();
    }
    if data.lot_url.is_empty() {
        data.lot_url = snapshot.url.clone();
    }
    // the page's declared locale beats the constructor default
    if let Some(locale) = snapshot.locale.as_ref().filter(|l| !l.is_empty()) {
        data.locale = locale.clone();
    }
    if data.fees.buyer_premium <= 0.0 {
        data.fees.buyer_premium = defaults::buyer_premium(&data.site_domain);
    }
    if data.extraction_confidence.is_none() {
        data.extraction_confidence = Some(1.0);
    }
    data.recompute_total();
    data
}

/// Combine adapter output (possibly absent) with the AI fallback.
///
/// Only price fields are taken from the AI when the adapter has a title.
fn merge(
    adapter_data: Option<AuctionData>,
    ai_data: AiExtraction,
    snapshot: &PageSnapshot,
) -> Option<AuctionData> {
    match adapter_data {
        Some(mut data) => {
            let price = ai_data.usable_price()?;
            debug!(domain = %data.site_domain, bid = price.value, "Merging AI price into adapter data");
            data.currency = price.currency.clone();
            data.set_bid(price.value);
            Some(data)
        }
        None => {
            let title = ai_data.title.clone().filter(|t| !t.trim().is_empty());
            let price = ai_data.usable_price().cloned();
            if title.is_none() && price.is_none() {
                return None;
            }

            let domain = if ai_data.domain.is_empty() {
                snapshot.domain.clone()
            } else {
                ai_data.domain.clone()
            };
            let currency = price
                .as_ref()
                .map(|p| p.currency.clone())
                .unwrap_or_else(|| defaults::currency(&domain).to_string());
            let premium = ai_data
                .lot_page_info
                .buyer_premium
                .filter(|p| *p > 0.0)
                .unwrap_or_else(|| defaults::buyer_premium(&domain));

            let data = AuctionData::new(
                title.unwrap_or_else(|| snapshot.fallback_title()),
                price.map(|p| p.value).unwrap_or(0.0),
                currency,
                domain,
            )
            .with_buyer_premium(premium)
            .with_lot_url(snapshot.url.clone())
            .with_locale(snapshot.locale.clone().unwrap_or_else(|| "en".to_string()))
            .with_confidence(ai_data.confidence);

            Some(data)
        }
    }
}

/// Record shown when every path failed: page title, price zero.
pub fn minimal_record(snapshot: &PageSnapshot) -> AuctionData {
    AuctionData::new(
        snapshot.fallback_title(),
        0.0,
        defaults::currency(&snapshot.domain),
        snapshot.domain.clone(),
    )
    .with_buyer_premium(defaults::buyer_premium(&snapshot.domain))
    .with_lot_url(snapshot.url.clone())
    .with_locale(snapshot.locale.clone().unwrap_or_else(|| "en".to_string()))
    .with_confidence(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAI, MockAdapter};
    use crate::traits::ai::{AiPrice, LotPageInfo};

    fn lot_page() -> PageSnapshot {
        PageSnapshot::new("https://www.drouot.com/l/42")
            .with_meta_title("Lot 42 - Omega Speedmaster")
            .with_locale("fr")
    }

    fn ai_price(value: f64, currency: &str) -> AiExtraction {
        AiExtraction {
            title: Some("AI title".into()),
            price: Some(AiPrice {
                value,
                currency: currency.into(),
            }),
            confidence: 0.6,
            domain: "drouot.com".into(),
            lot_page_info: LotPageInfo::default(),
        }
    }

    fn extractor(adapter: MockAdapter, ai: MockAI) -> Extractor<MockAI> {
        Extractor::new(
            AdapterRegistry::new().register(Arc::new(adapter)),
            Arc::new(ai),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_with_price_needs_no_fallback() {
        let adapter = MockAdapter::new("drouot.com")
            .then_return(Some(AuctionData::new("Omega Speedmaster", 1000.0, "EUR", "drouot.com")));
        let ai = Arc::new(MockAI::new());
        let extractor = Extractor::new(
            AdapterRegistry::new().register(Arc::new(adapter)),
            Arc::clone(&ai),
        );

        let data = extractor.extract(&lot_page()).await.unwrap();
        assert_eq!(data.current_bid, 1000.0);
        // drouot default premium
        assert_eq!(data.total_price, 1250.0);
        assert!(ai.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_picks_up_late_price() {
        let adapter = MockAdapter::new("drouot.com")
            .then_return(Some(AuctionData::new("Omega Speedmaster", 0.0, "EUR", "drouot.com")))
            .then_return(Some(AuctionData::new("Omega Speedmaster", 0.0, "EUR", "drouot.com")))
            .then_return(Some(AuctionData::new("Omega Speedmaster", 800.0, "EUR", "drouot.com")));
        let counter = adapter.call_counter();
        let extractor = extractor(adapter, MockAI::new());

        let data = extractor.extract(&lot_page()).await.unwrap();
        assert_eq!(data.current_bid, 800.0);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let adapter = MockAdapter::new("drouot.com")
            .then_return(Some(AuctionData::new("Omega Speedmaster", 0.0, "EUR", "drouot.com")));
        let counter = adapter.call_counter();
        let extractor = extractor(adapter, MockAI::new()).with_config(
            ExtractorConfig::default()
                .with_max_retries(10)
                .with_retry_base_delay(Duration::from_millis(500))
                .with_max_total_wait(Duration::from_secs(3)),
        );

        let start = tokio::time::Instant::now();
        let _ = extractor.extract(&lot_page()).await;
        // 500 + 1000 + 1500 = 3000ms; the fourth retry would exceed the cap
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert!(start.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_price_merged_into_adapter_data() {
        let adapter = MockAdapter::new("drouot.com").then_return(Some(
            AuctionData::new("Omega Speedmaster Professional", 0.0, "EUR", "drouot.com")
                .with_condition("bon état"),
        ));
        let ai = MockAI::new().with_page_extraction("drouot.com", ai_price(900.0, "CHF"));
        let extractor = extractor(adapter, ai);

        let data = extractor.extract(&lot_page()).await.unwrap();
        // adapter fields kept, price fields from AI
        assert_eq!(data.title, "Omega Speedmaster Professional");
        assert_eq!(data.condition.as_deref(), Some("bon état"));
        assert_eq!(data.current_bid, 900.0);
        assert_eq!(data.currency, "CHF");
        assert_eq!(data.total_price, 900.0 * 1.25);
    }

    #[tokio::test]
    async fn test_no_adapter_uses_ai_output() {
        let ai = MockAI::new().with_page_extraction("drouot.com", ai_price(300.0, "EUR"));
        let extractor = Extractor::new(AdapterRegistry::new(), Arc::new(ai));

        let data = extractor.extract(&lot_page()).await.unwrap();
        assert_eq!(data.title, "AI title");
        assert_eq!(data.current_bid, 300.0);
        assert_eq!(data.extraction_confidence, Some(0.6));
        assert_eq!(data.lot_url, "https://www.drouot.com/l/42");
    }

    #[tokio::test]
    async fn test_everything_fails_degrades_to_minimal() {
        let extractor = Extractor::new(AdapterRegistry::new(), Arc::new(MockAI::new().failing()));

        assert!(extractor.extract(&lot_page()).await.is_err());

        let data = extractor.extract_or_minimal(&lot_page()).await;
        assert_eq!(data.title, "Lot 42 - Omega Speedmaster");
        assert_eq!(data.current_bid, 0.0);
        assert!(!data.has_usable_price());
    }

    #[tokio::test]
    async fn test_non_lot_page_is_rejected() {
        let adapter = MockAdapter::new("drouot.com").not_a_lot_page();
        let extractor = extractor(adapter, MockAI::new());
        let err = extractor.extract(&lot_page()).await.unwrap_err();
        assert_eq!(err.reason, "not a lot page");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_page_is_not_changed() {
        let adapter = MockAdapter::new("drouot.com")
            .then_return(Some(AuctionData::new("Omega Speedmaster", 500.0, "EUR", "drouot.com")));
        let extractor = extractor(adapter, MockAI::new());

        let first = extractor.extract(&lot_page()).await.unwrap();
        let second = extractor.extract(&lot_page()).await.unwrap();
        assert!(!first.has_changed(&second));
    }
}
