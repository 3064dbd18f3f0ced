//! Debounced re-extraction for pages that update in place.
//!
//! Bursts of DOM-change signals collapse into a single extraction once
//! the debounce window closes. Subscribers only see a new value when the
//! bid, total or title actually moved.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Extractor;
use crate::traits::adapter::PageSource;
use crate::traits::ai::ProductAI;
use crate::types::auction::AuctionData;

/// "The page changed" notification from the host's mutation observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSignal;

/// Handle to a running watcher task.
pub struct LiveWatcher {
    signals: mpsc::Sender<PageSignal>,
    latest: watch::Receiver<Option<AuctionData>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LiveWatcher {
    /// Start watching `page`, seeded with the last known data.
    pub fn spawn<A, P>(
        extractor: Arc<Extractor<A>>,
        page: Arc<P>,
        debounce: Duration,
        initial: Option<AuctionData>,
    ) -> Self
    where
        A: ProductAI + 'static,
        P: PageSource + ?Sized + 'static,
    {
        // One pending signal is enough: anything else arriving meanwhile
        // is covered by the extraction it will trigger.
        let (signals, mut rx) = mpsc::channel::<PageSignal>(1);
        let (tx, latest) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    signal = rx.recv() => {
                        if signal.is_none() {
                            break;
                        }
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(debounce) => {}
                }
                while rx.try_recv().is_ok() {}

                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    result = extractor.extract(page.as_ref()) => result,
                };

                match result {
                    Ok(data) => {
                        let published = tx.send_if_modified(|current| match current {
                            Some(previous) if !previous.has_changed(&data) => false,
                            _ => {
                                *current = Some(data);
                                true
                            }
                        });
                        debug!(published, "Live re-extraction finished");
                    }
                    Err(failure) => {
                        debug!(domain = %failure.domain, reason = %failure.reason, "Live re-extraction failed");
                    }
                }
            }
            info!("Live watcher stopped");
        });

        Self {
            signals,
            latest,
            cancel,
            handle,
        }
    }

    /// Report that the page changed. Never blocks.
    pub fn notify(&self) {
        let _ = self.signals.try_send(PageSignal);
    }

    /// Receiver that wakes whenever the extracted data changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuctionData>> {
        self.latest.clone()
    }

    /// Most recently published data.
    pub fn current(&self) -> Option<AuctionData> {
        self.latest.borrow().clone()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAI, MockAdapter};
    use crate::traits::adapter::AdapterRegistry;
    use crate::types::page::PageSnapshot;
    use std::sync::atomic::Ordering;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    fn page() -> Arc<PageSnapshot> {
        Arc::new(PageSnapshot::new("https://www.catawiki.com/l/1"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_signals_runs_one_extraction() {
        let adapter = MockAdapter::new("catawiki.com")
            .then_return(Some(AuctionData::new("Leica M6", 1200.0, "EUR", "catawiki.com")));
        let counter = adapter.call_counter();
        let extractor = Arc::new(Extractor::new(
            AdapterRegistry::new().register(Arc::new(adapter)),
            Arc::new(MockAI::new()),
        ));

        let watcher = LiveWatcher::spawn(extractor, page(), DEBOUNCE, None);
        for _ in 0..5 {
            watcher.notify();
        }
        tokio::time::sleep(DEBOUNCE * 3).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.current().map(|d| d.current_bid), Some(1200.0));
        watcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_only_on_change() {
        let adapter = MockAdapter::new("catawiki.com")
            .then_return(Some(AuctionData::new("Leica M6", 1200.0, "EUR", "catawiki.com")))
            .then_return(Some(AuctionData::new("Leica M6", 1200.0, "EUR", "catawiki.com")))
            .then_return(Some(AuctionData::new("Leica M6", 1300.0, "EUR", "catawiki.com")));
        let extractor = Arc::new(Extractor::new(
            AdapterRegistry::new().register(Arc::new(adapter)),
            Arc::new(MockAI::new()),
        ));

        let watcher = LiveWatcher::spawn(extractor, page(), DEBOUNCE, None);
        let mut rx = watcher.subscribe();

        watcher.notify();
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // same bid: nothing published
        watcher.notify();
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert!(!rx.has_changed().unwrap());

        watcher.notify();
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|d| d.current_bid),
            Some(1300.0)
        );

        watcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_extraction() {
        let adapter = MockAdapter::new("catawiki.com")
            .then_return(Some(AuctionData::new("Leica M6", 1200.0, "EUR", "catawiki.com")));
        let counter = adapter.call_counter();
        let extractor = Arc::new(Extractor::new(
            AdapterRegistry::new().register(Arc::new(adapter)),
            Arc::new(MockAI::new()),
        ));

        let watcher = LiveWatcher::spawn(extractor, page(), DEBOUNCE, None);
        watcher.notify();
        watcher.shutdown().await;

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
