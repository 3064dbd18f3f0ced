//! Signature-keyed comparison cache with tiered lookup.
//!
//! Entries are keyed by the strict signature; a loose index maps each
//! loose signature to the strict keys stored under it, newest first. One mutex
//! guards the LRU map and the index so eviction bookkeeping and TTL
//! stamps never disagree.

use chrono::{DateTime, Utc};
use lru::LruCache;
use nonzero_ext::nonzero;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::types::config::CacheConfig;
use crate::types::response::{CacheInfo, CacheSource, CompareResponse};

/// Which lookup tier produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Same product and condition; reuse verbatim
    Strict,
    /// Same product, possibly another condition; re-score before use
    Loose,
}

impl CacheTier {
    pub fn source(&self) -> CacheSource {
        match self {
            Self::Strict => CacheSource::CacheStrict,
            Self::Loose => CacheSource::CacheLoose,
        }
    }
}

/// A cache hit, with `response.cache` describing where it came from.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub tier: CacheTier,
    pub response: CompareResponse,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    id: String,
    key: String,
    loose_key: String,
    value: CompareResponse,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn to_hit(&self, tier: CacheTier, signature: &str) -> CacheHit {
        let mut response = self.value.clone();
        response.cache = Some(CacheInfo {
            source: tier.source(),
            cache_entry_id: Some(self.id.clone()),
            fetched_at: Some(self.cached_at),
            expires_at: Some(self.expires_at),
            signature_used: Some(signature.to_string()),
        });
        CacheHit { tier, response }
    }
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    /// loose key → strict keys, most recently stored first
    loose_index: HashMap<String, VecDeque<String>>,
}

impl Inner {
    /// Remove an entry and its loose index row.
    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.pop(key) {
            self.unindex(&entry.loose_key, &entry.key);
        }
    }

    fn index(&mut self, loose_key: &str, strict_key: &str) {
        let keys = self.loose_index.entry(loose_key.to_string()).or_default();
        keys.retain(|k| k != strict_key);
        keys.push_front(strict_key.to_string());
    }

    fn unindex(&mut self, loose_key: &str, strict_key: &str) {
        if let Some(keys) = self.loose_index.get_mut(loose_key) {
            keys.retain(|k| k != strict_key);
            if keys.is_empty() {
                self.loose_index.remove(loose_key);
            }
        }
    }

    /// Newest live entry under `loose_key`. Dead candidates are pruned
    /// on the way.
    fn find_loose(&mut self, loose_key: &str, now: DateTime<Utc>) -> Option<String> {
        let candidates: Vec<String> = self.loose_index.get(loose_key)?.iter().cloned().collect();
        for key in candidates {
            match self.entries.peek(&key).map(|e| (e.is_expired(now), e.loose_key == loose_key)) {
                Some((false, true)) => return Some(key),
                Some((true, _)) => self.remove(&key),
                // stale row: the strict key now lives under another loose key, or is gone
                _ => self.unindex(loose_key, &key),
            }
        }
        None
    }
}

/// Bounded, TTL-stamped store of comparison responses.
///
/// Constructed once and shared (`Arc<ComparisonCache>`) by every request
/// handler.
pub struct ComparisonCache {
    inner: Mutex<Inner>,
    default_ttl: Duration,
}

impl ComparisonCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(nonzero!(1usize));
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                loose_index: HashMap::new(),
            }),
            default_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.default_ttl)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tiered lookup: strict key first, then the loose key.
    ///
    /// Expired entries are dropped on sight and never returned. A hit
    /// refreshes the entry's recency.
    pub fn get(&self, strict_key: &str, loose_key: &str) -> Option<CacheHit> {
        let now = Utc::now();
        let mut inner = self.lock();

        match inner.entries.get(strict_key).map(|e| e.is_expired(now)) {
            Some(false) => {
                debug!(signature = %strict_key, tier = "strict", "Cache hit");
                return inner
                    .entries
                    .peek(strict_key)
                    .map(|e| e.to_hit(CacheTier::Strict, strict_key));
            }
            Some(true) => {
                debug!(signature = %strict_key, "Dropping expired cache entry");
                inner.remove(strict_key);
            }
            None => {}
        }

        let target = inner.find_loose(loose_key, now)?;
        debug!(signature = %loose_key, tier = "loose", "Cache hit");
        inner
            .entries
            .get(&target)
            .map(|e| e.to_hit(CacheTier::Loose, loose_key))
    }

    /// Store a response under its strict key, indexed by its loose key.
    ///
    /// Returns the new entry id. Inserting beyond capacity evicts the
    /// least-recently-used entry.
    pub fn put(
        &self,
        strict_key: &str,
        loose_key: &str,
        response: CompareResponse,
        ttl: Duration,
    ) -> String {
        let cached_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = cached_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let id = Uuid::now_v7().to_string();

        let entry = CacheEntry {
            id: id.clone(),
            key: strict_key.to_string(),
            loose_key: loose_key.to_string(),
            value: response,
            cached_at,
            expires_at,
        };

        let mut inner = self.lock();
        if let Some((evicted_key, evicted)) = inner.entries.push(strict_key.to_string(), entry) {
            if evicted_key != strict_key {
                debug!(signature = %evicted_key, "Evicted least-recently-used cache entry");
            }
            inner.unindex(&evicted.loose_key, &evicted.key);
        }
        inner.index(loose_key, strict_key);

        id
    }

    /// Store with the cache's default TTL.
    pub fn put_default(&self, strict_key: &str, loose_key: &str, response: CompareResponse) -> String {
        self.put(strict_key, loose_key, response, self.default_ttl)
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Number of physically present entries (expired ones included).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.loose_index.clear();
    }
}

/// Whole-response memoization keyed by [`crate::normalize::cache_key`].
///
/// Short-circuits repeated comparisons of the very same listing before
/// normalization runs.
pub struct ResponseMemo {
    entries: Mutex<LruCache<String, (CompareResponse, DateTime<Utc>)>>,
}

impl ResponseMemo {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(nonzero!(1usize));
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<CompareResponse> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some((response, expires_at)) if now < *expires_at => Some(response.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, response: CompareResponse, expires_at: DateTime<Utc>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key.to_string(), (response, expires_at));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_response;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_strict_hit_is_tagged() {
        let cache = ComparisonCache::new(10, HOUR);
        let id = cache.put("strict-a", "loose-a", sample_response("q"), HOUR);

        let hit = cache.get("strict-a", "loose-a").unwrap();
        assert_eq!(hit.tier, CacheTier::Strict);
        let info = hit.response.cache.unwrap();
        assert_eq!(info.source, CacheSource::CacheStrict);
        assert_eq!(info.cache_entry_id, Some(id));
        assert_eq!(info.signature_used.as_deref(), Some("strict-a"));
    }

    #[test]
    fn test_loose_fallback() {
        let cache = ComparisonCache::new(10, HOUR);
        cache.put("strict-used", "loose-a", sample_response("q"), HOUR);

        let hit = cache.get("strict-new", "loose-a").unwrap();
        assert_eq!(hit.tier, CacheTier::Loose);
        assert_eq!(
            hit.response.cache_source(),
            Some(CacheSource::CacheLoose)
        );

        assert!(cache.get("strict-new", "loose-b").is_none());
    }

    #[test]
    fn test_expired_entries_never_surface() {
        let cache = ComparisonCache::new(10, HOUR);
        cache.put("strict-a", "loose-a", sample_response("q"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert!(cache.get("strict-a", "loose-a").is_none());
        assert!(cache.get("strict-b", "loose-a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction_respects_recency() {
        let cache = ComparisonCache::new(2, HOUR);
        cache.put("a", "la", sample_response("a"), HOUR);
        cache.put("b", "lb", sample_response("b"), HOUR);

        // touch "a" so "b" becomes least recently used
        assert!(cache.get("a", "la").is_some());
        cache.put("c", "lc", sample_response("c"), HOUR);

        assert!(cache.get("a", "la").is_some());
        assert!(cache.get("b", "lb").is_none());
        assert!(cache.get("c", "lc").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_eviction_cleans_loose_index() {
        let cache = ComparisonCache::new(1, HOUR);
        cache.put("a", "shared", sample_response("a"), HOUR);
        cache.put("b", "other", sample_response("b"), HOUR);

        assert!(cache.get("x", "shared").is_none());
    }

    #[test]
    fn test_loose_tier_falls_back_to_older_live_entry() {
        let cache = ComparisonCache::new(10, HOUR);
        cache.put("strict-used", "loose-a", sample_response("used"), HOUR);
        cache.put("strict-new", "loose-a", sample_response("new"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        let hit = cache.get("strict-broken", "loose-a").unwrap();
        assert_eq!(hit.tier, CacheTier::Loose);
        assert_eq!(hit.response.query_used, "used");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_loose_tier_prefers_newest_entry() {
        let cache = ComparisonCache::new(10, HOUR);
        cache.put("strict-used", "loose-a", sample_response("used"), HOUR);
        cache.put("strict-new", "loose-a", sample_response("new"), HOUR);

        let hit = cache.get("strict-broken", "loose-a").unwrap();
        assert_eq!(hit.response.query_used, "new");
    }

    #[test]
    fn test_loose_tier_survives_eviction_of_newest() {
        let cache = ComparisonCache::new(2, HOUR);
        cache.put("strict-used", "loose-a", sample_response("used"), HOUR);
        cache.put("strict-new", "loose-a", sample_response("new"), HOUR);
        // refresh "strict-used" so "strict-new" is evicted next
        assert!(cache.get("strict-used", "loose-a").is_some());
        cache.put("other", "loose-b", sample_response("other"), HOUR);

        let hit = cache.get("strict-broken", "loose-a").unwrap();
        assert_eq!(hit.response.query_used, "used");
    }

    #[test]
    fn test_purge_expired() {
        let cache = ComparisonCache::new(10, HOUR);
        cache.put("old", "l-old", sample_response("a"), Duration::from_millis(1));
        cache.put("fresh", "l-fresh", sample_response("b"), HOUR);
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_keep_bound() {
        let cache = Arc::new(ComparisonCache::new(8, HOUR));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("s-{t}-{i}");
                        cache.put(&key, &format!("l-{i}"), sample_response(&key), HOUR);
                        let _ = cache.get(&key, "l-0");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
    }

    #[test]
    fn test_memo_expiry() {
        let memo = ResponseMemo::new(4);
        memo.put("k", sample_response("q"), Utc::now() + chrono::Duration::hours(1));
        assert!(memo.get("k").is_some());

        memo.put("old", sample_response("q"), Utc::now() - chrono::Duration::seconds(1));
        assert!(memo.get("old").is_none());
        assert_eq!(memo.len(), 1);
    }
}
