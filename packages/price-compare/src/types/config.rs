//! Configuration types for comparison, extraction and caching.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the comparison pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Fraction below the market minimum that still counts as a deal.
    ///
    /// Default: 0.10.
    pub margin_pct: f64,

    /// Results scoring below this relevance are dropped before stats.
    ///
    /// Default: 0.3.
    pub min_relevance: f32,

    /// Below this many relevant results, alt queries are searched too.
    ///
    /// Default: 3.
    pub min_results: usize,

    /// Lifetime of a fresh comparison in the cache.
    ///
    /// Default: 6 hours.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,

    pub extractor: ExtractorConfig,

    pub cache: CacheConfig,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            margin_pct: crate::scoring::DEFAULT_MARGIN_PCT,
            min_relevance: 0.3,
            min_results: 3,
            cache_ttl: Duration::from_secs(6 * 60 * 60),
            extractor: ExtractorConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl CompareConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verdict margin.
    pub fn with_margin_pct(mut self, margin: f64) -> Self {
        self.margin_pct = margin;
        self
    }

    /// Set the relevance floor.
    pub fn with_min_relevance(mut self, min: f32) -> Self {
        self.min_relevance = min;
        self
    }

    /// Set the alt-query trigger.
    pub fn with_min_results(mut self, min: usize) -> Self {
        self.min_results = min;
        self
    }

    /// Set the cache TTL for fresh comparisons.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Retry policy for adapter extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Retries after the first attempt when the price is missing
    pub max_retries: u32,

    /// Delay before retry `n` is `retry_base_delay * n`
    #[serde(with = "duration_millis")]
    pub retry_base_delay: Duration,

    /// Upper bound on the sum of all retry delays
    #[serde(with = "duration_millis")]
    pub max_total_wait: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            max_total_wait: Duration::from_secs(3),
        }
    }
}

impl ExtractorConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_max_total_wait(mut self, wait: Duration) -> Self {
        self.max_total_wait = wait;
        self
    }
}

/// Capacity and TTL bounds for the comparison caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of signature-keyed entries
    pub capacity: usize,

    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,

    /// Maximum number of memoized whole responses
    pub memo_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            default_ttl: Duration::from_secs(6 * 60 * 60),
            memo_capacity: 200,
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompareConfig::default();
        assert_eq!(config.margin_pct, 0.10);
        assert_eq!(config.extractor.max_retries, 3);
        assert_eq!(config.extractor.max_total_wait, Duration::from_secs(3));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = CompareConfig::new()
            .with_margin_pct(0.15)
            .with_cache(CacheConfig::default().with_capacity(10));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CompareConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.margin_pct, 0.15);
        assert_eq!(parsed.cache.capacity, 10);
        assert_eq!(parsed.extractor.retry_base_delay, Duration::from_millis(500));
    }
}
