//! Persisted comparison response shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::price::{ConfidenceLevel, PriceStats, Verdict, WebPriceResult};
use super::product::NormalizedProduct;

/// Which tier served a response.
///
/// Quota accounting charges `FreshFetch` and treats both cache tiers
/// as free, so this must record the real tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    CacheStrict,
    CacheLoose,
    FreshFetch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub source: CacheSource,

    #[serde(default)]
    pub cache_entry_id: Option<String>,

    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Signature the entry was found under
    #[serde(default)]
    pub signature_used: Option<String>,
}

impl CacheInfo {
    pub fn new(source: CacheSource) -> Self {
        Self {
            source,
            cache_entry_id: None,
            fetched_at: None,
            expires_at: None,
            signature_used: None,
        }
    }
}

/// Quota counters reported alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub fresh_fetches: u64,
    pub cache_hits: u64,
}

/// Result of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub query_used: String,

    pub results: Vec<WebPriceResult>,

    pub stats: PriceStats,

    pub confidence: ConfidenceLevel,

    pub verdict: Verdict,

    #[serde(default)]
    pub cache: Option<CacheInfo>,

    #[serde(default)]
    pub normalized: Option<NormalizedProduct>,

    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

impl CompareResponse {
    /// Source tier, if this response went through the cache layer.
    pub fn cache_source(&self) -> Option<CacheSource> {
        self.cache.as_ref().map(|c| c.source)
    }
}
