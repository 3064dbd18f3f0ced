//! Auction Price Comparison Library
//!
//! Turns an unreliable, site-specific auction lot extraction into a
//! stable product identity, compares the lot's price with current web
//! prices and returns a buy/skip verdict.
//!
//! # Design Philosophy
//!
//! - Deterministic first, AI second: keyword hints resolve most titles
//!   and the AI only fills what they left empty
//! - Degrade, don't fail: extraction always yields a record, AI outages
//!   lower confidence instead of erroring
//! - Signatures, not titles: cache identity comes from normalized
//!   product attributes, so condition wording never splits the cache
//!
//! # Usage
//!
//! ```rust,ignore
//! use price_compare::{Comparator, CompareConfig, Extractor, AdapterRegistry};
//! use price_compare::testing::MockAI;
//!
//! let ai = Arc::new(MockAI::new());
//! let extractor = Extractor::new(AdapterRegistry::new(), Arc::clone(&ai));
//! let comparator = Comparator::new(ai, searcher, CompareConfig::default());
//!
//! let auction = extractor.extract_or_minimal(&page).await;
//! let response = comparator.compare(&auction).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (SiteAdapter, ProductAI, PriceSearcher)
//! - [`types`] - Auction, product, price and response data types
//! - [`normalize`] - Title normalization and product signatures
//! - [`extract`] - Resilient extraction and the live watcher
//! - [`scoring`] - Relevance, statistics, confidence and verdict
//! - [`cache`] - Tiered comparison cache and response memo
//! - [`pipeline`] - The Comparator
//! - [`searchers`] - SerpAPI searcher and rate limiting
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod cache;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod scoring;
pub mod searchers;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{CompareError, ExtractionFailure, NormalizationError, SearchError};
pub use traits::{
    adapter::{AdapterRegistry, MutationConfig, PageSource, SiteAdapter},
    ai::{AiExtraction, AiPrice, LotPageInfo, NoAI, ProductAI},
    searcher::{MockPriceSearcher, PriceQuery, PriceSearcher},
};
pub use types::{
    auction::{AuctionData, Fees},
    config::{CacheConfig, CompareConfig, ExtractorConfig},
    page::PageSnapshot,
    price::{ConfidenceLevel, PriceStats, Verdict, VerdictStatus, WebPriceResult},
    product::{
        AiProductGuess, ConditionGrade, FunctionalState, NormalizeRequest, NormalizedProduct,
        NormalizedResult, ProductSignatures,
    },
    response::{CacheInfo, CacheSource, CompareResponse, UsageInfo},
};

pub use cache::{CacheHit, CacheTier, ComparisonCache, ResponseMemo};
pub use extract::{minimal_record, Extractor, LiveWatcher, PageSignal};
pub use normalize::{cache_key, normalize, normalize_with_ai, signatures, ProductHints};
pub use pipeline::Comparator;
pub use searchers::{RateLimitedSearcher, SearcherExt, SerpApiSearcher};
pub use security::{ProviderCredentials, SecretString};

// Re-export testing utilities
pub use testing::{MockAI, MockAdapter};
