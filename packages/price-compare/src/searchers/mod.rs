//! Price searcher implementations.

pub mod rate_limited;
pub mod serpapi;

pub use rate_limited::{RateLimitedSearcher, SearcherExt};
pub use serpapi::SerpApiSearcher;
