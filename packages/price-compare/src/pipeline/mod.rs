//! Comparison pipeline.
//!
//! The pipeline orchestrates:
//! - Normalization (deterministic hints, AI fill)
//! - Tiered cache lookup (memo, strict, loose)
//! - Fresh web search with alternate queries
//! - Scoring into stats, confidence and verdict

pub mod comparator;

pub use comparator::Comparator;
