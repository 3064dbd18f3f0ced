//! Title normalization into product identities and signatures.
//!
//! - [`canonical`] - text canonicalization and memo cache keys
//! - [`hints`] - deterministic keyword pre-pass
//! - [`signature`] - product assembly, AI gap filling, strict/loose digests

pub mod canonical;
pub mod hints;
pub mod signature;

pub use canonical::{cache_key, canonicalize};
pub use hints::{detect, DeterministicHints};
pub use signature::{normalize, normalize_with_ai, signatures, ProductHints};
