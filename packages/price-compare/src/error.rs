//! Typed errors for the price comparison library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Only collaborator-boundary failures reach the caller as hard errors.
//! Everything else degrades confidence or verdict quality locally.

use thiserror::Error;

/// Errors surfaced by a comparison request.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The auction has no usable price; no comparison should be attempted.
    #[error("auction has no usable price")]
    NoPrice,

    /// The request itself was malformed (e.g. empty title)
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Search or AI provider failed at the boundary
    #[error("provider error: {0}")]
    Api(#[from] SearchError),

    /// Operation was cancelled (page context torn down)
    #[error("operation cancelled")]
    Cancelled,
}

impl CompareError {
    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoPrice => "NO_PRICE",
            Self::InvalidInput { .. } => "INVALID_REQUEST",
            Self::Api(_) => "API_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Errors from the AI normalization/extraction collaborator.
#[derive(Debug, Error)]
pub enum NormalizationError {
    /// Request was rejected before reaching the provider
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider answered, but the answer could not be used
    #[error("normalization failed: {0}")]
    NormalizationFailed(String),

    /// Network/auth failure talking to the provider
    #[error("provider error: {0}")]
    ProviderError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl NormalizationError {
    /// Wire code matching the collaborator contract.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NormalizationFailed(_) => "NORMALIZATION_FAILED",
            Self::ProviderError(_) => "PROVIDER_ERROR",
        }
    }
}

impl From<serde_json::Error> for NormalizationError {
    fn from(err: serde_json::Error) -> Self {
        Self::NormalizationFailed(format!("malformed response: {err}"))
    }
}

/// Errors from the web price search collaborator.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Provider returned a non-success status
    #[error("search provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimited,

    /// Response body did not match the expected shape
    #[error("invalid search response: {0}")]
    InvalidResponse(String),
}

/// No usable title or price after every extraction path.
#[derive(Debug, Clone, Error)]
#[error("extraction failed for {domain}: {reason}")]
pub struct ExtractionFailure {
    pub domain: String,
    pub reason: String,
}

impl ExtractionFailure {
    pub fn new(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for comparison operations.
pub type Result<T> = std::result::Result<T, CompareError>;

/// Result type alias for AI collaborator calls.
pub type NormalizationResult<T> = std::result::Result<T, NormalizationError>;

/// Result type alias for search calls.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_failures_map_to_api_error() {
        let err: CompareError = SearchError::RateLimited.into();
        assert_eq!(err.code(), "API_ERROR");
    }

    #[test]
    fn test_normalization_codes() {
        assert_eq!(
            NormalizationError::InvalidRequest("empty".into()).code(),
            "INVALID_REQUEST"
        );
        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            NormalizationError::from(bad_json).code(),
            "NORMALIZATION_FAILED"
        );
    }
}
