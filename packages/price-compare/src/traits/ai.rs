//! AI trait for the normalization and extraction collaborator.
//!
//! The provider is a black box: text (and optionally a screenshot) in,
//! a structured guess with a confidence out. Implementations wrap a
//! specific LLM provider and handle prompting and response parsing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NormalizationError, NormalizationResult};
use crate::types::{
    page::PageSnapshot,
    product::{AiProductGuess, NormalizeRequest},
};

#[async_trait]
pub trait ProductAI: Send + Sync {
    /// Guess brand/model/category/capacity for a raw lot title.
    async fn normalize(&self, request: &NormalizeRequest) -> NormalizationResult<AiProductGuess>;

    /// Read title and price off a page no adapter could handle.
    async fn extract_fallback(&self, page: &PageSnapshot) -> NormalizationResult<AiExtraction>;
}

/// Price read by the AI fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPrice {
    pub value: f64,
    pub currency: String,
}

/// What the AI could tell about the page itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotPageInfo {
    pub is_lot_page: bool,

    #[serde(default)]
    pub lot_number: Option<String>,

    /// Premium quoted on the page, as a fraction
    #[serde(default)]
    pub buyer_premium: Option<f64>,
}

/// AI fallback extraction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiExtraction {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub price: Option<AiPrice>,

    #[serde(default)]
    pub confidence: f32,

    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub lot_page_info: LotPageInfo,
}

impl AiExtraction {
    /// Positive price, if any.
    pub fn usable_price(&self) -> Option<&AiPrice> {
        self.price.as_ref().filter(|p| p.value > 0.0)
    }
}

/// Collaborator for deployments without an AI provider.
///
/// Every call fails with `PROVIDER_ERROR`, which the pipeline recovers
/// from by staying deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAI;

#[async_trait]
impl ProductAI for NoAI {
    async fn normalize(&self, _request: &NormalizeRequest) -> NormalizationResult<AiProductGuess> {
        Err(NormalizationError::ProviderError(
            "no AI provider configured".into(),
        ))
    }

    async fn extract_fallback(&self, _page: &PageSnapshot) -> NormalizationResult<AiExtraction> {
        Err(NormalizationError::ProviderError(
            "no AI provider configured".into(),
        ))
    }
}
