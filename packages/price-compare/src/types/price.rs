//! Web price results and the scoring outputs derived from them.

use serde::{Deserialize, Serialize};

/// One offer found by the web search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPriceResult {
    pub title: String,

    pub price: f64,

    /// Price as displayed by the source ("129,00 €")
    #[serde(default)]
    pub price_string: String,

    /// Merchant or marketplace name
    pub source: String,

    pub url: String,

    #[serde(default)]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default)]
    pub shipping_included: Option<bool>,

    #[serde(default)]
    pub shipping_cost: Option<f64>,

    /// Title similarity with the auction (0.0 to 1.0)
    #[serde(default)]
    pub relevance_score: f32,
}

impl WebPriceResult {
    pub fn new(title: impl Into<String>, price: f64, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price,
            price_string: format!("{price:.2}"),
            source: source.into(),
            url: String::new(),
            thumbnail: None,
            condition: None,
            shipping_included: None,
            shipping_cost: None,
            relevance_score: 0.0,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_shipping(mut self, included: bool, cost: Option<f64>) -> Self {
        self.shipping_included = Some(included);
        self.shipping_cost = cost;
        self
    }

    pub fn with_relevance(mut self, score: f32) -> Self {
        self.relevance_score = score.clamp(0.0, 1.0);
        self
    }
}

/// Aggregate statistics over a result set.
///
/// `count == 0` means every other field is zero; branch on it first.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub average: f64,
    pub count: usize,
}

impl PriceStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// How much the comparison can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    WorthIt,
    Borderline,
    NotWorthIt,
}

/// Buy/skip recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,

    /// Percent below the market minimum; negative when above it
    pub margin: f64,

    pub reason: String,
}
