//! Normalized product identity and its signatures.

use serde::{Deserialize, Serialize};

/// Coarse condition bucket used in the strict signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionGrade {
    New,
    Used,
    #[default]
    Unknown,
}

impl ConditionGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Unknown => "unknown",
        }
    }
}

/// Whether the item works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionalState {
    Ok,
    Broken,
    #[default]
    Unknown,
}

/// Structured product identity derived from a free-text title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub brand: Option<String>,

    pub model: Option<String>,

    /// Manufacturer reference / part number
    pub reference: Option<String>,

    #[serde(rename = "capacity_gb")]
    pub capacity_gb: Option<u32>,

    pub category: Option<String>,

    #[serde(rename = "condition_grade")]
    pub condition_grade: ConditionGrade,

    #[serde(rename = "functional_state")]
    pub functional_state: FunctionalState,

    pub locale: String,

    /// Confidence in brand/model/category (0.0 to 1.0)
    pub confidence: f32,

    /// Confidence in condition/functional state (0.0 to 1.0)
    pub condition_confidence: f32,

    /// Primary web search query
    pub query: String,

    #[serde(default)]
    pub alt_queries: Vec<String>,
}

impl NormalizedProduct {
    /// True when neither brand nor model could be resolved.
    pub fn is_unresolved(&self) -> bool {
        self.brand.is_none() && self.model.is_none()
    }
}

/// Content-addressable identity keys for a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductSignatures {
    /// Includes the condition grade
    pub strict: String,

    /// Same product regardless of condition
    pub loose: String,
}

/// Request sent to the AI normalization collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeRequest {
    pub raw_title: String,
    pub site_domain: String,
    pub locale: String,
    pub brand_hint: Option<String>,
    pub model_hint: Option<String>,
    pub category_hint: Option<String>,
    /// Deterministic indicators already found (e.g. "broken", "new")
    #[serde(default)]
    pub hints: Vec<String>,
}

impl NormalizeRequest {
    pub fn new(raw_title: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            raw_title: raw_title.into(),
            locale: locale.into(),
            ..Default::default()
        }
    }

    pub fn with_site_domain(mut self, domain: impl Into<String>) -> Self {
        self.site_domain = domain.into();
        self
    }

    pub fn with_brand_hint(mut self, brand: impl Into<String>) -> Self {
        self.brand_hint = Some(brand.into());
        self
    }

    pub fn with_model_hint(mut self, model: impl Into<String>) -> Self {
        self.model_hint = Some(model.into());
        self
    }

    pub fn with_category_hint(mut self, category: impl Into<String>) -> Self {
        self.category_hint = Some(category.into());
        self
    }
}

/// Normalization outcome, including whether the AI contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    #[serde(flatten)]
    pub product: NormalizedProduct,

    #[serde(rename = "usedAI")]
    pub used_ai: bool,
}

/// Raw guess returned by the AI collaborator.
///
/// Every field is optional; the deterministic pass decides what to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProductGuess {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "capacity_gb")]
    pub capacity_gb: Option<u32>,
    pub category: Option<String>,
    #[serde(rename = "condition_grade")]
    pub condition_grade: Option<ConditionGrade>,
    #[serde(rename = "functional_state")]
    pub functional_state: Option<FunctionalState>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub alt_queries: Vec<String>,
}
