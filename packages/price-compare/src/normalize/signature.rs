//! Product normalization and signature construction.
//!
//! Deterministic hints come first; the AI collaborator only fills slots
//! the pre-pass left empty and never overrides a condition or broken
//! indicator found locally.

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::canonical::{canonicalize, contains_phrase};
use super::hints::{detect, DeterministicHints, HIGH_CONFIDENCE};
use crate::error::{NormalizationError, NormalizationResult};
use crate::traits::ai::ProductAI;
use crate::types::product::{
    AiProductGuess, ConditionGrade, FunctionalState, NormalizeRequest, NormalizedProduct,
    NormalizedResult, ProductSignatures,
};

/// Serialized form of a missing field.
///
/// Cannot collide with canonical text, which is `[a-z0-9 ]` only.
pub const MISSING: &str = "∅";

/// Confidence ceiling when the AI was needed but failed.
const DEGRADED_CONFIDENCE: f32 = 0.5;

/// Hints supplied by the caller's own pre-pass (e.g. an adapter that
/// reads a structured brand field).
#[derive(Debug, Clone, Default)]
pub struct ProductHints {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
}

impl ProductHints {
    fn from_request(request: &NormalizeRequest) -> Self {
        Self {
            brand: request.brand_hint.clone(),
            model: request.model_hint.clone(),
            category: request.category_hint.clone(),
        }
    }
}

/// Deterministic normalization of a raw title.
pub fn normalize(
    raw_title: &str,
    locale: &str,
    hints: Option<&ProductHints>,
) -> NormalizationResult<NormalizedProduct> {
    let canonical = canonicalize(raw_title);
    if canonical.is_empty() {
        return Err(NormalizationError::InvalidRequest(
            "raw title is empty".to_string(),
        ));
    }

    let mut detected = detect(&canonical);
    if let Some(hints) = hints {
        apply_caller_hints(&mut detected, hints);
    }

    Ok(build_product(&canonical, locale, &detected, Vec::new()))
}

/// Normalization with the AI collaborator filling unresolved slots.
///
/// AI failures are recovered here: the deterministic result is returned
/// with its confidence capped and `used_ai == false`.
pub async fn normalize_with_ai<A: ProductAI + ?Sized>(
    ai: &A,
    request: &NormalizeRequest,
) -> NormalizationResult<NormalizedResult> {
    let canonical = canonicalize(&request.raw_title);
    if canonical.is_empty() {
        return Err(NormalizationError::InvalidRequest(
            "raw title is empty".to_string(),
        ));
    }

    let mut detected = detect(&canonical);
    apply_caller_hints(&mut detected, &ProductHints::from_request(request));

    if !detected.is_insufficient() {
        debug!(title = %request.raw_title, "Deterministic hints sufficient, skipping AI");
        return Ok(NormalizedResult {
            product: build_product(&canonical, &request.locale, &detected, Vec::new()),
            used_ai: false,
        });
    }

    let mut ai_request = request.clone();
    ai_request.hints = detected.labels();
    ai_request.brand_hint = ai_request.brand_hint.or_else(|| detected.brand.clone());
    ai_request.model_hint = ai_request.model_hint.or_else(|| detected.model.clone());
    ai_request.category_hint = ai_request.category_hint.or_else(|| detected.category.clone());

    match ai.normalize(&ai_request).await {
        Ok(guess) => {
            debug!(
                title = %request.raw_title,
                ai_confidence = guess.confidence,
                "AI normalization merged"
            );
            let alt_queries = guess.alt_queries.clone();
            merge_ai_guess(&mut detected, guess);
            Ok(NormalizedResult {
                product: build_product(&canonical, &request.locale, &detected, alt_queries),
                used_ai: true,
            })
        }
        Err(e) => {
            warn!(
                title = %request.raw_title,
                code = e.code(),
                error = %e,
                "AI normalization failed, using deterministic result"
            );
            detected.confidence = detected.confidence.min(DEGRADED_CONFIDENCE);
            Ok(NormalizedResult {
                product: build_product(&canonical, &request.locale, &detected, Vec::new()),
                used_ai: false,
            })
        }
    }
}

/// Strict and loose signatures of a product.
///
/// When neither brand nor model is known, both fall back to the
/// canonical title (carried in `query`) plus category.
pub fn signatures(product: &NormalizedProduct) -> ProductSignatures {
    let category = field(product.category.as_deref());
    let condition = product.condition_grade.as_str().to_string();

    if product.is_unresolved() {
        let title = field(Some(product.query.as_str()));
        return ProductSignatures {
            strict: digest(&["title", &title, &category, &condition]),
            loose: digest(&["title", &title, &category]),
        };
    }

    let brand = field(product.brand.as_deref());
    let model = field(product.model.as_deref());
    let capacity = product
        .capacity_gb
        .map(|c| c.to_string())
        .unwrap_or_else(|| MISSING.to_string());

    ProductSignatures {
        strict: digest(&[&brand, &model, &capacity, &category, &condition]),
        loose: digest(&[&brand, &model, &capacity, &category]),
    }
}

fn field(value: Option<&str>) -> String {
    value
        .map(canonicalize)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

fn digest(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.join("|").as_bytes());
    format!("{:x}", hasher.finalize())
}

fn apply_caller_hints(detected: &mut DeterministicHints, hints: &ProductHints) {
    if let Some(brand) = hints.brand.as_ref().filter(|b| !b.trim().is_empty()) {
        detected.brand = Some(brand.clone());
    }
    if let Some(model) = hints.model.as_ref().filter(|m| !m.trim().is_empty()) {
        detected.model = Some(canonicalize(model));
    }
    if let Some(category) = hints.category.as_ref().filter(|c| !c.trim().is_empty()) {
        detected.category = Some(canonicalize(category));
    }
    if detected.brand.is_some() && detected.model.is_some() {
        detected.confidence = detected.confidence.max(HIGH_CONFIDENCE);
    }
}

/// Fill empty slots from the AI; local indicators always win.
fn merge_ai_guess(detected: &mut DeterministicHints, guess: AiProductGuess) {
    let mut filled = false;

    if detected.brand.is_none() {
        if let Some(brand) = guess.brand.filter(|b| !b.trim().is_empty()) {
            detected.brand = Some(brand);
            filled = true;
        }
    }
    if detected.model.is_none() {
        if let Some(model) = guess.model.filter(|m| !m.trim().is_empty()) {
            detected.model = Some(canonicalize(&model));
            filled = true;
        }
    }
    if detected.category.is_none() {
        if let Some(category) = guess.category.filter(|c| !c.trim().is_empty()) {
            detected.category = Some(canonicalize(&category));
            filled = true;
        }
    }
    if detected.capacity_gb.is_none() && guess.capacity_gb.is_some() {
        detected.capacity_gb = guess.capacity_gb;
        filled = true;
    }
    if detected.reference.is_none() {
        detected.reference = guess.reference.map(|r| canonicalize(&r));
    }

    if detected.condition_confidence < HIGH_CONFIDENCE {
        if let Some(grade) = guess.condition_grade.filter(|g| *g != ConditionGrade::Unknown) {
            if detected.condition_grade == ConditionGrade::Unknown {
                detected.condition_grade = grade;
                detected.condition_confidence = guess.confidence.min(0.75);
            }
        }
        if let Some(state) = guess.functional_state {
            if detected.functional_state == FunctionalState::Unknown {
                detected.functional_state = state;
            }
        }
    }

    if filled {
        detected.confidence = detected.confidence.max(guess.confidence.clamp(0.0, 1.0));
    }
}

fn build_product(
    canonical: &str,
    locale: &str,
    detected: &DeterministicHints,
    ai_alt_queries: Vec<String>,
) -> NormalizedProduct {
    let locale = normalize_locale(locale);

    let query = if detected.brand.is_none() && detected.model.is_none() {
        canonical.to_string()
    } else {
        build_query(detected)
    };

    let mut alt_queries = Vec::new();
    if let Some(reference) = &detected.reference {
        if let Some(brand) = &detected.brand {
            alt_queries.push(format!("{} {}", canonicalize(brand), reference));
        }
        alt_queries.push(reference.clone());
    }
    alt_queries.extend(ai_alt_queries.iter().map(|q| canonicalize(q)));
    alt_queries.push(canonical.to_string());

    let mut seen = vec![query.clone()];
    alt_queries.retain(|q| {
        if q.is_empty() || seen.contains(q) {
            false
        } else {
            seen.push(q.clone());
            true
        }
    });

    NormalizedProduct {
        brand: detected.brand.clone(),
        model: detected.model.clone(),
        reference: detected.reference.clone(),
        capacity_gb: detected.capacity_gb,
        category: detected.category.clone(),
        condition_grade: detected.condition_grade,
        functional_state: detected.functional_state,
        locale,
        confidence: detected.confidence.clamp(0.0, 1.0),
        condition_confidence: detected.condition_confidence.clamp(0.0, 1.0),
        query,
        alt_queries,
    }
}

fn build_query(detected: &DeterministicHints) -> String {
    let brand = detected.brand.as_deref().map(canonicalize).unwrap_or_default();
    let model = detected.model.clone().unwrap_or_default();

    let mut parts = vec![brand.clone()];
    // "apple iphone", not "apple apple iphone" when the hint repeats the brand
    if !contains_phrase(&model, &brand) {
        parts.push(model);
    } else {
        parts = vec![model];
    }
    if let Some(capacity) = detected.capacity_gb {
        parts.push(format!("{capacity}gb"));
    }
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_locale(locale: &str) -> String {
    let locale = locale.trim().to_lowercase();
    let code: String = locale.chars().take(2).collect();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
        code
    } else {
        "en".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAI;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_phone() {
        let product = normalize("Apple iPhone 13 128 Go - occasion", "FR", None).unwrap();
        assert_eq!(product.brand.as_deref(), Some("Apple"));
        assert_eq!(product.model.as_deref(), Some("iphone 13"));
        assert_eq!(product.capacity_gb, Some(128));
        assert_eq!(product.locale, "fr");
        assert_eq!(product.query, "apple iphone 13 128gb");
        assert!(product.alt_queries.contains(&"apple iphone 13 128 go occasion".to_string()));
    }

    #[test]
    fn test_empty_title_is_invalid() {
        let err = normalize("  -- ", "en", None).unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[test]
    fn test_condition_wording_only_changes_strict() {
        let used = normalize("Apple iPhone 13 128GB occasion", "fr", None).unwrap();
        let new = normalize("Apple iPhone 13 128GB neuf", "fr", None).unwrap();
        let unspecified = normalize("APPLE iPhone 13 - 128GB", "fr", None).unwrap();

        let (used, new, unspecified) = (signatures(&used), signatures(&new), signatures(&unspecified));
        assert_eq!(used.loose, new.loose);
        assert_eq!(used.loose, unspecified.loose);
        assert_ne!(used.strict, new.strict);
        assert_ne!(new.strict, unspecified.strict);
    }

    #[test]
    fn test_missing_field_differs_from_empty_match() {
        let mut a = NormalizedProduct {
            brand: Some("Sony".into()),
            model: Some("wh 1000xm4".into()),
            category: None,
            ..Default::default()
        };
        let sig_missing = signatures(&a);
        a.category = Some("".into());
        // empty strings serialize to the sentinel as well
        assert_eq!(signatures(&a), sig_missing);
        a.category = Some("audio".into());
        assert_ne!(signatures(&a), sig_missing);
    }

    #[test]
    fn test_unresolved_falls_back_to_title() {
        let a = normalize("Vase en porcelaine de Sèvres", "fr", None).unwrap();
        let b = normalize("VASE en porcelaine de SEVRES !", "fr", None).unwrap();
        let c = normalize("Vase en faïence", "fr", None).unwrap();
        assert!(a.is_unresolved());
        assert_eq!(signatures(&a), signatures(&b));
        assert_ne!(signatures(&a).loose, signatures(&c).loose);
    }

    #[test]
    fn test_caller_hints_take_priority() {
        let hints = ProductHints {
            brand: Some("Hermès".into()),
            model: Some("Birkin 30".into()),
            category: Some("bag".into()),
        };
        let product = normalize("Sac à main cuir noir", "fr", Some(&hints)).unwrap();
        assert_eq!(product.brand.as_deref(), Some("Hermès"));
        assert_eq!(product.model.as_deref(), Some("birkin 30"));
        assert_eq!(product.query, "hermes birkin 30");
        assert!(product.confidence >= HIGH_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_ai_skipped_when_hints_sufficient() {
        let ai = MockAI::new();
        let request = NormalizeRequest::new("Apple iPhone 13 128GB", "en");
        let result = normalize_with_ai(&ai, &request).await.unwrap();
        assert!(!result.used_ai);
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ai_fills_gaps_but_not_condition() {
        let ai = MockAI::new().with_guess(
            "Montre automatique HS",
            AiProductGuess {
                brand: Some("Seiko".into()),
                model: Some("SKX007".into()),
                category: Some("watch".into()),
                condition_grade: Some(ConditionGrade::New),
                functional_state: Some(FunctionalState::Ok),
                confidence: 0.7,
                ..Default::default()
            },
        );
        let request = NormalizeRequest::new("Montre automatique HS", "fr");
        let result = normalize_with_ai(&ai, &request).await.unwrap();

        assert!(result.used_ai);
        assert_eq!(result.product.brand.as_deref(), Some("Seiko"));
        assert_eq!(result.product.model.as_deref(), Some("skx007"));
        assert_eq!(result.product.functional_state, FunctionalState::Broken);
        assert_eq!(result.product.condition_grade, ConditionGrade::Used);
    }

    #[tokio::test]
    async fn test_ai_failure_degrades_confidence() {
        let ai = MockAI::new().failing();
        let request = NormalizeRequest::new("Lot Apple accessoires", "en");
        let result = normalize_with_ai(&ai, &request).await.unwrap();
        assert!(!result.used_ai);
        assert_eq!(result.product.brand.as_deref(), Some("Apple"));
        assert!(result.product.confidence <= 0.5);
    }

    #[test]
    fn test_grading_wording_keeps_loose_signature() {
        let pairs = [
            ("Omega Speedmaster bon etat", "Omega Speedmaster occasion"),
            ("Apple iPhone 13 like new", "Apple iPhone 13 used"),
            ("Apple iPhone 13 excellent condition", "Apple iPhone 13"),
            ("Apple iPhone 13 128GB très bon état", "Apple iPhone 13 128GB neuf"),
        ];
        for (a, b) in pairs {
            let a = signatures(&normalize(a, "fr", None).unwrap());
            let b = signatures(&normalize(b, "fr", None).unwrap());
            assert_eq!(a.loose, b.loose);
        }
    }

    /// (title, word index right after the model)
    const BASE_TITLES: &[(&str, usize)] = &[
        ("Apple iPhone 13 128GB", 3),
        ("Omega Speedmaster Professional", 3),
        ("Samsung Galaxy S21 256GB", 3),
        ("Rolex Submariner Date 126610LN", 3),
        ("Sony PlayStation 5", 3),
    ];

    const CONDITION_PHRASES: &[&str] = &[
        "neuf",
        "occasion",
        "bon etat",
        "tres bon etat",
        "excellent etat",
        "comme neuf",
        "like new",
        "mint",
        "good condition",
        "excellent condition",
        "brand new",
        "sealed",
        "refurbished",
        "gebraucht",
        "for parts",
        "hs",
        "not working",
    ];

    proptest! {
        #[test]
        fn prop_condition_phrase_after_model_keeps_loose(
            (title, model_end) in prop::sample::select(BASE_TITLES),
            phrase in prop::sample::select(CONDITION_PHRASES),
            offset in 0usize..8,
        ) {
            let mut words: Vec<&str> = title.split(' ').collect();
            let at = model_end + offset % (words.len() - model_end + 1);
            words.insert(at, phrase);
            let graded = words.join(" ");

            let plain = signatures(&normalize(title, "fr", None).unwrap());
            let graded = signatures(&normalize(&graded, "fr", None).unwrap());
            prop_assert_eq!(plain.loose, graded.loose);
        }

        #[test]
        fn prop_loose_ignores_condition(
            brand in "[a-z]{3,8}",
            model in "[a-z0-9]{2,6}",
            capacity in prop::option::of(1u32..2048),
        ) {
            let base = NormalizedProduct {
                brand: Some(brand),
                model: Some(model),
                capacity_gb: capacity,
                category: Some("smartphone".into()),
                ..Default::default()
            };
            let mut other = base.clone();
            other.condition_grade = ConditionGrade::New;

            let (a, b) = (signatures(&base), signatures(&other));
            prop_assert_eq!(a.loose, b.loose);
            prop_assert_ne!(a.strict, b.strict);
        }
    }
}
