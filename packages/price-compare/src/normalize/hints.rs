//! Deterministic pre-pass over a canonical title.
//!
//! Finds broken/for-parts indicators, condition wording, capacity, brand,
//! model and reference using keyword tables. Runs before (and instead of,
//! when sufficient) the AI collaborator.

use regex::Regex;

use super::canonical::contains_phrase;
use crate::types::product::{ConditionGrade, FunctionalState};

lazy_static::lazy_static! {
    // "128gb", "128 go", "1 tb", "2to"
    static ref CAPACITY_RE: Regex = Regex::new(r"\b(\d{1,4}) ?(gb|go|gig|tb|to)\b").unwrap();
    // reference-like token: letters and digits mixed, 4+ chars
    static ref REFERENCE_RE: Regex = Regex::new(r"^(?:[a-z]+\d|\d+[a-z])[a-z0-9]*$").unwrap();
}

/// Phrases meaning the item does not work. Checked before condition words.
const BROKEN_INDICATORS: &[&str] = &[
    "for parts",
    "parts only",
    "not working",
    "defective",
    "broken",
    "as is",
    "spares or repair",
    "hs",
    "hors service",
    "pour pieces",
    "en panne",
    "defectueux",
    "defekt",
    "kaputt",
    "fur bastler",
    "guasto",
    "non funzionante",
    "per ricambi",
    "averiado",
    "para piezas",
];

const NEW_INDICATORS: &[&str] = &[
    "new",
    "brand new",
    "sealed",
    "nib",
    "bnib",
    "unopened",
    "neuf",
    "sous blister",
    "jamais utilise",
    "neu",
    "ovp",
    "originalverpackt",
    "nuovo",
    "sigillato",
    "nuevo",
    "precintado",
];

const USED_INDICATORS: &[&str] = &[
    "used",
    "pre owned",
    "preowned",
    "second hand",
    "refurbished",
    "occasion",
    "d occasion",
    "reconditionne",
    "gebraucht",
    "usato",
    "usado",
    "vintage",
    "worn",
    "bon etat",
    "tres bon etat",
    "excellent etat",
    "etat correct",
    "good condition",
    "very good condition",
    "excellent condition",
    "guter zustand",
    "buone condizioni",
    "buen estado",
];

/// Top grading for second-hand items. Checked before new indicators so
/// "comme neuf" never reads as "neuf".
const LIKE_NEW_INDICATORS: &[&str] = &[
    "like new",
    "as new",
    "mint",
    "mint condition",
    "comme neuf",
    "etat neuf",
    "wie neu",
    "come nuovo",
    "como nuevo",
];

/// Known brands: canonical name, display name, default category.
const BRANDS: &[(&str, &str, Option<&str>)] = &[
    ("apple", "Apple", None),
    ("samsung", "Samsung", None),
    ("google", "Google", None),
    ("sony", "Sony", None),
    ("nintendo", "Nintendo", Some("console")),
    ("microsoft", "Microsoft", None),
    ("xiaomi", "Xiaomi", Some("smartphone")),
    ("huawei", "Huawei", Some("smartphone")),
    ("oneplus", "OnePlus", Some("smartphone")),
    ("canon", "Canon", Some("camera")),
    ("nikon", "Nikon", Some("camera")),
    ("fujifilm", "Fujifilm", Some("camera")),
    ("leica", "Leica", Some("camera")),
    ("gopro", "GoPro", Some("camera")),
    ("dji", "DJI", Some("drone")),
    ("bose", "Bose", Some("audio")),
    ("dyson", "Dyson", Some("appliance")),
    ("lenovo", "Lenovo", Some("laptop")),
    ("dell", "Dell", Some("laptop")),
    ("rolex", "Rolex", Some("watch")),
    ("omega", "Omega", Some("watch")),
    ("tudor", "Tudor", Some("watch")),
    ("cartier", "Cartier", Some("watch")),
    ("seiko", "Seiko", Some("watch")),
    ("tag heuer", "TAG Heuer", Some("watch")),
    ("longines", "Longines", Some("watch")),
    ("hermes", "Hermès", Some("bag")),
    ("louis vuitton", "Louis Vuitton", Some("bag")),
    ("chanel", "Chanel", Some("bag")),
    ("lego", "LEGO", Some("toy")),
];

/// Product-line words that imply a brand even when it is absent.
const IMPLIED_BRANDS: &[(&str, &str)] = &[
    ("iphone", "Apple"),
    ("ipad", "Apple"),
    ("macbook", "Apple"),
    ("imac", "Apple"),
    ("airpods", "Apple"),
    ("galaxy", "Samsung"),
    ("pixel", "Google"),
    ("playstation", "Sony"),
    ("ps5", "Sony"),
    ("ps4", "Sony"),
    ("xbox", "Microsoft"),
    ("switch", "Nintendo"),
    ("speedmaster", "Omega"),
    ("seamaster", "Omega"),
    ("submariner", "Rolex"),
    ("daytona", "Rolex"),
];

/// Keyword → category, checked in order.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("iphone", "smartphone"),
    ("galaxy s", "smartphone"),
    ("pixel", "smartphone"),
    ("smartphone", "smartphone"),
    ("telephone", "smartphone"),
    ("ipad", "tablet"),
    ("tablet", "tablet"),
    ("tablette", "tablet"),
    ("macbook", "laptop"),
    ("laptop", "laptop"),
    ("notebook", "laptop"),
    ("ordinateur portable", "laptop"),
    ("imac", "desktop"),
    ("airpods", "audio"),
    ("headphones", "audio"),
    ("casque", "audio"),
    ("playstation", "console"),
    ("ps5", "console"),
    ("ps4", "console"),
    ("xbox", "console"),
    ("switch", "console"),
    ("console", "console"),
    ("watch", "watch"),
    ("montre", "watch"),
    ("uhr", "watch"),
    ("orologio", "watch"),
    ("camera", "camera"),
    ("appareil photo", "camera"),
    ("objectif", "lens"),
    ("lens", "lens"),
    ("drone", "drone"),
    ("sac", "bag"),
    ("handbag", "bag"),
];

/// Words that end a model name.
const MODEL_STOP_WORDS: &[&str] = &[
    "lot", "de", "du", "la", "le", "with", "avec", "mit", "con", "and", "et", "und", "the",
    "for", "pour", "fur", "per", "in", "en", "color", "colour", "couleur", "noir", "black",
    "blanc", "white", "gold", "silver", "or", "argent", "bleu", "blue",
];

/// Confidence at or above which a deterministic hint is authoritative.
pub const HIGH_CONFIDENCE: f32 = 0.8;

/// Everything the pre-pass found in a title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeterministicHints {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub reference: Option<String>,
    pub capacity_gb: Option<u32>,
    pub category: Option<String>,
    pub condition_grade: ConditionGrade,
    pub functional_state: FunctionalState,
    /// Confidence in brand/model/category
    pub confidence: f32,
    /// Confidence in condition/functional state
    pub condition_confidence: f32,
}

impl DeterministicHints {
    /// Whether the AI collaborator should be asked to fill gaps.
    pub fn is_insufficient(&self) -> bool {
        self.brand.is_none() || self.model.is_none() || self.category.is_none()
    }

    /// Indicator labels forwarded to the AI as context.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.functional_state == FunctionalState::Broken {
            labels.push("broken".to_string());
        }
        match self.condition_grade {
            ConditionGrade::New => labels.push("new".to_string()),
            ConditionGrade::Used => labels.push("used".to_string()),
            ConditionGrade::Unknown => {}
        }
        if let Some(capacity) = self.capacity_gb {
            labels.push(format!("capacity:{capacity}gb"));
        }
        labels
    }
}

/// Run the deterministic pre-pass over a canonical title.
pub fn detect(canonical: &str) -> DeterministicHints {
    let mut hints = DeterministicHints::default();

    detect_condition(canonical, &mut hints);
    hints.capacity_gb = detect_capacity(canonical);

    let words: Vec<&str> = canonical.split(' ').filter(|w| !w.is_empty()).collect();
    hints.reference = words
        .iter()
        .find(|w| is_reference(w))
        .map(|w| w.to_string());

    let (brand, model_start, brand_confidence, brand_category) = detect_brand(canonical, &words);
    hints.brand = brand;
    hints.category = detect_category(canonical).or(brand_category.map(str::to_string));
    let indicators = indicator_mask(&words);
    hints.model = model_start
        .and_then(|start| detect_model(&words[start..], &indicators[start..], hints.reference.as_deref()));

    hints.confidence = match (&hints.brand, &hints.model) {
        (Some(_), Some(_)) if hints.category.is_some() => brand_confidence.max(0.9),
        (Some(_), Some(_)) => brand_confidence,
        (Some(_), None) => 0.5,
        (None, _) => 0.2,
    };

    hints
}

fn detect_condition(canonical: &str, hints: &mut DeterministicHints) {
    if BROKEN_INDICATORS.iter().any(|p| contains_phrase(canonical, p)) {
        hints.functional_state = FunctionalState::Broken;
        hints.condition_grade = ConditionGrade::Used;
        hints.condition_confidence = 0.95;
        return;
    }

    let is_like_new = LIKE_NEW_INDICATORS.iter().any(|p| contains_phrase(canonical, p));
    let remainder = strip_phrases(canonical, LIKE_NEW_INDICATORS);
    let is_new = NEW_INDICATORS.iter().any(|p| contains_phrase(&remainder, p));
    let is_used = is_like_new || USED_INDICATORS.iter().any(|p| contains_phrase(&remainder, p));

    match (is_new, is_used) {
        (true, false) => {
            hints.condition_grade = ConditionGrade::New;
            hints.condition_confidence = 0.85;
        }
        (false, true) => {
            hints.condition_grade = ConditionGrade::Used;
            hints.condition_confidence = 0.85;
        }
        // "neuf ... occasion": conflicting wording
        (true, true) => {
            hints.condition_grade = ConditionGrade::Used;
            hints.condition_confidence = 0.5;
        }
        (false, false) => {
            hints.condition_confidence = 0.3;
        }
    }
}

/// Storage capacity in GB (`1 tb` → 1024).
pub fn detect_capacity(canonical: &str) -> Option<u32> {
    let caps = CAPACITY_RE.captures(canonical)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2)?.as_str() {
        "tb" | "to" => value.checked_mul(1024),
        _ => Some(value),
    }
}

fn is_reference(word: &str) -> bool {
    word.len() >= 4 && REFERENCE_RE.is_match(word) && !CAPACITY_RE.is_match(word)
}

/// Returns (display brand, index where the model starts, confidence, brand category).
fn detect_brand(
    canonical: &str,
    words: &[&str],
) -> (Option<String>, Option<usize>, f32, Option<&'static str>) {
    for (name, display, category) in BRANDS {
        if contains_phrase(canonical, name) {
            let name_len = name.split(' ').count();
            let start = words
                .windows(name_len)
                .position(|w| w.join(" ") == *name)
                .map(|i| i + name_len);
            return (Some(display.to_string()), start, 0.85, *category);
        }
    }

    for (keyword, display) in IMPLIED_BRANDS {
        if let Some(pos) = words.iter().position(|w| w == keyword) {
            return (Some(display.to_string()), Some(pos), 0.8, None);
        }
    }

    (None, None, 0.0, None)
}

fn detect_category(canonical: &str) -> Option<String> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| contains_phrase(canonical, keyword))
        .map(|(_, category)| category.to_string())
}

/// Condition and broken indicator tables, in the order they are matched.
fn indicator_phrases() -> impl Iterator<Item = &'static str> {
    BROKEN_INDICATORS
        .iter()
        .chain(LIKE_NEW_INDICATORS)
        .chain(NEW_INDICATORS)
        .chain(USED_INDICATORS)
        .copied()
}

/// Marks every word that belongs to an indicator phrase.
///
/// Multi-word phrases ("tres bon etat", "for parts") mark all their words.
fn indicator_mask(words: &[&str]) -> Vec<bool> {
    let mut mask = vec![false; words.len()];
    for phrase in indicator_phrases() {
        let parts: Vec<&str> = phrase.split(' ').collect();
        if parts.len() > words.len() {
            continue;
        }
        for start in 0..=(words.len() - parts.len()) {
            if words[start..start + parts.len()] == parts[..] {
                mask[start..start + parts.len()].fill(true);
            }
        }
    }
    mask
}

/// Remove whole-word occurrences of `phrases` from a canonical string.
fn strip_phrases(canonical: &str, phrases: &[&str]) -> String {
    let mut padded = format!(" {canonical} ");
    for phrase in phrases {
        let needle = format!(" {phrase} ");
        while padded.contains(&needle) {
            padded = padded.replace(&needle, " ");
        }
    }
    padded.trim().to_string()
}

fn detect_model(words: &[&str], indicators: &[bool], reference: Option<&str>) -> Option<String> {
    let mut model = Vec::new();
    for (i, word) in words.iter().enumerate() {
        // "64 go": the number belongs to the capacity
        let next_is_unit = words.get(i + 1).is_some_and(|next| is_unit(next));
        let is_indicator = indicators.get(i).copied().unwrap_or(false);
        if model.len() == 3 || next_is_unit || is_indicator || is_model_boundary(word, reference) {
            break;
        }
        model.push(*word);
    }

    if model.is_empty() {
        None
    } else {
        Some(model.join(" "))
    }
}

fn is_unit(word: &str) -> bool {
    matches!(word, "gb" | "go" | "gig" | "tb" | "to")
}

fn is_model_boundary(word: &str, reference: Option<&str>) -> bool {
    Some(word) == reference
        || CAPACITY_RE.is_match(word)
        || is_unit(word)
        || MODEL_STOP_WORDS.contains(&word)
}
