//! Text canonicalization shared by matching, signing and scoring.

use deunicode::deunicode;
use regex::Regex;

lazy_static::lazy_static! {
    // any run of characters that is not a lowercase ascii letter or digit
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Canonical form of free text.
///
/// Lowercase, diacritics stripped (é -> e, ß -> ss), non-alphanumeric
/// runs collapsed to one space, trimmed.
pub fn canonicalize(text: &str) -> String {
    let ascii = deunicode(text).to_lowercase();
    NON_ALNUM_RE.replace_all(&ascii, " ").trim().to_string()
}

/// Canonical words, in order.
pub fn tokens(text: &str) -> Vec<String> {
    canonicalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if `phrase` occurs in `canonical` on word boundaries.
///
/// Both sides must already be canonical.
pub fn contains_phrase(canonical: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {canonical} ").contains(&format!(" {phrase} "))
}

/// Key for whole-response memoization of comparison calls.
///
/// Canonical title, currency, locale and the optional brand/model,
/// joined with `|`. Independent from product signatures.
pub fn cache_key(
    title: &str,
    currency: &str,
    locale: &str,
    brand: Option<&str>,
    model: Option<&str>,
) -> String {
    let mut parts = vec![
        canonicalize(title),
        currency.trim().to_uppercase(),
        locale.trim().to_lowercase(),
    ];
    if let Some(brand) = brand {
        parts.push(canonicalize(brand));
    }
    if let Some(model) = model {
        parts.push(canonicalize(model));
    }
    parts.join("|")
}
