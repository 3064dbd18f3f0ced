//! Comparison scoring: relevance, price statistics, confidence, verdict.
//!
//! Pure functions over their inputs. Thresholds are fixed policy
//! constants, not derived from the data.

use std::collections::HashSet;

use crate::normalize::canonical::{canonicalize, tokens};
use crate::types::price::{
    ConfidenceLevel, PriceStats, Verdict, VerdictStatus, WebPriceResult,
};

/// Weight of the word-overlap ratio in relevance.
const OVERLAP_WEIGHT: f32 = 0.7;
/// Bonus for a brand (and, separately, a model) substring match.
const MATCH_BONUS: f32 = 0.15;
/// Floor added to every relevance score.
const BASE_RELEVANCE: f32 = 0.1;

const HIGH_MIN_COUNT: usize = 5;
const HIGH_MIN_RELEVANCE: f32 = 0.7;
const MEDIUM_MIN_COUNT: usize = 3;
const MEDIUM_MIN_RELEVANCE: f32 = 0.5;

/// Default margin below the market minimum for a `worth_it` verdict.
pub const DEFAULT_MARGIN_PCT: f64 = 0.10;

const NO_RESULTS_REASON: &str = "No comparable prices found";

/// Title similarity between an auction and a web result (0.0 to 1.0).
///
/// `0.7 * overlap + bonuses + 0.1`, where overlap is the share of the
/// auction's words longer than two characters found in the result title.
pub fn relevance(
    auction_title: &str,
    result_title: &str,
    brand: Option<&str>,
    model: Option<&str>,
) -> f32 {
    let result_canonical = canonicalize(result_title);
    let result_words: HashSet<&str> = result_canonical.split(' ').collect();

    let auction_words: Vec<String> = tokens(auction_title)
        .into_iter()
        .filter(|w| w.len() > 2)
        .collect();

    let overlap = if auction_words.is_empty() {
        0.0
    } else {
        let matched = auction_words
            .iter()
            .filter(|w| result_words.contains(w.as_str()))
            .count();
        matched as f32 / auction_words.len() as f32
    };

    let mut bonus = 0.0;
    if substring_match(&result_canonical, brand) {
        bonus += MATCH_BONUS;
    }
    if substring_match(&result_canonical, model) {
        bonus += MATCH_BONUS;
    }

    (OVERLAP_WEIGHT * overlap + bonus + BASE_RELEVANCE).clamp(0.0, 1.0)
}

fn substring_match(haystack: &str, needle: Option<&str>) -> bool {
    needle
        .map(canonicalize)
        .is_some_and(|n| !n.is_empty() && haystack.contains(&n))
}

/// Fill `relevance_score` on every result.
pub fn score_results(
    results: &mut [WebPriceResult],
    auction_title: &str,
    brand: Option<&str>,
    model: Option<&str>,
) {
    for result in results.iter_mut() {
        result.relevance_score = relevance(auction_title, &result.title, brand, model);
    }
}

/// Drop results below the relevance floor or without a positive price.
pub fn filter_relevant(results: Vec<WebPriceResult>, min_relevance: f32) -> Vec<WebPriceResult> {
    results
        .into_iter()
        .filter(|r| r.price > 0.0 && r.relevance_score >= min_relevance)
        .collect()
}

/// Price a buyer would actually pay, shipping included.
pub fn effective_price(result: &WebPriceResult) -> f64 {
    match (result.shipping_included, result.shipping_cost) {
        (Some(false), Some(cost)) if cost > 0.0 => result.price + cost,
        _ => result.price,
    }
}

/// Statistics over raw prices.
///
/// Empty input yields all zeros with `count == 0`.
pub fn price_stats(prices: &[f64]) -> PriceStats {
    if prices.is_empty() {
        return PriceStats::default();
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len();
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    let average = sorted.iter().sum::<f64>() / count as f64;

    PriceStats {
        min: sorted[0],
        max: sorted[count - 1],
        median: round_to(median, 2),
        average: round_to(average, 2),
        count,
    }
}

/// Statistics over results, using shipping-inclusive prices.
pub fn stats(results: &[WebPriceResult]) -> PriceStats {
    let prices: Vec<f64> = results.iter().map(effective_price).collect();
    price_stats(&prices)
}

/// Confidence from result count and mean relevance.
pub fn confidence(results: &[WebPriceResult]) -> ConfidenceLevel {
    let count = results.len();
    if count == 0 {
        return ConfidenceLevel::Low;
    }
    let mean = results.iter().map(|r| r.relevance_score).sum::<f32>() / count as f32;

    if count >= HIGH_MIN_COUNT && mean >= HIGH_MIN_RELEVANCE {
        ConfidenceLevel::High
    } else if count >= MEDIUM_MIN_COUNT && mean >= MEDIUM_MIN_RELEVANCE {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Buy/skip verdict for an auction price against market stats.
///
/// At or below `min * (1 - margin_pct)` is `worth_it`; above the median
/// is `not_worth_it`; anything between is `borderline`. The margin is
/// always measured against the minimum.
pub fn verdict(auction_price: f64, stats: &PriceStats, margin_pct: f64) -> Verdict {
    if stats.is_empty() {
        return Verdict {
            status: VerdictStatus::Borderline,
            margin: 0.0,
            reason: NO_RESULTS_REASON.to_string(),
        };
    }

    let margin = if stats.min > 0.0 {
        round_to((stats.min - auction_price) / stats.min * 100.0, 1)
    } else {
        0.0
    };
    let worth_it_threshold = stats.min * (1.0 - margin_pct);

    let (status, reason) = if auction_price <= worth_it_threshold {
        (
            VerdictStatus::WorthIt,
            format!(
                "{:.2} is {:.1}% below the lowest market price ({:.2})",
                auction_price, margin, stats.min
            ),
        )
    } else if auction_price > stats.median {
        (
            VerdictStatus::NotWorthIt,
            format!(
                "{:.2} is above the median market price ({:.2})",
                auction_price, stats.median
            ),
        )
    } else {
        (
            VerdictStatus::Borderline,
            format!(
                "{:.2} is between the lowest ({:.2}) and median ({:.2}) market prices",
                auction_price, stats.min, stats.median
            ),
        )
    };

    Verdict {
        status,
        margin,
        reason,
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_100_150() -> PriceStats {
        PriceStats {
            min: 100.0,
            max: 200.0,
            median: 150.0,
            average: 150.0,
            count: 4,
        }
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(
            price_stats(&[]),
            PriceStats {
                min: 0.0,
                max: 0.0,
                median: 0.0,
                average: 0.0,
                count: 0
            }
        );
    }

    #[test]
    fn test_odd_stats() {
        let stats = price_stats(&[300.0, 100.0, 200.0]);
        assert_eq!(stats.median, 200.0);
        assert_eq!(stats.average, 200.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 300.0);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn test_even_median_interpolates_and_rounds() {
        let stats = price_stats(&[10.0, 20.0, 30.333, 40.0]);
        assert_eq!(stats.median, 25.17);
        assert_eq!(stats.average, 25.08);
    }

    #[test]
    fn test_verdict_worth_it() {
        let v = verdict(80.0, &stats_100_150(), 0.10);
        assert_eq!(v.status, VerdictStatus::WorthIt);
        assert_eq!(v.margin, 20.0);
    }

    #[test]
    fn test_verdict_threshold_is_inclusive() {
        let v = verdict(90.0, &stats_100_150(), 0.10);
        assert_eq!(v.status, VerdictStatus::WorthIt);
    }

    #[test]
    fn test_verdict_not_worth_it() {
        let v = verdict(160.0, &stats_100_150(), 0.10);
        assert_eq!(v.status, VerdictStatus::NotWorthIt);
        assert_eq!(v.margin, -60.0);
    }

    #[test]
    fn test_verdict_borderline() {
        let v = verdict(120.0, &stats_100_150(), 0.10);
        assert_eq!(v.status, VerdictStatus::Borderline);
        assert_eq!(v.margin, -20.0);
    }

    #[test]
    fn test_verdict_without_results() {
        let v = verdict(120.0, &PriceStats::default(), 0.10);
        assert_eq!(v.status, VerdictStatus::Borderline);
        assert_eq!(v.margin, 0.0);
        assert_eq!(v.reason, NO_RESULTS_REASON);
    }

    #[test]
    fn test_relevance_components() {
        // no overlap, no bonus: floor only
        let floor = relevance("Rolex Submariner", "Garden hose", None, None);
        assert!((floor - 0.1).abs() < 1e-6);

        // full overlap plus both bonuses clamps to 1
        let full = relevance(
            "Apple iPhone 13",
            "Apple iPhone 13 128GB",
            Some("Apple"),
            Some("iPhone 13"),
        );
        assert_eq!(full, 1.0);

        // "13" is too short to count; 2 of 2 long words match
        let partial = relevance("Apple iPhone 13", "apple iphone", None, None);
        assert!((partial - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_brand_and_model_bonuses_are_independent() {
        let brand_only = relevance("xyz", "Sony headphones", Some("sony"), Some("wh1000"));
        assert!((brand_only - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_levels() {
        let make = |n: usize, score: f32| -> Vec<WebPriceResult> {
            (0..n)
                .map(|i| WebPriceResult::new(format!("r{i}"), 100.0, "shop").with_relevance(score))
                .collect()
        };
        assert_eq!(confidence(&make(5, 0.8)), ConfidenceLevel::High);
        assert_eq!(confidence(&make(5, 0.6)), ConfidenceLevel::Medium);
        assert_eq!(confidence(&make(3, 0.5)), ConfidenceLevel::Medium);
        assert_eq!(confidence(&make(2, 0.9)), ConfidenceLevel::Low);
        assert_eq!(confidence(&[]), ConfidenceLevel::Low);
    }

    #[test]
    fn test_shipping_counts_when_excluded() {
        let results = vec![
            WebPriceResult::new("a", 100.0, "shop").with_shipping(false, Some(10.0)),
            WebPriceResult::new("b", 100.0, "shop").with_shipping(true, Some(10.0)),
        ];
        let stats = stats(&results);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 110.0);
    }

    #[test]
    fn test_filter_relevant() {
        let results = vec![
            WebPriceResult::new("a", 100.0, "shop").with_relevance(0.8),
            WebPriceResult::new("b", 100.0, "shop").with_relevance(0.1),
            WebPriceResult::new("c", 0.0, "shop").with_relevance(0.9),
        ];
        let kept = filter_relevant(results, 0.3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "a");
    }
}
