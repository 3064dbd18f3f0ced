//! `compare score`: offline scoring of saved search results.

use anyhow::{Context, Result};
use price_compare::{scoring, WebPriceResult};
use std::path::Path;

use crate::config::Config;
use crate::output;

/// Relevance floor applied when a title is given.
const MIN_RELEVANCE: f32 = 0.3;

pub fn run(
    config: &Config,
    price: f64,
    results_path: &Path,
    title: Option<&str>,
    json: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(results_path)
        .with_context(|| format!("Failed to read {}", results_path.display()))?;
    let mut results: Vec<WebPriceResult> =
        serde_json::from_str(&raw).context("Results file must be a JSON array of price results")?;

    if let Some(title) = title {
        scoring::score_results(&mut results, title, None, None);
        results = scoring::filter_relevant(results, MIN_RELEVANCE);
    }

    let stats = scoring::stats(&results);
    let confidence = scoring::confidence(&results);
    let verdict = scoring::verdict(price, &stats, config.margin_pct);

    if json {
        let value = serde_json::json!({
            "stats": stats,
            "confidence": confidence,
            "verdict": verdict,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::print_header(&format!("Scoring {price:.2} against {} results", results.len()));
    output::print_stats(&stats, confidence);
    output::print_verdict(&verdict);
    Ok(())
}
