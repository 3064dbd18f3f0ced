//! Terminal rendering of comparison results.

use colored::Colorize;
use price_compare::{
    CacheSource, CompareResponse, ConfidenceLevel, NormalizedProduct, PriceStats,
    ProductSignatures, Verdict, VerdictStatus,
};

pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bright_cyan().bold());
    println!("{}", "─".repeat(title.chars().count()).bright_cyan());
}

pub fn print_product(product: &NormalizedProduct, used_ai: bool) {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".dimmed().to_string());
    println!("  brand        {}", field(&product.brand));
    println!("  model        {}", field(&product.model));
    println!("  reference    {}", field(&product.reference));
    println!(
        "  capacity     {}",
        product
            .capacity_gb
            .map(|c| format!("{c} GB"))
            .unwrap_or_else(|| "-".dimmed().to_string())
    );
    println!("  category     {}", field(&product.category));
    println!(
        "  condition    {} ({:?}, {:.2})",
        product.condition_grade.as_str(),
        product.functional_state,
        product.condition_confidence
    );
    println!("  confidence   {:.2}{}", product.confidence, if used_ai { " (AI)" } else { "" });
    println!("  query        {}", product.query.bold());
    for alt in &product.alt_queries {
        println!("  alt query    {}", alt);
    }
}

pub fn print_signatures(sigs: &ProductSignatures) {
    println!("  strict       {}", sigs.strict.dimmed());
    println!("  loose        {}", sigs.loose.dimmed());
}

pub fn print_stats(stats: &PriceStats, confidence: ConfidenceLevel) {
    if stats.is_empty() {
        println!("  {}", "no comparable prices".yellow());
        return;
    }
    println!(
        "  {} prices: min {:.2}  median {:.2}  avg {:.2}  max {:.2}",
        stats.count, stats.min, stats.median, stats.average, stats.max
    );
    println!("  confidence   {:?}", confidence);
}

pub fn print_verdict(verdict: &Verdict) {
    let label = match verdict.status {
        VerdictStatus::WorthIt => "WORTH IT".green().bold(),
        VerdictStatus::Borderline => "BORDERLINE".yellow().bold(),
        VerdictStatus::NotWorthIt => "NOT WORTH IT".red().bold(),
    };
    println!("  {}  ({:+.1}%)", label, verdict.margin);
    println!("  {}", verdict.reason);
}

pub fn print_response(response: &CompareResponse) {
    print_header(&format!("Comparison for \"{}\"", response.query_used));
    print_stats(&response.stats, response.confidence);
    print_verdict(&response.verdict);

    if let Some(cache) = &response.cache {
        let source = match cache.source {
            CacheSource::CacheStrict => "cache (strict)",
            CacheSource::CacheLoose => "cache (loose, re-scored)",
            CacheSource::FreshFetch => "fresh search",
        };
        println!("  source       {}", source.dimmed());
    }

    for result in response.results.iter().take(10) {
        println!(
            "    {:>10.2}  {:<20}  {}",
            result.price,
            result.source,
            result.title.dimmed()
        );
    }
}
