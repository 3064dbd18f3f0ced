//! `compare compare`: the full pipeline against the live search provider.

use anyhow::{Context, Result};
use price_compare::{AuctionData, Comparator, SearcherExt, SerpApiSearcher};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::Collaborator;
use crate::config::Config;
use crate::output;

/// SerpAPI plans allow a handful of calls per second at most.
const SEARCH_REQUESTS_PER_SECOND: u32 = 2;

pub async fn run(config: &Config, auction_path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(auction_path)
        .with_context(|| format!("Failed to read {}", auction_path.display()))?;
    let mut auction: AuctionData =
        serde_json::from_str(&raw).context("Auction file must be a camelCase auction record")?;
    // files are hand-edited; never trust a stale total
    auction.recompute_total();

    let searcher = SerpApiSearcher::new(config.serpapi_key()?.expose())
        .rate_limited(SEARCH_REQUESTS_PER_SECOND);
    let ai = Arc::new(Collaborator::from_config(config));
    let comparator = Comparator::new(ai, searcher, config.compare_config());

    info!(title = %auction.title, total = auction.total_price, "Comparing auction");
    let response = comparator
        .compare(&auction)
        .await
        .with_context(|| format!("Comparison failed for \"{}\"", auction.title))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    output::print_response(&response);
    Ok(())
}
