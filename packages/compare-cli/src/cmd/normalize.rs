//! `compare normalize`: title to product and signatures.

use anyhow::{Context, Result};
use price_compare::{normalize_with_ai, signatures, NormalizeRequest};

use super::Collaborator;
use crate::config::Config;
use crate::output;

pub async fn run(config: &Config, title: &str, locale: &str, json: bool) -> Result<()> {
    let ai = Collaborator::from_config(config);
    let request = NormalizeRequest::new(title, locale);
    let result = normalize_with_ai(&ai, &request)
        .await
        .context("Failed to normalize title")?;
    let sigs = signatures(&result.product);

    if json {
        let value = serde_json::json!({
            "product": result,
            "signatures": sigs,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::print_header(title);
    output::print_product(&result.product, result.used_ai);
    output::print_signatures(&sigs);
    Ok(())
}
