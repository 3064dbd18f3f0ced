//! SerpAPI-backed price searcher (Google Shopping engine).

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{SearchError, SearchResult};
use crate::security::ProviderCredentials;
use crate::traits::searcher::{PriceQuery, PriceSearcher};
use crate::types::price::WebPriceResult;

const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search.json";

lazy_static! {
    static ref AMOUNT: Regex = Regex::new(r"(\d+(?:[.,]\d{1,2})?)").unwrap();
}

/// Google Shopping search through SerpAPI.
pub struct SerpApiSearcher {
    credentials: ProviderCredentials,
    client: reqwest::Client,
}

impl SerpApiSearcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credentials(ProviderCredentials::new(api_key))
    }

    pub fn with_credentials(credentials: ProviderCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    shopping_results: Vec<ShoppingResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ShoppingResult {
    title: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    extracted_price: Option<f64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    product_link: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    second_hand_condition: Option<String>,
    #[serde(default)]
    delivery: Option<String>,
}

impl ShoppingResult {
    fn into_price_result(self) -> Option<WebPriceResult> {
        let price = self.extracted_price.filter(|p| *p > 0.0)?;
        let mut result = WebPriceResult::new(
            self.title,
            price,
            self.source.unwrap_or_else(|| "unknown".to_string()),
        );
        if let Some(display) = self.price {
            result.price_string = display;
        }
        if let Some(url) = self.product_link.or(self.link) {
            result = result.with_url(url);
        }
        result.thumbnail = self.thumbnail;
        if let Some(condition) = self.second_hand_condition {
            result = result.with_condition(condition);
        }
        if let Some((included, cost)) = self.delivery.as_deref().and_then(parse_delivery) {
            result = result.with_shipping(included, cost);
        }
        Some(result)
    }
}

/// Read shipping terms from a delivery label ("Free delivery", "+€4.99 delivery").
fn parse_delivery(label: &str) -> Option<(bool, Option<f64>)> {
    let lower = label.to_lowercase();
    if ["free", "gratuit", "kostenlos", "gratis"]
        .iter()
        .any(|w| lower.contains(w))
    {
        return Some((true, Some(0.0)));
    }
    let amount = AMOUNT.captures(&lower)?.get(1)?.as_str().replace(',', ".");
    amount.parse::<f64>().ok().map(|cost| (false, Some(cost)))
}

/// Google market (`gl`) for a two-letter locale.
fn market(locale: &str) -> &str {
    match locale {
        "en" => "us",
        "" => "us",
        other => other,
    }
}

#[async_trait]
impl PriceSearcher for SerpApiSearcher {
    async fn search(&self, query: &PriceQuery) -> SearchResult<Vec<WebPriceResult>> {
        let num = query.limit.to_string();
        let response = self
            .client
            .get(self.credentials.endpoint(DEFAULT_ENDPOINT))
            .query(&[
                ("engine", "google_shopping"),
                ("q", query.query.as_str()),
                ("hl", query.locale.as_str()),
                ("gl", market(&query.locale)),
                ("num", num.as_str()),
                ("api_key", self.credentials.api_key.expose()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(Box::new(e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Response = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
        if let Some(error) = parsed.error {
            // "no results" is reported as an error field with a 200
            if error.to_lowercase().contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(SearchError::InvalidResponse(error));
        }

        let mut results: Vec<WebPriceResult> = parsed
            .shopping_results
            .into_iter()
            .filter_map(ShoppingResult::into_price_result)
            .collect();
        results.truncate(query.limit);

        debug!(query = %query.query, count = results.len(), "SerpAPI shopping results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_labels() {
        assert_eq!(parse_delivery("Free delivery"), Some((true, Some(0.0))));
        assert_eq!(parse_delivery("Livraison gratuite"), Some((true, Some(0.0))));
        assert_eq!(parse_delivery("+€4,99 de livraison"), Some((false, Some(4.99))));
        assert_eq!(parse_delivery("+$12.50 delivery"), Some((false, Some(12.5))));
        assert_eq!(parse_delivery("Delivery by Tue"), None);
    }

    #[test]
    fn test_shopping_result_mapping() {
        let json = r#"{
            "shopping_results": [
                {
                    "title": "Apple iPhone 13 128GB",
                    "price": "429,00 €",
                    "extracted_price": 429.0,
                    "source": "Back Market",
                    "product_link": "https://www.google.fr/shopping/product/1",
                    "second_hand_condition": "refurbished",
                    "delivery": "Livraison gratuite"
                },
                { "title": "No price", "source": "Shop" }
            ]
        }"#;
        let parsed: Response = serde_json::from_str(json).unwrap();
        let results: Vec<_> = parsed
            .shopping_results
            .into_iter()
            .filter_map(ShoppingResult::into_price_result)
            .collect();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].price, 429.0);
        assert_eq!(results[0].price_string, "429,00 €");
        assert_eq!(results[0].url, "https://www.google.fr/shopping/product/1");
        assert_eq!(results[0].condition.as_deref(), Some("refurbished"));
        assert_eq!(results[0].shipping_included, Some(true));
    }

    #[test]
    fn test_market_for_locale() {
        assert_eq!(market("en"), "us");
        assert_eq!(market("fr"), "fr");
    }
}
