//! Auction lot data as extracted from a live page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fees applied on top of the hammer price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    /// Buyer premium as a fraction (0.20 = 20%)
    pub buyer_premium: f64,
}

/// A single auction lot snapshot.
///
/// `total_price` is kept equal to `current_bid * (1 + fees.buyer_premium)`
/// by every setter that touches the bid or the premium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionData {
    /// Lot title as shown on the page
    pub title: String,

    /// Free-text condition, if the site shows one
    #[serde(default)]
    pub condition: Option<String>,

    /// Current bid (hammer price so far), never negative
    pub current_bid: f64,

    /// ISO currency code
    pub currency: String,

    #[serde(default)]
    pub fees: Fees,

    /// Bid including buyer premium
    pub total_price: f64,

    pub site_domain: String,

    /// Two-letter locale code
    pub locale: String,

    pub lot_url: String,

    pub extracted_at: DateTime<Utc>,

    /// Confidence of the extraction (1.0 for schema-exact adapters)
    #[serde(default)]
    pub extraction_confidence: Option<f32>,
}

impl AuctionData {
    /// Create a new snapshot with no premium applied yet.
    pub fn new(
        title: impl Into<String>,
        current_bid: f64,
        currency: impl Into<String>,
        site_domain: impl Into<String>,
    ) -> Self {
        let current_bid = current_bid.max(0.0);
        Self {
            title: title.into(),
            condition: None,
            current_bid,
            currency: currency.into(),
            fees: Fees::default(),
            total_price: current_bid,
            site_domain: site_domain.into(),
            locale: "en".to_string(),
            lot_url: String::new(),
            extracted_at: Utc::now(),
            extraction_confidence: None,
        }
    }

    /// Set the buyer premium and recompute the total.
    pub fn with_buyer_premium(mut self, premium: f64) -> Self {
        self.fees.buyer_premium = premium;
        self.recompute_total();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_lot_url(mut self, url: impl Into<String>) -> Self {
        self.lot_url = url.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.extraction_confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_extracted_at(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_at = at;
        self
    }

    /// Replace the bid (clamped at zero) and recompute the total.
    pub fn set_bid(&mut self, bid: f64) {
        self.current_bid = bid.max(0.0);
        self.recompute_total();
    }

    /// Recompute `total_price` from bid and premium.
    pub fn recompute_total(&mut self) {
        self.total_price = self.current_bid * (1.0 + self.fees.buyer_premium);
    }

    /// A price of zero means "no comparison should be attempted".
    pub fn has_usable_price(&self) -> bool {
        self.current_bid > 0.0
    }

    /// Change detection for live pages.
    ///
    /// Only bid, total and title count; timestamps and confidence do not.
    pub fn has_changed(&self, other: &AuctionData) -> bool {
        self.current_bid != other.current_bid
            || self.total_price != other.total_price
            || self.title != other.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_price_follows_premium() {
        let auction = AuctionData::new("Rolex Submariner", 1000.0, "EUR", "drouot.com")
            .with_buyer_premium(0.25);
        assert_eq!(auction.total_price, 1250.0);
    }

    #[test]
    fn test_negative_bid_is_clamped() {
        let mut auction = AuctionData::new("Lot", -5.0, "EUR", "x.com");
        assert_eq!(auction.current_bid, 0.0);
        auction.set_bid(-1.0);
        assert!(!auction.has_usable_price());
    }

    #[test]
    fn test_unchanged_snapshots_are_not_changed() {
        let a = AuctionData::new("iPhone 13", 200.0, "EUR", "x.com").with_buyer_premium(0.2);
        let mut b = a.clone();
        b.extracted_at = a.extracted_at + chrono::Duration::seconds(5);
        b.extraction_confidence = Some(0.3);
        assert!(!a.has_changed(&b));
    }

    #[test]
    fn test_price_only_change_is_changed() {
        let a = AuctionData::new("iPhone 13", 200.0, "EUR", "x.com").with_buyer_premium(0.2);
        let mut b = a.clone();
        b.set_bid(210.0);
        assert!(a.has_changed(&b));
    }

    #[test]
    fn test_serializes_camel_case() {
        let auction = AuctionData::new("Lot", 10.0, "EUR", "x.com").with_buyer_premium(0.2);
        let json = serde_json::to_value(&auction).unwrap();
        assert_eq!(json["currentBid"], 10.0);
        assert_eq!(json["fees"]["buyerPremium"], 0.2);
        assert_eq!(json["totalPrice"], 12.0);
    }
}
