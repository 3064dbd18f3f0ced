//! Per-domain defaults used when a site does not state them.

/// Buyer premium applied when neither adapter nor AI found one.
pub const FALLBACK_BUYER_PREMIUM: f64 = 0.20;

/// Known sites: domain, house premium (fraction of hammer price), currency.
const SITES: &[(&str, f64, &str)] = &[
    ("drouot.com", 0.25, "EUR"),
    ("interencheres.com", 0.22, "EUR"),
    ("invaluable.com", 0.25, "USD"),
    ("liveauctioneers.com", 0.25, "USD"),
    ("the-saleroom.com", 0.25, "GBP"),
    ("lot-tissimo.com", 0.23, "EUR"),
    ("bidspirit.com", 0.20, "USD"),
    ("catawiki.com", 0.20, "EUR"),
    ("auction.fr", 0.22, "EUR"),
];

/// Currency by top-level domain for unknown sites, checked as suffixes.
const TLD_CURRENCIES: &[(&str, &str)] = &[
    (".co.uk", "GBP"),
    (".uk", "GBP"),
    (".ch", "CHF"),
    (".fr", "EUR"),
    (".de", "EUR"),
    (".it", "EUR"),
    (".es", "EUR"),
    (".be", "EUR"),
    (".nl", "EUR"),
    (".at", "EUR"),
];

/// Table row for a domain; subdomains inherit.
fn site(domain: &str) -> Option<&'static (&'static str, f64, &'static str)> {
    let domain = domain.to_lowercase();
    SITES
        .iter()
        .find(|(site, _, _)| domain == *site || domain.ends_with(&format!(".{site}")))
}

/// Default buyer premium for a domain.
pub fn buyer_premium(domain: &str) -> f64 {
    site(domain)
        .map(|(_, premium, _)| *premium)
        .unwrap_or(FALLBACK_BUYER_PREMIUM)
}

/// Default currency for a domain: the site's own, else by TLD, else USD.
pub fn currency(domain: &str) -> &'static str {
    if let Some((_, _, currency)) = site(domain) {
        return *currency;
    }
    let domain = domain.to_lowercase();
    TLD_CURRENCIES
        .iter()
        .find(|(tld, _)| domain.ends_with(tld))
        .map(|(_, currency)| *currency)
        .unwrap_or("USD")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_premiums() {
        assert_eq!(buyer_premium("drouot.com"), 0.25);
        assert_eq!(buyer_premium("www.catawiki.com"), 0.20);
        assert_eq!(buyer_premium("example.org"), FALLBACK_BUYER_PREMIUM);
        // suffix must be a whole label
        assert_eq!(buyer_premium("notdrouot.com"), FALLBACK_BUYER_PREMIUM);
    }

    #[test]
    fn test_currency_by_domain() {
        assert_eq!(currency("drouot.com"), "EUR");
        assert_eq!(currency("encheres.fr"), "EUR");
        assert_eq!(currency("bonhams.co.uk"), "GBP");
        assert_eq!(currency("liveauctioneers.com"), "USD");
    }

    #[test]
    fn test_site_table_covers_premium_and_currency() {
        assert_eq!(currency("www.the-saleroom.com"), "GBP");
        assert_eq!(buyer_premium("www.the-saleroom.com"), 0.25);
        assert_eq!(currency("fr.catawiki.com"), "EUR");
        assert_eq!(currency("notdrouot.com"), "USD");
    }
}
