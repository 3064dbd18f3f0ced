use anyhow::{Context, Result};
use dotenvy::dotenv;
use price_compare::{CacheConfig, CompareConfig, SecretString};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub serpapi_api_key: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub margin_pct: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = CompareConfig::default();
        Ok(Self {
            serpapi_api_key: SecretString::from_env("SERPAPI_API_KEY"),
            openai_api_key: SecretString::from_env("OPENAI_API_KEY"),
            cache_capacity: parse_var("CACHE_CAPACITY", defaults.cache.capacity)
                .context("CACHE_CAPACITY must be a whole number")?,
            cache_ttl: parse_var("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())
                .map(Duration::from_secs)
                .context("CACHE_TTL_SECS must be a number of seconds")?,
            margin_pct: parse_var("MARGIN_PCT", defaults.margin_pct)
                .context("MARGIN_PCT must be a fraction such as 0.10")?,
        })
    }

    /// Search key, required by the `compare` command only.
    pub fn serpapi_key(&self) -> Result<&SecretString> {
        self.serpapi_api_key
            .as_ref()
            .context("SERPAPI_API_KEY must be set to run comparisons")
    }

    pub fn compare_config(&self) -> CompareConfig {
        CompareConfig::default()
            .with_margin_pct(self.margin_pct)
            .with_cache_ttl(self.cache_ttl)
            .with_cache(
                CacheConfig::default()
                    .with_capacity(self.cache_capacity)
                    .with_default_ttl(self.cache_ttl),
            )
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_defaults_and_errors() {
        env::set_var("COMPARE_CLI_TEST_CAPACITY", "250");
        assert_eq!(parse_var("COMPARE_CLI_TEST_CAPACITY", 500usize).unwrap(), 250);

        assert_eq!(parse_var("COMPARE_CLI_TEST_UNSET", 500usize).unwrap(), 500);

        env::set_var("COMPARE_CLI_TEST_BAD_MARGIN", "ten percent");
        assert!(parse_var("COMPARE_CLI_TEST_BAD_MARGIN", 0.1f64).is_err());
    }

    #[test]
    fn test_compare_config_carries_overrides() {
        let config = Config {
            serpapi_api_key: None,
            openai_api_key: None,
            cache_capacity: 42,
            cache_ttl: Duration::from_secs(60),
            margin_pct: 0.2,
        };
        let compare = config.compare_config();
        assert_eq!(compare.margin_pct, 0.2);
        assert_eq!(compare.cache.capacity, 42);
        assert_eq!(compare.cache_ttl, Duration::from_secs(60));
        assert!(config.serpapi_key().is_err());
    }
}
