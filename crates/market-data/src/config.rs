//! Configuration for the quote subsystem.
//!
//! [`MarketDataConfig`] is built once (usually from the environment) and
//! handed to each component at construction time. Nothing in the crate reads
//! configuration from global state.

use std::time::Duration;

use log::warn;

/// Default time a cached quote stays fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default soft limit on cached tickers.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;

/// Default number of attempts (first call included) for retried providers.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default ceiling for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default upper bound (exclusive) of the random jitter added to each delay.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(1);

/// Default per-request timeout for every provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Placeholder values shipped in sample configs; treated as "no key".
const PLACEHOLDER_KEYS: &[&str] = &[
    "your_alpha_vantage_key_here",
    "your_finnhub_key_here",
    "your_polygon_key_here",
];

/// Cache settings.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a cached quote is served without going to the network.
    pub ttl: Duration,
    /// Soft size limit. Exceeding it is logged; nothing is evicted.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Retry settings.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    /// Base of the exponential backoff.
    pub base_delay: Duration,
    /// Ceiling for a single delay.
    pub max_delay: Duration,
    /// Random jitter is drawn from `[0, max_jitter)`.
    pub max_jitter: Duration,
    /// Also retry the secondary providers. Off by default: they run on much
    /// smaller free-tier budgets and get a single attempt each.
    pub retry_secondary_providers: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
            retry_secondary_providers: false,
        }
    }
}

/// API keys for the secondary providers. Each one is optional; a missing key
/// disables only that provider.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub finnhub: Option<String>,
    pub alpha_vantage: Option<String>,
    pub polygon: Option<String>,
}

impl ProviderCredentials {
    /// Number of configured keys and the total number of keyed providers.
    pub fn summary(&self) -> (usize, usize) {
        let keys = [&self.finnhub, &self.alpha_vantage, &self.polygon];
        let configured = keys.iter().filter(|k| k.is_some()).count();
        (configured, keys.len())
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |key: &Option<String>| if key.is_some() { "***" } else { "<unset>" };
        f.debug_struct("ProviderCredentials")
            .field("finnhub", &mask(&self.finnhub))
            .field("alpha_vantage", &mask(&self.alpha_vantage))
            .field("polygon", &mask(&self.polygon))
            .finish()
    }
}

/// Top-level configuration.
#[derive(Clone, Debug)]
pub struct MarketDataConfig {
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    /// Timeout applied to each individual provider request.
    pub request_timeout: Duration,
    /// Optional bound on the whole fallback chain. `None` means each provider
    /// call is only bounded by its own timeout.
    pub chain_deadline: Option<Duration>,
    pub credentials: ProviderCredentials,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            chain_deadline: None,
            credentials: ProviderCredentials::default(),
        }
    }
}

impl MarketDataConfig {
    /// Build a configuration from process environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `STOCKWATCH_CACHE_TTL_SECS` | cache TTL |
    /// | `STOCKWATCH_CACHE_MAX_ENTRIES` | soft cache size limit |
    /// | `STOCKWATCH_MAX_RETRIES` | attempts per retried provider |
    /// | `STOCKWATCH_RETRY_BASE_DELAY_MS` | backoff base |
    /// | `STOCKWATCH_RETRY_MAX_DELAY_MS` | backoff ceiling |
    /// | `STOCKWATCH_RETRY_SECONDARY` | `true` to retry secondary providers too |
    /// | `STOCKWATCH_REQUEST_TIMEOUT_SECS` | per-request timeout |
    /// | `STOCKWATCH_CHAIN_DEADLINE_SECS` | overall chain deadline |
    /// | `FINNHUB_API_KEY`, `ALPHA_VANTAGE_API_KEY`, `POLYGON_API_KEY` | credentials |
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache = CacheConfig {
            ttl: parse_or(&lookup, "STOCKWATCH_CACHE_TTL_SECS", defaults.cache.ttl, |v| {
                v.parse().ok().map(Duration::from_secs)
            }),
            max_entries: parse_or(
                &lookup,
                "STOCKWATCH_CACHE_MAX_ENTRIES",
                defaults.cache.max_entries,
                |v| v.parse().ok(),
            ),
        };

        let retry = RetryConfig {
            max_attempts: parse_or(
                &lookup,
                "STOCKWATCH_MAX_RETRIES",
                defaults.retry.max_attempts,
                |v| v.parse().ok().filter(|n: &u32| *n > 0),
            ),
            base_delay: parse_or(
                &lookup,
                "STOCKWATCH_RETRY_BASE_DELAY_MS",
                defaults.retry.base_delay,
                |v| v.parse().ok().map(Duration::from_millis),
            ),
            max_delay: parse_or(
                &lookup,
                "STOCKWATCH_RETRY_MAX_DELAY_MS",
                defaults.retry.max_delay,
                |v| v.parse().ok().map(Duration::from_millis),
            ),
            max_jitter: defaults.retry.max_jitter,
            retry_secondary_providers: parse_or(
                &lookup,
                "STOCKWATCH_RETRY_SECONDARY",
                defaults.retry.retry_secondary_providers,
                parse_bool,
            ),
        };

        let request_timeout = parse_or(
            &lookup,
            "STOCKWATCH_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout,
            |v| v.parse().ok().filter(|n: &u64| *n > 0).map(Duration::from_secs),
        );

        let chain_deadline = lookup("STOCKWATCH_CHAIN_DEADLINE_SECS").and_then(|v| {
            let parsed = v.trim().parse().ok().filter(|n: &u64| *n > 0);
            if parsed.is_none() {
                warn!("Ignoring invalid STOCKWATCH_CHAIN_DEADLINE_SECS value '{}'", v);
            }
            parsed.map(Duration::from_secs)
        });

        let credentials = ProviderCredentials {
            finnhub: credential(&lookup, "FINNHUB_API_KEY"),
            alpha_vantage: credential(&lookup, "ALPHA_VANTAGE_API_KEY"),
            polygon: credential(&lookup, "POLYGON_API_KEY"),
        };

        Self {
            cache,
            retry,
            request_timeout,
            chain_deadline,
            credentials,
        }
    }
}

/// Returns a usable API key, or `None` for unset, blank or placeholder values.
pub fn sanitize_api_key(raw: Option<String>) -> Option<String> {
    let key = raw?.trim().to_string();
    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key.as_str()) {
        None
    } else {
        Some(key)
    }
}

fn credential<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    sanitize_api_key(lookup(key))
}

fn parse_or<F, T, P>(lookup: &F, key: &str, default: T, parse: P) -> T
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        None => default,
        Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
            warn!("Ignoring invalid {} value '{}', using default", key, raw);
            default
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MarketDataConfig::default();
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
        assert!(!config.retry.retry_secondary_providers);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.chain_deadline.is_none());
        assert_eq!(config.credentials.summary(), (0, 3));
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = MarketDataConfig::from_lookup(lookup_from(&[
            ("STOCKWATCH_CACHE_TTL_SECS", "60"),
            ("STOCKWATCH_MAX_RETRIES", "5"),
            ("STOCKWATCH_RETRY_BASE_DELAY_MS", "250"),
            ("STOCKWATCH_RETRY_SECONDARY", "true"),
            ("STOCKWATCH_CHAIN_DEADLINE_SECS", "45"),
            ("FINNHUB_API_KEY", "abc123"),
        ]));

        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert!(config.retry.retry_secondary_providers);
        assert_eq!(config.chain_deadline, Some(Duration::from_secs(45)));
        assert_eq!(config.credentials.finnhub.as_deref(), Some("abc123"));
        assert_eq!(config.credentials.summary(), (1, 3));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = MarketDataConfig::from_lookup(lookup_from(&[
            ("STOCKWATCH_CACHE_TTL_SECS", "five minutes"),
            ("STOCKWATCH_MAX_RETRIES", "0"),
            ("STOCKWATCH_RETRY_SECONDARY", "maybe"),
            ("STOCKWATCH_CHAIN_DEADLINE_SECS", "-1"),
        ]));

        assert_eq!(config.cache.ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(!config.retry.retry_secondary_providers);
        assert!(config.chain_deadline.is_none());
    }

    #[test]
    fn test_placeholder_keys_are_ignored() {
        let config = MarketDataConfig::from_lookup(lookup_from(&[
            ("ALPHA_VANTAGE_API_KEY", "your_alpha_vantage_key_here"),
            ("POLYGON_API_KEY", "   "),
        ]));
        assert!(config.credentials.alpha_vantage.is_none());
        assert!(config.credentials.polygon.is_none());
    }

    #[test]
    fn test_debug_masks_credentials() {
        let credentials = ProviderCredentials {
            finnhub: Some("secret-token".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("***"));
    }
}
