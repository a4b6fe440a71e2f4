//! Price lookup façade: cache in front of the provider fallback chain.

use std::sync::Arc;

use log::{debug, info, warn};

use super::responses::{
    CacheInfoResponse, CachedStockInfo, ClearCacheResponse, PriceResponse, ProbeReport,
    ProbeResult, ProviderProbe, CACHE_CLEARED_MESSAGE, STATUS_SUCCESS,
};
use crate::cache::QuoteCache;
use crate::config::MarketDataConfig;
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{Ticker, CACHE_SOURCE};
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::finnhub::FinnhubProvider;
use crate::provider::polygon::PolygonProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::MarketDataProvider;
use crate::registry::{ProbeOutcome, ProviderRegistry, RetryPolicy};

/// Ticker probed when the caller does not name one.
pub const DEFAULT_PROBE_TICKER: &str = "AAPL";

/// Latest-price lookups with caching and provider fallback.
///
/// The service never fails: every outcome, total provider failure included,
/// is reported through the returned response. It is `Send + Sync` and meant
/// to be shared behind an `Arc`.
pub struct PriceService {
    cache: QuoteCache,
    registry: ProviderRegistry,
}

impl PriceService {
    /// Build the default chain: Yahoo Finance, then Finnhub, Alpha Vantage
    /// and Polygon.io for whichever keys are configured.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        let timeout = config.request_timeout;
        let credentials = &config.credentials;

        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
            Arc::new(YahooProvider::new(timeout)?),
            Arc::new(FinnhubProvider::new(credentials.finnhub.clone(), timeout)),
            Arc::new(AlphaVantageProvider::new(
                credentials.alpha_vantage.clone(),
                timeout,
            )),
            Arc::new(PolygonProvider::new(credentials.polygon.clone(), timeout)),
        ];

        let (configured, total) = credentials.summary();
        info!(
            "Price service initialized: {}/{} alternative sources configured",
            configured, total
        );

        Ok(Self::with_providers(config, providers))
    }

    /// Build a service over an explicit provider list.
    pub fn with_providers(
        config: &MarketDataConfig,
        providers: Vec<Arc<dyn MarketDataProvider>>,
    ) -> Self {
        let registry = ProviderRegistry::new(providers, RetryPolicy::new(&config.retry))
            .with_retry_secondary(config.retry.retry_secondary_providers)
            .with_chain_deadline(config.chain_deadline);

        Self {
            cache: QuoteCache::new(&config.cache),
            registry,
        }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Latest price for `ticker`, from the cache while fresh and from the
    /// provider chain otherwise.
    ///
    /// Only successful lookups touch the cache.
    pub async fn get_price(&self, ticker: &str) -> PriceResponse {
        let ticker = match Ticker::parse(ticker) {
            Ok(ticker) => ticker,
            Err(e) => {
                debug!("Rejected ticker '{}': {}", ticker, e);
                return PriceResponse::Error {
                    ticker: ticker.trim().to_string(),
                    error_message: e.to_string(),
                    suggestion: None,
                };
            }
        };

        if let Some(entry) = self.cache.get(&ticker) {
            debug!("Serving {} from cache", ticker);
            return PriceResponse::Success {
                ticker: ticker.to_string(),
                price: entry.quote.price(),
                timestamp: entry.quote.captured_at(),
                source: CACHE_SOURCE.to_string(),
            };
        }

        let (result, diagnostics) = self.registry.fetch_latest_quote(&ticker).await;
        match result {
            Ok(quote) => {
                debug!("Fetched {} [{}]", ticker, diagnostics.summary());
                let response = PriceResponse::Success {
                    ticker: ticker.to_string(),
                    price: quote.price(),
                    timestamp: quote.captured_at(),
                    source: quote.source().to_string(),
                };
                self.cache.put(quote);
                response
            }
            Err(error) => PriceResponse::Error {
                ticker: ticker.to_string(),
                error_message: error.to_string(),
                suggestion: Some(error.suggestion().to_string()),
            },
        }
    }

    /// Look up several tickers one after the other.
    pub async fn get_prices(&self, tickers: &[&str]) -> Vec<PriceResponse> {
        let mut responses = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            responses.push(self.get_price(ticker).await);
        }
        responses
    }

    /// Drop every cached quote.
    pub fn clear_cache(&self) -> ClearCacheResponse {
        let cleared_entries = self.cache.clear();
        info!("Cleared {} cached quotes", cleared_entries);
        ClearCacheResponse {
            status: STATUS_SUCCESS,
            message: CACHE_CLEARED_MESSAGE.to_string(),
            cleared_entries,
        }
    }

    /// Current cache contents, stale entries included.
    pub fn cache_info(&self) -> CacheInfoResponse {
        let cached_stocks = self
            .cache
            .snapshot()
            .into_iter()
            .map(|row| {
                let quote = &row.entry.quote;
                let info = CachedStockInfo {
                    price: quote.price(),
                    timestamp: quote.captured_at(),
                    source: quote.source().to_string(),
                    age_minutes: row.age_minutes,
                    expires_in_minutes: row.expires_in_minutes,
                };
                (quote.ticker().to_string(), info)
            })
            .collect();

        CacheInfoResponse {
            status: STATUS_SUCCESS,
            cache_size: self.cache.len(),
            cache_duration_minutes: self.cache.ttl().as_secs() / 60,
            alternative_sources_available: self.registry.alternatives_available(),
            cached_stocks,
        }
    }

    /// Call every provider once for `ticker` (default [`DEFAULT_PROBE_TICKER`]),
    /// bypassing the cache and the fallback short-circuit.
    pub async fn probe_all_providers(&self, ticker: Option<&str>) -> ProbeReport {
        let ticker = match ticker.map(str::trim).filter(|t| !t.is_empty()) {
            None => Ticker::from_static(DEFAULT_PROBE_TICKER),
            Some(raw) => match Ticker::parse(raw) {
                Ok(ticker) => ticker,
                Err(e) => {
                    warn!("{}; probing {} instead", e, DEFAULT_PROBE_TICKER);
                    Ticker::from_static(DEFAULT_PROBE_TICKER)
                }
            },
        };

        let results = self
            .registry
            .probe_all(&ticker)
            .await
            .into_iter()
            .map(probe_row)
            .collect();

        ProbeReport {
            ticker: ticker.to_string(),
            results,
        }
    }
}

fn probe_row(outcome: ProbeOutcome) -> ProviderProbe {
    let rate_limit_per_minute = outcome.rate_limit.requests_per_minute;
    let result = match outcome.result {
        Ok(quote) => ProbeResult::Success {
            price: quote.price(),
            timestamp: quote.captured_at(),
            rate_limit_per_minute,
        },
        Err(e) if e.retry_class() == RetryClass::NotConfigured => ProbeResult::NotConfigured {
            error_message: e.to_string(),
        },
        Err(e) => ProbeResult::Error {
            error_message: e.to_string(),
            transient: e.is_transient(),
            rate_limit_per_minute,
        },
    };

    ProviderProbe {
        provider: outcome.provider_id.into_owned(),
        result,
    }
}
