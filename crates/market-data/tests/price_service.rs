//! End-to-end behavior of the price service over scripted providers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;

use stockwatch_market_data::errors::MarketDataError;
use stockwatch_market_data::{
    CacheConfig, MarketDataConfig, MarketDataProvider, PriceResponse, PriceService, Quote,
    RateLimit, RetryConfig, Ticker, CACHE_SOURCE,
};

type Step = Box<dyn Fn(&Ticker) -> Result<Quote, MarketDataError> + Send + Sync>;

/// Provider that replays a script of outcomes, repeating the last one.
struct ScriptedProvider {
    id: &'static str,
    priority: u8,
    retries: bool,
    script: Mutex<VecDeque<Step>>,
    last: Step,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(id: &'static str, priority: u8, last: Step) -> Self {
        Self {
            id,
            priority,
            retries: false,
            script: Mutex::new(VecDeque::new()),
            last,
            calls: AtomicUsize::new(0),
        }
    }

    fn primary(mut self) -> Self {
        self.retries = true;
        self
    }

    fn then(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(60)
    }

    fn retries_transient_failures(&self) -> bool {
        self.retries
    }

    async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(step) => step(ticker),
            None => (self.last)(ticker),
        }
    }
}

fn price(id: &'static str, value: rust_decimal::Decimal) -> Step {
    Box::new(move |ticker: &Ticker| Ok(Quote::new(ticker.clone(), value, Utc::now(), id)))
}

fn rate_limited(id: &'static str) -> Step {
    Box::new(move |_: &Ticker| {
        Err(MarketDataError::ProviderError {
            provider: id.to_string(),
            message: "429 Client Error: Too Many Requests".to_string(),
        })
    })
}

fn not_found(id: &'static str) -> Step {
    Box::new(move |ticker: &Ticker| {
        Err(MarketDataError::SymbolNotFound(format!(
            "{}: no valid price data for {}",
            id, ticker
        )))
    })
}

fn fast_config() -> MarketDataConfig {
    MarketDataConfig {
        retry: RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            max_jitter: Duration::ZERO,
            retry_secondary_providers: false,
        },
        ..MarketDataConfig::default()
    }
}

fn build(config: &MarketDataConfig, providers: &[Arc<ScriptedProvider>]) -> PriceService {
    let providers = providers
        .iter()
        .map(|p| p.clone() as Arc<dyn MarketDataProvider>)
        .collect();
    PriceService::with_providers(config, providers)
}

#[tokio::test]
async fn msft_falls_back_to_secondary_after_rate_limits() {
    let yahoo = Arc::new(ScriptedProvider::new("YAHOO", 1, rate_limited("YAHOO")).primary());
    let finnhub = Arc::new(ScriptedProvider::new("FINNHUB", 2, price("FINNHUB", dec!(420.50))));
    let alpha = Arc::new(ScriptedProvider::new("ALPHA_VANTAGE", 3, price("ALPHA_VANTAGE", dec!(1))));
    let polygon = Arc::new(ScriptedProvider::new("POLYGON", 4, price("POLYGON", dec!(1))));
    let service = build(&fast_config(), &[yahoo.clone(), finnhub.clone(), alpha.clone(), polygon.clone()]);

    let response = service.get_price("MSFT").await;

    assert_eq!(response.source(), Some("FINNHUB"));
    assert_eq!(response.price(), Some(dec!(420.50)));
    assert_eq!(yahoo.calls(), 3);
    assert_eq!(finnhub.calls(), 1);
    assert_eq!(alpha.calls(), 0);
    assert_eq!(polygon.calls(), 0);

    let info = service.cache_info();
    let msft = &info.cached_stocks["MSFT"];
    assert_eq!(msft.source, "FINNHUB");
    assert_eq!(msft.price, dec!(420.50));
    assert!((msft.expires_in_minutes - 5.0).abs() < 0.11);
}

#[tokio::test]
async fn primary_recovers_within_retry_budget() {
    let yahoo = Arc::new(
        ScriptedProvider::new("YAHOO", 1, price("YAHOO", dec!(189.25)))
            .primary()
            .then(rate_limited("YAHOO")),
    );
    let finnhub = Arc::new(ScriptedProvider::new("FINNHUB", 2, price("FINNHUB", dec!(1))));
    let service = build(&fast_config(), &[yahoo.clone(), finnhub.clone()]);

    let response = service.get_price("AAPL").await;

    assert_eq!(response.source(), Some("YAHOO"));
    assert_eq!(yahoo.calls(), 2);
    assert_eq!(finnhub.calls(), 0);
}

#[tokio::test]
async fn unknown_symbol_fails_everywhere_without_retries() {
    let providers: Vec<Arc<ScriptedProvider>> = vec![
        Arc::new(ScriptedProvider::new("YAHOO", 1, not_found("YAHOO")).primary()),
        Arc::new(ScriptedProvider::new("FINNHUB", 2, not_found("FINNHUB"))),
        Arc::new(ScriptedProvider::new("ALPHA_VANTAGE", 3, not_found("ALPHA_VANTAGE"))),
        Arc::new(ScriptedProvider::new("POLYGON", 4, not_found("POLYGON"))),
    ];
    let service = build(&fast_config(), &providers);

    let response = service.get_price("ZZZZ").await;

    match &response {
        PriceResponse::Error {
            ticker,
            error_message,
            suggestion,
        } => {
            assert_eq!(ticker, "ZZZZ");
            assert_eq!(error_message.matches("no valid price data for ZZZZ").count(), 4);
            assert!(suggestion.is_some());
        }
        other => panic!("expected an error response, got {other:?}"),
    }
    assert!(providers.iter().all(|p| p.calls() == 1));
    assert_eq!(service.cache_info().cache_size, 0);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["errorMessage"].as_str().unwrap().starts_with("All data sources failed"));
}

#[tokio::test]
async fn cached_price_is_reused_until_ttl_expires() {
    let config = MarketDataConfig {
        cache: CacheConfig {
            ttl: Duration::from_millis(200),
            ..CacheConfig::default()
        },
        ..fast_config()
    };
    let yahoo = Arc::new(
        ScriptedProvider::new("YAHOO", 1, price("YAHOO", dec!(190)))
            .primary()
            .then(price("YAHOO", dec!(189))),
    );
    let service = build(&config, &[yahoo.clone()]);

    let first = service.get_price("AAPL").await;
    let second = service.get_price("AAPL").await;
    assert_eq!(first.price(), Some(dec!(189)));
    assert_eq!(second.price(), Some(dec!(189)));
    assert_eq!(second.source(), Some(CACHE_SOURCE));
    assert_eq!(yahoo.calls(), 1);
    let cached_at = service.cache().snapshot()[0].entry.cached_at;

    tokio::time::sleep(Duration::from_millis(250)).await;

    let third = service.get_price("AAPL").await;
    assert_eq!(third.source(), Some("YAHOO"));
    assert_eq!(third.price(), Some(dec!(190)));
    assert_eq!(yahoo.calls(), 2);
    assert!(service.cache().snapshot()[0].entry.cached_at > cached_at);
}

#[tokio::test]
async fn clear_cache_then_cache_info_is_empty() {
    let yahoo = Arc::new(ScriptedProvider::new("YAHOO", 1, price("YAHOO", dec!(10))).primary());
    let service = build(&fast_config(), &[yahoo.clone()]);

    service.get_prices(&["AAPL", "MSFT", "GOOG"]).await;
    assert_eq!(service.cache_info().cache_size, 3);

    let cleared = service.clear_cache();
    assert_eq!(cleared.cleared_entries, 3);

    let info = service.cache_info();
    assert_eq!(info.cache_size, 0);
    assert!(info.cached_stocks.is_empty());

    // Next lookup goes back to the provider
    service.get_price("AAPL").await;
    assert_eq!(yahoo.calls(), 4);
}

#[tokio::test]
async fn concurrent_lookups_share_one_service() {
    let yahoo = Arc::new(ScriptedProvider::new("YAHOO", 1, price("YAHOO", dec!(42))).primary());
    let service = Arc::new(build(&fast_config(), &[yahoo.clone()]));

    let handles: Vec<_> = ["AAPL", "MSFT", "GOOG", "AMZN"]
        .into_iter()
        .map(|ticker| {
            let service = service.clone();
            tokio::spawn(async move { service.get_price(ticker).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }
    assert_eq!(service.cache_info().cache_size, 4);
}
