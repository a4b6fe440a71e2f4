//! Yahoo Finance market data provider.
//!
//! Primary quote source. Needs no API key and is tried first, with every
//! call wrapped in the retry policy. Internally it walks an ordered list of
//! [`YahooStrategy`] values and returns the first price any of them yields.

mod models;
mod strategy;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, StatusCode};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{Quote, Ticker};
use crate::provider::http::{build_client, send, transport_error, unexpected_status};
use crate::provider::{positive_price, MarketDataProvider, RateLimit};

use models::YahooQuoteSummaryResponse;
use strategy::first_price;

pub use strategy::YahooStrategy;

const PROVIDER_ID: &str = "YAHOO";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    client: reqwest::Client,
    crumb: RwLock<Option<CrumbData>>,
    timeout: Duration,
    strategies: Vec<YahooStrategy>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    ///
    /// `timeout` bounds every individual request the strategies make.
    pub fn new(timeout: Duration) -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;

        Ok(Self {
            connector,
            client: build_client(timeout),
            crumb: RwLock::new(None),
            timeout,
            strategies: YahooStrategy::ALL.to_vec(),
        })
    }

    /// Replace the strategy list (order matters).
    pub fn with_strategies(mut self, strategies: Vec<YahooStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self.fetch_crumb().await?;
        *self.crumb.write().await = Some(crumb.clone());
        Ok(crumb)
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // Step 1: Get cookie from fc.yahoo.com
        let response = self
            .client
            .get(COOKIE_URL)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: Get crumb using cookie
        let request = self
            .client
            .get(CRUMB_URL)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &cookie);
        let (status, body) = send(PROVIDER_ID, request).await?;

        let crumb = body.trim().to_string();
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to get crumb (HTTP {})", status),
            });
        }

        debug!("Obtained Yahoo crumb");
        Ok(CrumbData { cookie, crumb })
    }

    /// Clear the cached crumb (used when authentication fails)
    async fn clear_crumb(&self) {
        *self.crumb.write().await = None;
    }

    // ========================================================================
    // Strategies
    // ========================================================================

    async fn run_strategy(
        &self,
        symbol: &str,
        strategy: YahooStrategy,
    ) -> Result<Option<Decimal>, MarketDataError> {
        match strategy.chart_params() {
            None => self.fetch_realtime_price(symbol).await,
            Some((interval, range)) => self.fetch_chart_price(symbol, interval, range).await,
        }
    }

    /// Real-time fields from the quoteSummary API.
    async fn fetch_realtime_price(&self, symbol: &str) -> Result<Option<Decimal>, MarketDataError> {
        let crumb = self.ensure_crumb().await?;

        let url = format!(
            "{}/{}?modules=price,financialData&crumb={}",
            QUOTE_SUMMARY_URL,
            encode(symbol),
            encode(&crumb.crumb)
        );

        let request = self
            .client
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::COOKIE, &crumb.cookie);
        let (status, body) = send(PROVIDER_ID, request).await?;

        if status == StatusCode::UNAUTHORIZED {
            self.clear_crumb().await;
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Yahoo authentication expired".to_string(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(unexpected_status(PROVIDER_ID, status, &body));
        }

        let data: YahooQuoteSummaryResponse =
            serde_json::from_str(&body).map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse quoteSummary response: {}", e),
            })?;

        Ok(data
            .first_result()
            .and_then(|r| r.realtime_price())
            .and_then(positive_price))
    }

    /// Most recent close from the chart API.
    async fn fetch_chart_price(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<Option<Decimal>, MarketDataError> {
        let call = self.connector.get_quote_range(symbol, interval, range);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                return Err(MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                })
            }
            Ok(Err(e)) if is_empty_result(&e) => return Ok(None),
            Ok(Err(e)) => return Err(connector_error(e)),
            Ok(Ok(response)) => response,
        };

        match response.quotes() {
            Ok(quotes) => Ok(latest_close(quotes.iter().map(|q| q.close))),
            Err(e) if is_empty_result(&e) => Ok(None),
            Err(e) => Err(connector_error(e)),
        }
    }
}

fn is_empty_result(e: &yahoo::YahooError) -> bool {
    matches!(e, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult)
}

/// The connector's Display drops the HTTP detail, so keep the Debug form too
/// for failure classification.
fn connector_error(e: yahoo::YahooError) -> MarketDataError {
    MarketDataError::ProviderError {
        provider: PROVIDER_ID.to_string(),
        message: format!("{} [{:?}]", e, e),
    }
}

/// Most recent usable close in chronological `closes`.
fn latest_close(closes: impl DoubleEndedIterator<Item = f64>) -> Option<Decimal> {
    closes.rev().find_map(positive_price)
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        1
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(2000)
    }

    fn retries_transient_failures(&self) -> bool {
        true
    }

    async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
        let symbol = ticker.as_str();

        let (strategy, price) = first_price(symbol, &self.strategies, |strategy| {
            self.run_strategy(symbol, strategy)
        })
        .await
        .map_err(|e| {
            warn!("Yahoo strategies exhausted for {}: {}", symbol, e);
            e
        })?;

        debug!("Yahoo {} returned {} for {}", strategy, price, symbol);
        Ok(Quote::new(ticker.clone(), price, Utc::now(), PROVIDER_ID))
    }
}
