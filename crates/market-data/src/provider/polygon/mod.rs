//! Polygon.io market data provider implementation.
//!
//! Uses the previous-day aggregate endpoint (`/v2/aggs/ticker/{T}/prev`),
//! the most recent close available on the free tier (5 calls per minute).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{Quote, Ticker};
use crate::provider::http::{build_client, send, unexpected_status};
use crate::provider::{positive_price, MarketDataProvider, RateLimit};

const BASE_URL: &str = "https://api.polygon.io";
const PROVIDER_ID: &str = "POLYGON";

/// Response from /v2/aggs/ticker/{ticker}/prev
#[derive(Debug, Deserialize)]
struct PrevCloseResponse {
    status: Option<String>,
    #[serde(default)]
    results: Vec<AggregateBar>,
    /// Present on errors ("Unknown API Key", quota notices)
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Close price
    c: Option<f64>,
}

/// Polygon.io market data provider.
pub struct PolygonProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl PolygonProvider {
    /// Create a new Polygon provider. Without an API key every request
    /// fails fast with `NotConfigured`.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_prev_close(&self, symbol: &str) -> Result<String, MarketDataError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| MarketDataError::NotConfigured {
            provider: PROVIDER_ID.to_string(),
        })?;

        let url = format!("{}/v2/aggs/ticker/{}/prev", self.base_url, encode(symbol));
        debug!("Polygon request: {}", url);

        let request = self.client.get(&url).query(&[("apiKey", api_key)]);
        let (status, body) = send(PROVIDER_ID, request).await?;
        if !status.is_success() {
            return Err(unexpected_status(PROVIDER_ID, status, &body));
        }
        Ok(body)
    }
}

/// Parse a previous-close body. Success needs `status == "OK"` and at least
/// one bar with a positive close.
fn parse_prev_close(symbol: &str, body: &str) -> Result<Decimal, MarketDataError> {
    let response: PrevCloseResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse previous close response: {}", e),
        })?;

    if response.status.as_deref() != Some("OK") {
        let detail = response
            .error
            .or(response.message)
            .or(response.status)
            .unwrap_or_else(|| "unknown status".to_string());
        return Err(MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("No data for {}: {}", symbol, detail),
        });
    }

    response
        .results
        .first()
        .and_then(|bar| bar.c)
        .and_then(positive_price)
        .ok_or_else(|| {
            MarketDataError::SymbolNotFound(format!(
                "Polygon: no valid price data for {}",
                symbol
            ))
        })
}

#[async_trait]
impl MarketDataProvider for PolygonProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        4
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(5)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
        let symbol = ticker.as_str();
        let body = self.fetch_prev_close(symbol).await?;
        let price = parse_prev_close(symbol, &body)?;
        Ok(Quote::new(ticker.clone(), price, Utc::now(), PROVIDER_ID))
    }
}
