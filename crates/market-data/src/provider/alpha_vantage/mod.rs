//! Alpha Vantage market data provider implementation.
//!
//! Latest prices come from the GLOBAL_QUOTE endpoint.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute.
//! Over the limit the API still answers HTTP 200, with a `Note` or
//! `Information` field in place of the data.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{Quote, Ticker};
use crate::provider::http::{build_client, send, unexpected_status};
use crate::provider::{MarketDataProvider, RateLimit};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const LIMIT_MESSAGE: &str = "Alpha Vantage API limit reached (5 calls/minute)";

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    // Note: open/high/low/volume/change fields exist but only the price is used
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider. Without an API key every request
    /// fails fast with `NotConfigured`.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| MarketDataError::NotConfigured {
            provider: PROVIDER_ID.to_string(),
        })?;

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(api_key, "***")
        );

        let (status, body) = send(PROVIDER_ID, self.client.get(url)).await?;
        if !status.is_success() {
            return Err(unexpected_status(PROVIDER_ID, status, &body));
        }
        Ok(body)
    }
}

/// Parse a GLOBAL_QUOTE body.
fn parse_global_quote(symbol: &str, body: &str) -> Result<Decimal, MarketDataError> {
    let response: GlobalQuoteResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse GLOBAL_QUOTE response: {}", e),
        })?;

    let raw = response
        .global_quote
        .and_then(|q| q.price)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let raw = match raw {
        Some(raw) => raw,
        None => {
            // Either field in place of data means the free-tier quota ran out
            if let Some(msg) = response.note.as_ref().or(response.information.as_ref()) {
                warn!("Alpha Vantage notice: {}", msg);
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                    message: LIMIT_MESSAGE.to_string(),
                });
            }
            if let Some(msg) = response.error_message {
                return Err(MarketDataError::SymbolNotFound(format!(
                    "Alpha Vantage: {} ({})",
                    msg, symbol
                )));
            }
            return Err(MarketDataError::SymbolNotFound(format!(
                "Alpha Vantage: no valid price data for {}",
                symbol
            )));
        }
    };

    let price = Decimal::from_str(&raw).map_err(|e| MarketDataError::InvalidResponse {
        provider: PROVIDER_ID.to_string(),
        message: format!("Invalid price '{}': {}", raw, e),
    })?;

    if price <= Decimal::ZERO {
        return Err(MarketDataError::SymbolNotFound(format!(
            "Alpha Vantage: no valid price data for {}",
            symbol
        )));
    }
    Ok(price)
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        3
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(5)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
        let symbol = ticker.as_str();
        let body = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        let price = parse_global_quote(symbol, &body)?;
        Ok(Quote::new(ticker.clone(), price, Utc::now(), PROVIDER_ID))
    }
}
