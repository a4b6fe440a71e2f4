//! Finnhub market data provider implementation.
//!
//! Latest prices come from the `/quote` endpoint. Finnhub free tier is
//! limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{Quote, Ticker};
use crate::provider::http::{build_client, send, unexpected_status};
use crate::provider::{positive_price, MarketDataProvider, RateLimit};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    // Note: d, dp, h, l, o, pc, t exist but only the current price is used
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider. Without an API key every request
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

    /// Make a GET request to the Finnhub API.
    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| MarketDataError::NotConfigured {
            provider: PROVIDER_ID.to_string(),
        })?;

        let url = format!("{}{}", self.base_url, endpoint);

        // API key as header (keeps it out of URLs and logs)
        let request = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", api_key)
            .query(params);

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let (status, body) = send(PROVIDER_ID, request).await?;

        // Handle unauthorized (invalid API key)
        if status == StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }

        // Handle forbidden (API key quota exceeded)
        if status == StatusCode::FORBIDDEN {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
                message: "API key quota exceeded".to_string(),
            });
        }

        if !status.is_success() {
            // Try to parse error message
            if let Ok(ErrorResponse { error: Some(message) }) = serde_json::from_str(&body) {
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message,
                });
            }
            return Err(unexpected_status(PROVIDER_ID, status, &body));
        }

        Ok(body)
    }
}

/// Parse a `/quote` body. Finnhub answers unknown symbols with `c: 0`
/// instead of an error.
fn parse_quote(symbol: &str, body: &str) -> Result<Decimal, MarketDataError> {
    let response: QuoteResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse quote response: {}", e),
        })?;

    response.c.and_then(positive_price).ok_or_else(|| {
        MarketDataError::SymbolNotFound(format!(
            "Finnhub: no valid price data for {}",
            symbol
        ))
    })
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        // Highest free-tier rate limit of the secondaries
        2
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(60)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
        let symbol = ticker.as_str();
        let body = self.fetch("/quote", &[("symbol", symbol)]).await?;
        let price = parse_quote(symbol, &body)?;
        Ok(Quote::new(ticker.clone(), price, Utc::now(), PROVIDER_ID))
    }
}
