//! Shared HTTP plumbing for the key-based providers.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};

use crate::errors::MarketDataError;

/// Build a client with the per-request timeout applied.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and read the body.
///
/// Transport timeouts become [`MarketDataError::Timeout`], HTTP 429 becomes
/// [`MarketDataError::RateLimited`], other transport failures stay
/// [`MarketDataError::Network`]. Any other status is returned to the caller
/// together with the body so the provider can interpret it.
pub(crate) async fn send(
    provider: &str,
    request: RequestBuilder,
) -> Result<(StatusCode, String), MarketDataError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited {
            provider: provider.to_string(),
            message: "HTTP 429 Too Many Requests".to_string(),
        });
    }

    let body = response.text().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::ProviderError {
                provider: provider.to_string(),
                message: format!("Failed to read response: {}", e.without_url()),
            }
        }
    })?;

    Ok((status, body))
}

/// Map a reqwest failure, keeping timeouts distinguishable.
///
/// The request URL is dropped: Alpha Vantage and Polygon carry the API key
/// in the query string.
pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> MarketDataError {
    if e.is_timeout() {
        MarketDataError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        MarketDataError::Network(e.without_url())
    }
}

/// Error for a non-success status that the provider has no special meaning for.
pub(crate) fn unexpected_status(provider: &str, status: StatusCode, body: &str) -> MarketDataError {
    let snippet: String = body.chars().take(200).collect();
    MarketDataError::ProviderError {
        provider: provider.to_string(),
        message: format!("HTTP {} - {}", status, snippet),
    }
}
