//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! quote sources implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Quote, Ticker};

use super::rate_limit::RateLimit;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new quote source.
/// The registry uses the provider's priority to order the fallback chain
/// and `retries_transient_failures` to decide whether to wrap calls in
/// the retry policy.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stockwatch_market_data::provider::{MarketDataProvider, RateLimit};
///
/// struct MyProvider {
///     api_key: Option<String>,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::per_minute(30)
///     }
///
///     async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO", "FINNHUB", etc.
    /// Used for logging, diagnostics and the `source` tag on quotes.
    fn id(&self) -> &'static str;

    /// Provider priority for ordering.
    ///
    /// Lower values = higher priority. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    /// Published rate limit.
    fn rate_limit(&self) -> RateLimit;

    /// Whether the provider has the credentials it needs.
    ///
    /// An unconfigured provider must still answer `get_latest_quote`, with
    /// [`MarketDataError::NotConfigured`] and without touching the network.
    fn is_configured(&self) -> bool {
        true
    }

    /// Whether transient failures from this provider should be retried
    /// with backoff before moving down the chain.
    fn retries_transient_failures(&self) -> bool {
        false
    }

    /// Fetch the latest price for a ticker.
    ///
    /// # Returns
    ///
    /// The latest quote on success, or a `MarketDataError` on failure. The
    /// error's retry class tells the caller whether trying again can help.
    async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError>;
}
