//! StockWatch Market Data Crate
//!
//! This crate answers "what is the latest price of this stock?" while
//! staying up when individual free-tier data sources throttle or go quiet.
//!
//! # Overview
//!
//! The market data crate supports:
//! - A primary provider (Yahoo Finance) with several internal query strategies
//! - Secondary providers (Finnhub, Alpha Vantage, Polygon.io) behind API keys
//! - Exponential backoff with jitter for transient failures
//! - Priority-ordered fallback with an aggregated failure report
//! - A short-lived in-memory cache in front of it all
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!                          |   PriceService   |  (façade, never fails)
//!                          +------------------+
//!                             |            |
//!                             v            v
//!                   +-------------+   +------------------+
//!                   | QuoteCache  |   | ProviderRegistry |  (fallback chain)
//!                   +-------------+   +------------------+
//!                                              |
//!                                              v
//!                                     +------------------+
//!                                     |   RetryPolicy    |  (backoff + jitter)
//!                                     +------------------+
//!                                              |
//!                                              v
//!                                     +------------------+
//!                                     |    Provider      |  (Yahoo, Finnhub, etc.)
//!                                     +------------------+
//!                                              |
//!                                              v
//!                                     +------------------+
//!                                     |      Quote       |
//!                                     +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Ticker`] - Normalized ticker symbol
//! - [`Quote`] - Latest price with its source
//! - [`PriceService`] - Entry point for lookups, cache management and probes
//! - [`MarketDataConfig`] - Everything tunable, loadable from the environment
//!
//! # Example
//!
//! ```no_run
//! use stockwatch_market_data::{MarketDataConfig, PriceService};
//!
//! # async fn run() -> Result<(), stockwatch_market_data::errors::MarketDataError> {
//! let service = PriceService::from_config(&MarketDataConfig::from_env())?;
//! let response = service.get_price("AAPL").await;
//! println!("{}", serde_json::to_string(&response).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod service;

// Re-export all public types from models
pub use models::{ProviderId, Quote, Ticker, CACHE_SOURCE};

// Re-export configuration
pub use config::{CacheConfig, MarketDataConfig, ProviderCredentials, RetryConfig};

// Re-export cache types
pub use cache::{CacheEntry, QuoteCache};

// Re-export provider types
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::polygon::PolygonProvider;
pub use provider::yahoo::{YahooProvider, YahooStrategy};
pub use provider::{MarketDataProvider, RateLimit};

// Re-export registry types
pub use registry::{
    AttemptOutcome, FetchDiagnostics, ProbeOutcome, ProviderAttempt, ProviderRegistry,
    QuoteValidator, RetryPolicy, SkipReason,
};

// Re-export service types
pub use service::{
    CacheInfoResponse, CachedStockInfo, ClearCacheResponse, PriceResponse, PriceService,
    ProbeReport, ProbeResult,
};
