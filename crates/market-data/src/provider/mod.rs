//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Published rate limits used to order the fallback chain
//! - Concrete provider implementations (Yahoo, Finnhub, Alpha Vantage, Polygon)
//!
//! # Architecture
//!
//! Yahoo Finance is the primary source and carries its own internal chain of
//! query strategies. The three secondary sources are single-request adapters
//! that need an API key; without one they report `NotConfigured` and are
//! skipped.

mod http;
mod rate_limit;
mod traits;

pub mod alpha_vantage;
pub mod finnhub;
pub mod polygon;
pub mod yahoo;

use rust_decimal::Decimal;

pub use rate_limit::RateLimit;
pub use traits::MarketDataProvider;

/// Convert a provider float into a price, rejecting NaN, infinities, zero
/// and negative values.
pub(crate) fn positive_price(value: f64) -> Option<Decimal> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Decimal::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_positive_price() {
        assert_eq!(positive_price(420.5), Some(dec!(420.5)));
        assert_eq!(positive_price(0.0), None);
        assert_eq!(positive_price(-1.0), None);
        assert_eq!(positive_price(f64::NAN), None);
        assert_eq!(positive_price(f64::INFINITY), None);
    }
}
