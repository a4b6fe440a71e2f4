//! Quote data validation.
//!
//! Checks a provider's quote before the registry accepts it:
//! - Positive price
//! - Price below a sanity ceiling
//! - Quote is for the ticker that was asked for

use log::warn;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{Quote, Ticker};

/// Quote validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Maximum allowed price value (for sanity check).
    pub max_price: Option<Decimal>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_price: Some(Decimal::from(1_000_000_000i64)), // 1 billion as sanity check
        }
    }
}

/// Quote data validator.
#[derive(Default)]
pub struct QuoteValidator {
    config: ValidatorConfig,
}

impl QuoteValidator {
    /// Create a new validator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a quote returned for `requested`.
    ///
    /// A failure here is permanent for the provider that produced the quote.
    pub fn validate(&self, quote: &Quote, requested: &Ticker) -> Result<(), MarketDataError> {
        if quote.ticker() != requested {
            warn!(
                "{} answered for {} when {} was requested",
                quote.source(),
                quote.ticker(),
                requested
            );
            return Err(MarketDataError::ValidationFailed {
                message: format!(
                    "quote is for {} but {} was requested",
                    quote.ticker(),
                    requested
                ),
            });
        }

        if quote.price() <= Decimal::ZERO {
            return Err(MarketDataError::ValidationFailed {
                message: format!("non-positive price {}", quote.price()),
            });
        }

        if let Some(max) = self.config.max_price {
            if quote.price() > max {
                return Err(MarketDataError::ValidationFailed {
                    message: format!("price {} exceeds sanity limit {}", quote.price(), max),
                });
            }
        }

        Ok(())
    }
}
