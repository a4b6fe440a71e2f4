use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ticker::Ticker;
use super::types::ProviderId;

/// Latest price for a ticker as reported by one provider.
///
/// Quotes are immutable once built; the cache and the service only ever
/// replace them wholesale.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    ticker: Ticker,
    price: Decimal,
    captured_at: DateTime<Utc>,
    source: ProviderId,
}

impl Quote {
    /// Create a new quote.
    pub fn new(
        ticker: Ticker,
        price: Decimal,
        captured_at: DateTime<Utc>,
        source: impl Into<ProviderId>,
    ) -> Self {
        Self {
            ticker,
            price,
            captured_at,
            source: source.into(),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// When the price was received from the provider.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Identifier of the provider that produced the quote.
    pub fn source(&self) -> &str {
        &self.source
    }
}
