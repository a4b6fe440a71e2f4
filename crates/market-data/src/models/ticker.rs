use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::errors::MarketDataError;

/// Normalized ticker symbol.
///
/// Whitespace is trimmed and letters are uppercased on construction, so two
/// tickers compare equal whenever the cache should treat them as the same key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Ticker(Arc<str>);

impl Ticker {
    /// Normalize a raw symbol. Empty input is rejected.
    pub fn parse(raw: &str) -> Result<Self, MarketDataError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(MarketDataError::InvalidTicker(raw.to_string()));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(MarketDataError::InvalidTicker(raw.to_string()));
        }
        Ok(Self(Arc::from(normalized)))
    }

    /// Wrap a symbol that is already trimmed and uppercased.
    pub(crate) fn from_static(symbol: &'static str) -> Self {
        Self(Arc::from(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Ticker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
