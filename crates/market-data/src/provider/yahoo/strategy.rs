//! Ordered query strategies for the Yahoo provider.
//!
//! Yahoo answers the same question through several endpoints, each of which
//! goes quiet at different times (pre-market, halted symbols, throttled
//! crumbs). The provider walks them in order and stops at the first price.

use std::fmt;
use std::future::Future;

use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::MarketDataError;

/// One way of asking Yahoo for the latest price.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum YahooStrategy {
    /// quoteSummary `currentPrice` / `regularMarketPrice`.
    RealtimeQuote,
    /// Last close of 1-minute bars over one day.
    Intraday,
    /// Last close of the daily bar for one day.
    Daily,
    /// Last close over five days of daily bars.
    FiveDay,
}

impl YahooStrategy {
    pub const ALL: [YahooStrategy; 4] = [
        YahooStrategy::RealtimeQuote,
        YahooStrategy::Intraday,
        YahooStrategy::Daily,
        YahooStrategy::FiveDay,
    ];

    /// `(interval, range)` for the chart strategies.
    pub fn chart_params(self) -> Option<(&'static str, &'static str)> {
        match self {
            YahooStrategy::RealtimeQuote => None,
            YahooStrategy::Intraday => Some(("1m", "1d")),
            YahooStrategy::Daily => Some(("1d", "1d")),
            YahooStrategy::FiveDay => Some(("1d", "5d")),
        }
    }
}

impl fmt::Display for YahooStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            YahooStrategy::RealtimeQuote => "realtime quote",
            YahooStrategy::Intraday => "1m/1d history",
            YahooStrategy::Daily => "1d/1d history",
            YahooStrategy::FiveDay => "1d/5d history",
        };
        f.write_str(label)
    }
}

/// Run `strategies` in order and return the first price any of them yields.
///
/// `Ok(None)` from a strategy means "answered, but no usable price". When
/// every strategy comes up empty the result is transient if any of them
/// failed transiently (the first such error is returned so the retry policy
/// sees it), and `SymbolNotFound` otherwise.
pub(crate) async fn first_price<F, Fut>(
    symbol: &str,
    strategies: &[YahooStrategy],
    mut run: F,
) -> Result<(YahooStrategy, Decimal), MarketDataError>
where
    F: FnMut(YahooStrategy) -> Fut,
    Fut: Future<Output = Result<Option<Decimal>, MarketDataError>>,
{
    let mut transient: Option<MarketDataError> = None;

    for &strategy in strategies {
        match run(strategy).await {
            Ok(Some(price)) => return Ok((strategy, price)),
            Ok(None) => {
                debug!("Yahoo {} returned no price for {}", strategy, symbol);
            }
            Err(e) => {
                debug!("Yahoo {} failed for {}: {}", strategy, symbol, e);
                if transient.is_none() && e.is_transient() {
                    transient = Some(e);
                }
            }
        }
    }

    match transient {
        Some(e) => Err(e),
        None => Err(MarketDataError::SymbolNotFound(format!(
            "Could not fetch price for {} from Yahoo Finance",
            symbol
        ))),
    }
}
