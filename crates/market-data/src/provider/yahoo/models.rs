//! Yahoo Finance API response models.
//!
//! These models are used for parsing the quoteSummary API responses,
//! which carry the real-time price fields.

use serde::Deserialize;

/// Main response wrapper for quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

/// Quote summary container
#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    #[serde(default)]
    pub result: Option<Vec<YahooQuoteSummaryResult>>,
    // Note: error field exists in API but we handle errors via HTTP status/empty results
}

/// Individual result from quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResult {
    pub price: Option<YahooPriceData>,
    pub financial_data: Option<YahooFinancialData>,
}

/// Price module from quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooPriceData {
    pub regular_market_price: Option<YahooPriceDetail>,
}

/// financialData module; `currentPrice` is the freshest field Yahoo exposes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooFinancialData {
    pub current_price: Option<YahooPriceDetail>,
}

/// Price detail with raw and formatted values
#[derive(Debug, Deserialize, Clone)]
pub struct YahooPriceDetail {
    pub raw: Option<f64>,
    // Note: fmt field exists but we only use raw values
}

impl YahooQuoteSummaryResponse {
    /// First result, if Yahoo returned any.
    pub fn first_result(&self) -> Option<&YahooQuoteSummaryResult> {
        self.quote_summary.result.as_ref().and_then(|r| r.first())
    }
}

impl YahooQuoteSummaryResult {
    /// `currentPrice`, then `regularMarketPrice`.
    pub fn realtime_price(&self) -> Option<f64> {
        let current = self
            .financial_data
            .as_ref()
            .and_then(|f| f.current_price.as_ref())
            .and_then(|p| p.raw)
            .filter(|p| p.is_finite() && *p > 0.0);

        current.or_else(|| {
            self.price
                .as_ref()
                .and_then(|p| p.regular_market_price.as_ref())
                .and_then(|p| p.raw)
        })
    }
}
