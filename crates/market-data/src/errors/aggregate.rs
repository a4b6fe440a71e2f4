use serde::Serialize;
use thiserror::Error;

use super::MarketDataError;
use crate::models::{ProviderId, Ticker};

/// Suggestion attached to every aggregate failure.
pub const RETRY_SUGGESTION: &str = "Please try again in a few minutes as this might be \
temporary rate limiting across multiple providers.";

/// One provider's contribution to an aggregate failure.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub message: String,
    pub transient: bool,
}

impl ProviderFailure {
    pub fn from_error(provider: ProviderId, error: &MarketDataError) -> Self {
        Self {
            provider,
            message: error.to_string(),
            transient: error.is_transient(),
        }
    }
}

/// Every provider in the fallback chain failed.
///
/// Failures are kept in the order the providers were tried.
#[derive(Clone, Debug, Error, Serialize)]
#[error("All data sources failed for {ticker}.{}", render_failures(.failures))]
#[serde(rename_all = "camelCase")]
pub struct AggregateError {
    ticker: Ticker,
    failures: Vec<ProviderFailure>,
    suggestion: String,
}

impl AggregateError {
    pub fn new(ticker: Ticker, failures: Vec<ProviderFailure>) -> Self {
        Self {
            ticker,
            failures,
            suggestion: RETRY_SUGGESTION.to_string(),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    pub fn suggestion(&self) -> &str {
        &self.suggestion
    }

    /// True when at least one provider failed for a reason that may clear up
    /// on its own (rate limits, timeouts).
    pub fn any_transient(&self) -> bool {
        self.failures.iter().any(|f| f.transient)
    }
}

fn render_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return " No providers are registered.".to_string();
    }
    let parts: Vec<String> = failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.message))
        .collect();
    format!(" {}", parts.join("; "))
}
