//! Serializable responses returned by [`PriceService`](super::PriceService).
//!
//! Every response serializes to camelCase JSON. Prices are JSON numbers and
//! timestamps are RFC 3339 strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Status value carried by the responses that always succeed.
pub const STATUS_SUCCESS: &str = "success";

/// Message returned by `clear_cache`.
pub const CACHE_CLEARED_MESSAGE: &str = "Cache cleared successfully";

/// Answer to a single price request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PriceResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        ticker: String,
        price: Decimal,
        timestamp: DateTime<Utc>,
        source: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        ticker: String,
        error_message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
}

impl PriceResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, PriceResponse::Success { .. })
    }

    pub fn ticker(&self) -> &str {
        match self {
            PriceResponse::Success { ticker, .. } | PriceResponse::Error { ticker, .. } => ticker,
        }
    }

    pub fn price(&self) -> Option<Decimal> {
        match self {
            PriceResponse::Success { price, .. } => Some(*price),
            PriceResponse::Error { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            PriceResponse::Success { source, .. } => Some(source),
            PriceResponse::Error { .. } => None,
        }
    }
}

/// Answer to `clear_cache`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCacheResponse {
    pub status: &'static str,
    pub message: String,
    pub cleared_entries: usize,
}

/// One cached ticker in [`CacheInfoResponse`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedStockInfo {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub age_minutes: f64,
    pub expires_in_minutes: f64,
}

/// Answer to `cache_info`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfoResponse {
    pub status: &'static str,
    pub cache_size: usize,
    /// Cache TTL in whole minutes.
    pub cache_duration_minutes: u64,
    pub alternative_sources_available: bool,
    pub cached_stocks: BTreeMap<String, CachedStockInfo>,
}

/// Per-provider probe result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeResult {
    #[serde(rename_all = "camelCase")]
    Success {
        price: Decimal,
        timestamp: DateTime<Utc>,
        rate_limit_per_minute: u32,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        error_message: String,
        transient: bool,
        rate_limit_per_minute: u32,
    },
    #[serde(rename_all = "camelCase")]
    NotConfigured { error_message: String },
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success { .. })
    }
}

/// One row of a probe, keyed by provider id when serialized.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderProbe {
    pub provider: String,
    pub result: ProbeResult,
}

/// Answer to `probe_all_providers`.
///
/// `results` serializes as an object keyed by provider id, in fallback order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProbeReport {
    pub ticker: String,
    #[serde(serialize_with = "serialize_probe_results")]
    pub results: Vec<ProviderProbe>,
}

impl ProbeReport {
    /// Result for one provider, if it was probed.
    pub fn result_for(&self, provider: &str) -> Option<&ProbeResult> {
        self.results
            .iter()
            .find(|p| p.provider == provider)
            .map(|p| &p.result)
    }
}

fn serialize_probe_results<S>(results: &[ProviderProbe], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(results.len()))?;
    for probe in results {
        map.serialize_entry(&probe.provider, &probe.result)?;
    }
    map.end()
}
