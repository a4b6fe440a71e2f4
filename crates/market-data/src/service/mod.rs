//! Price service façade and its response types.

mod price_service;
mod responses;

pub use price_service::{PriceService, DEFAULT_PROBE_TICKER};
pub use responses::{
    CacheInfoResponse, CachedStockInfo, ClearCacheResponse, PriceResponse, ProbeReport,
    ProbeResult, ProviderProbe, CACHE_CLEARED_MESSAGE, STATUS_SUCCESS,
};
