//! In-process quote cache.
//!
//! A TTL-keyed map of the last quote fetched per ticker. It is owned by the
//! price service and lives exactly as long as the service does.

mod quote_cache;

pub use quote_cache::{CacheEntry, CacheSnapshotEntry, QuoteCache};
