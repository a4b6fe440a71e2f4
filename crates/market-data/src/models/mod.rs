//! Market data models
//!
//! This module contains the core data types for quote retrieval:
//! - `types` - Type aliases and constants for common identifiers (ProviderId)
//! - `ticker` - Normalized ticker symbol (Ticker)
//! - `quote` - Latest-price quote (Quote)

mod quote;
mod ticker;
mod types;

pub use quote::Quote;
pub use ticker::Ticker;
pub use types::{ProviderId, CACHE_SOURCE};
