use std::borrow::Cow;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Source tag reported for quotes served from the in-process cache.
pub const CACHE_SOURCE: &str = "cache";
