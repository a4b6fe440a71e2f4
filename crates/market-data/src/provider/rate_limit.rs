//! Published request budgets for providers.

/// Rate limit a provider publishes for its free tier.
///
/// The registry does not throttle against this value; it orders the
/// secondary providers by it and reports it in probe diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,
}

impl RateLimit {
    pub const fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(60)
    }
}
