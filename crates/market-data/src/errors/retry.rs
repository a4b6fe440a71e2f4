/// Classification for retry policy.
///
/// Used to determine how the retry policy and the registry respond to
/// errors from providers.
///
/// # Behavior Summary
///
/// | Class | Retried by `RetryPolicy`? | Try Next Provider? |
/// |-------|---------------------------|--------------------|
/// | `WithBackoff` | Yes, until attempts run out | Yes |
/// | `NextProvider` | No | Yes |
/// | `NotConfigured` | No (no budget spent) | Yes (skip this one) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Transient failure: rate limit, quota, timeout or transport error.
    /// Worth retrying with exponential backoff.
    WithBackoff,

    /// Permanent failure for this provider: unknown ticker, malformed
    /// payload, unexpected response shape. Another provider might succeed.
    NextProvider,

    /// The provider is missing credentials. No request was made.
    NotConfigured,
}

/// Lowercase fragments that mark an error message as a rate-limit signal.
const TRANSIENT_SIGNALS: &[&str] = &[
    "rate limit",
    "too many requests",
    "429",
    "quota",
    "exceeded",
];

/// Classify a free-text failure message.
///
/// This is a heuristic for transports that only surface error text (the
/// Yahoo connector, provider error bodies). Adapters that see the HTTP
/// status build a typed error instead and never reach this function.
pub fn classify_failure(message: &str) -> RetryClass {
    let message = message.to_lowercase();
    if TRANSIENT_SIGNALS
        .iter()
        .any(|signal| message.contains(signal))
    {
        RetryClass::WithBackoff
    } else {
        RetryClass::NextProvider
    }
}
