//! Per-fetch record of what happened at each step of the fallback chain.

use std::fmt;

use crate::models::ProviderId;

/// Why a provider was passed over without being called.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// Provider has no API key; no request was made.
    NotConfigured,

    /// The chain deadline ran out before the provider was reached.
    DeadlineExceeded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotConfigured => f.write_str("not configured"),
            SkipReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// How one step of the chain ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    Skipped(SkipReason),
    Failed(String),
}

/// One provider's step in a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Succeeded => write!(f, "{}: SUCCESS", self.provider_id),
            AttemptOutcome::Skipped(reason) => {
                write!(f, "{}: SKIPPED ({})", self.provider_id, reason)
            }
            AttemptOutcome::Failed(message) => {
                write!(f, "{}: ERROR ({})", self.provider_id, message)
            }
        }
    }
}

/// Ordered steps of one `fetch_latest_quote` call.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, provider_id: ProviderId, outcome: AttemptOutcome) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            outcome,
        });
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.push(provider_id, AttemptOutcome::Skipped(reason));
    }

    pub fn record_error(&mut self, provider_id: ProviderId, message: String) {
        self.push(provider_id, AttemptOutcome::Failed(message));
    }

    pub fn record_success(&mut self, provider_id: ProviderId) {
        self.push(provider_id, AttemptOutcome::Succeeded);
    }

    pub fn attempts(&self) -> &[ProviderAttempt] {
        &self.attempts
    }

    /// One line, steps joined by ` -> `.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(ProviderAttempt::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn has_success(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.outcome == AttemptOutcome::Succeeded)
    }

    /// Providers that were actually called, in order.
    pub fn providers_tried(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped(_)))
            .map(|a| a.provider_id.as_ref())
            .collect()
    }

    pub fn skip_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, AttemptOutcome::Skipped(_)))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, AttemptOutcome::Failed(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn test_summary_joins_steps_in_order() {
        let mut diag = FetchDiagnostics::new();
        diag.record_error(Cow::Borrowed("YAHOO"), "Timeout: YAHOO".to_string());
        diag.record_skip(Cow::Borrowed("FINNHUB"), SkipReason::NotConfigured);
        diag.record_success(Cow::Borrowed("POLYGON"));

        assert_eq!(
            diag.summary(),
            "YAHOO: ERROR (Timeout: YAHOO) -> FINNHUB: SKIPPED (not configured) -> POLYGON: SUCCESS"
        );
        assert!(diag.has_success());
    }

    #[test]
    fn test_counts_and_tried_providers() {
        let mut diag = FetchDiagnostics::new();
        diag.record_error(Cow::Borrowed("YAHOO"), "429".to_string());
        diag.record_skip(Cow::Borrowed("FINNHUB"), SkipReason::DeadlineExceeded);
        assert!(!diag.has_success());

        diag.record_success(Cow::Borrowed("ALPHA_VANTAGE"));
        assert_eq!(diag.providers_tried(), vec!["YAHOO", "ALPHA_VANTAGE"]);
        assert_eq!(diag.skip_count(), 1);
        assert_eq!(diag.failure_count(), 1);
        assert_eq!(
            diag.attempts()[1].outcome,
            AttemptOutcome::Skipped(SkipReason::DeadlineExceeded)
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(FetchDiagnostics::new().summary(), "");
    }
}
