//! Provider registry for orchestrating market data providers.
//!
//! The registry manages multiple providers, handling:
//! - Priority ordering of the fallback chain
//! - Retry with backoff for providers that opt into it
//! - Fallback to the next provider on failure
//! - Quote validation
//! - An optional deadline over the whole chain

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use super::{FetchDiagnostics, QuoteValidator, RetryPolicy, SkipReason};
use crate::errors::{AggregateError, MarketDataError, ProviderFailure, RetryClass};
use crate::models::{ProviderId, Quote, Ticker};
use crate::provider::{MarketDataProvider, RateLimit};

/// Outcome of calling one provider during a probe.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub provider_id: ProviderId,
    pub configured: bool,
    pub rate_limit: RateLimit,
    pub result: Result<Quote, MarketDataError>,
}

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    retry_policy: RetryPolicy,
    retry_secondary: bool,
    chain_deadline: Option<Duration>,
    validator: QuoteValidator,
}

impl ProviderRegistry {
    /// Create a new provider registry.
    ///
    /// Providers are ordered by priority (lower is tried first); providers
    /// with equal priority keep their registration order.
    pub fn new(mut providers: Vec<Arc<dyn MarketDataProvider>>, retry_policy: RetryPolicy) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self {
            providers,
            retry_policy,
            retry_secondary: false,
            chain_deadline: None,
            validator: QuoteValidator::new(),
        }
    }

    /// Also wrap providers that do not opt into retries in the retry policy.
    pub fn with_retry_secondary(mut self, retry_secondary: bool) -> Self {
        self.retry_secondary = retry_secondary;
        self
    }

    /// Bound the whole fallback chain.
    pub fn with_chain_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.chain_deadline = deadline;
        self
    }

    pub fn with_validator(mut self, validator: QuoteValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Get the list of registered providers, in fallback order.
    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    /// Whether any provider behind the primary one can be used.
    pub fn alternatives_available(&self) -> bool {
        self.providers.iter().skip(1).any(|p| p.is_configured())
    }

    fn should_retry(&self, provider: &dyn MarketDataProvider) -> bool {
        provider.retries_transient_failures() || self.retry_secondary
    }

    async fn call_provider(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &Ticker,
    ) -> Result<Quote, MarketDataError> {
        if self.should_retry(provider) {
            self.retry_policy
                .run(provider.id(), || provider.get_latest_quote(ticker))
                .await
        } else {
            provider.get_latest_quote(ticker).await
        }
    }

    /// Fetch the latest quote for a ticker.
    ///
    /// Tries providers in order:
    /// 1. Skip providers without credentials
    /// 2. Stop if the chain deadline has passed
    /// 3. Fetch, with retries if the provider opts in
    /// 4. Validate the quote
    /// 5. On failure, record it and move to the next provider
    ///
    /// The first valid quote wins and later providers are never called. When
    /// every provider fails, the aggregate error lists each failure in order.
    pub async fn fetch_latest_quote(
        &self,
        ticker: &Ticker,
    ) -> (Result<Quote, AggregateError>, FetchDiagnostics) {
        let mut diagnostics = FetchDiagnostics::new();
        let mut failures: Vec<ProviderFailure> = Vec::new();
        let deadline = self.chain_deadline.map(|d| Instant::now() + d);

        for provider in &self.providers {
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            if !provider.is_configured() {
                debug!("Provider '{}' has no API key, skipping", provider_id);
                let error = MarketDataError::NotConfigured {
                    provider: provider_id.to_string(),
                };
                failures.push(ProviderFailure::from_error(provider_id.clone(), &error));
                diagnostics.record_skip(provider_id, SkipReason::NotConfigured);
                continue;
            }

            let outcome = match deadline {
                None => self.call_provider(provider.as_ref(), ticker).await,
                Some(deadline) if Instant::now() >= deadline => {
                    debug!("Chain deadline passed before '{}'", provider_id);
                    let error = MarketDataError::DeadlineExceeded {
                        provider: provider_id.to_string(),
                    };
                    failures.push(ProviderFailure::from_error(provider_id.clone(), &error));
                    diagnostics.record_skip(provider_id, SkipReason::DeadlineExceeded);
                    continue;
                }
                Some(deadline) => {
                    let call = self.call_provider(provider.as_ref(), ticker);
                    match tokio::time::timeout_at(deadline, call).await {
                        Ok(result) => result,
                        Err(_) => Err(MarketDataError::DeadlineExceeded {
                            provider: provider_id.to_string(),
                        }),
                    }
                }
            };

            let validated = outcome.and_then(|quote| {
                self.validator.validate(&quote, ticker)?;
                Ok(quote)
            });

            match validated {
                Ok(quote) => {
                    info!(
                        "Fetched {} = {} from '{}'",
                        ticker,
                        quote.price(),
                        provider_id
                    );
                    diagnostics.record_success(provider_id);
                    return (Ok(quote), diagnostics);
                }
                Err(e) => {
                    match e.retry_class() {
                        RetryClass::WithBackoff => warn!(
                            "Provider '{}' failed transiently for {}: {}, trying next provider",
                            provider_id, ticker, e
                        ),
                        RetryClass::NextProvider | RetryClass::NotConfigured => info!(
                            "Provider '{}' failed for {}: {}, trying next provider",
                            provider_id, ticker, e
                        ),
                    }
                    failures.push(ProviderFailure::from_error(provider_id.clone(), &e));
                    diagnostics.record_error(provider_id, e.to_string());
                }
            }
        }

        let error = AggregateError::new(ticker.clone(), failures);
        warn!("{} [{}]", error, diagnostics.summary());
        (Err(error), diagnostics)
    }

    /// Call every provider once, in order, without retries or short-circuit.
    pub async fn probe_all(&self, ticker: &Ticker) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let result = provider.get_latest_quote(ticker).await;
            match &result {
                Ok(quote) => debug!("Probe '{}': {}", provider.id(), quote.price()),
                Err(e) => debug!("Probe '{}': {}", provider.id(), e),
            }
            outcomes.push(ProbeOutcome {
                provider_id: Cow::Borrowed(provider.id()),
                configured: provider.is_configured(),
                rate_limit: provider.rate_limit(),
                result,
            });
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::RetryConfig;
    use crate::registry::ValidatorConfig;

    enum Behavior {
        Succeed(Decimal),
        FailTransient,
        FailPermanent,
        Unconfigured,
        Hang,
        WrongTicker,
    }

    struct MockProvider {
        id: &'static str,
        priority: u8,
        retries: bool,
        behavior: Behavior,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8, behavior: Behavior) -> Self {
            Self {
                id,
                priority,
                retries: false,
                behavior,
                call_count: AtomicUsize::new(0),
            }
        }

        fn retrying(mut self) -> Self {
            self.retries = true;
            self
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn rate_limit(&self) -> RateLimit {
            RateLimit::per_minute(100)
        }

        fn is_configured(&self) -> bool {
            !matches!(self.behavior, Behavior::Unconfigured)
        }

        fn retries_transient_failures(&self) -> bool {
            self.retries
        }

        async fn get_latest_quote(&self, ticker: &Ticker) -> Result<Quote, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            match &self.behavior {
                Behavior::Succeed(price) => Ok(Quote::new(ticker.clone(), *price, Utc::now(), self.id)),
                Behavior::FailTransient => Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "429 Too Many Requests".to_string(),
                }),
                Behavior::FailPermanent => Err(MarketDataError::SymbolNotFound(format!(
                    "{}: no data for {}",
                    self.id, ticker
                ))),
                Behavior::Unconfigured => Err(MarketDataError::NotConfigured {
                    provider: self.id.to_string(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(MarketDataError::Timeout {
                        provider: self.id.to_string(),
                    })
                }
                Behavior::WrongTicker => Ok(Quote::new(
                    Ticker::parse("OTHER").unwrap(),
                    dec!(1),
                    Utc::now(),
                    self.id,
                )),
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::ZERO,
            retry_secondary_providers: false,
        })
    }

    fn registry(providers: &[Arc<MockProvider>]) -> ProviderRegistry {
        let providers = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn MarketDataProvider>)
            .collect();
        ProviderRegistry::new(providers, policy())
    }

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).unwrap()
    }

    #[test]
    fn test_provider_ordering_by_priority() {
        let reg = registry(&[
            Arc::new(MockProvider::new("LOW_PRIORITY", 20, Behavior::FailPermanent)),
            Arc::new(MockProvider::new("HIGH_PRIORITY", 5, Behavior::FailPermanent)),
            Arc::new(MockProvider::new("MED_PRIORITY", 10, Behavior::FailPermanent)),
        ]);

        let ids: Vec<_> = reg.providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["HIGH_PRIORITY", "MED_PRIORITY", "LOW_PRIORITY"]);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::Succeed(dec!(189.5))));
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(1))));
        let reg = registry(&[p1.clone(), p2.clone()]);

        let (result, diagnostics) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        let quote = result.unwrap();

        assert_eq!(quote.price(), dec!(189.5));
        assert_eq!(quote.source(), "P1");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
        assert_eq!(diagnostics.summary(), "P1: SUCCESS");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_primary_falls_back() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::FailTransient).retrying());
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(420.50))));
        let p3 = Arc::new(MockProvider::new("P3", 3, Behavior::Succeed(dec!(1))));
        let reg = registry(&[p1.clone(), p2.clone(), p3.clone()]);

        let (result, diagnostics) = reg.fetch_latest_quote(&ticker("MSFT")).await;
        let quote = result.unwrap();

        assert_eq!(quote.source(), "P2");
        assert_eq!(quote.price(), dec!(420.50));
        assert_eq!(p1.calls(), 3);
        assert_eq!(p2.calls(), 1);
        assert_eq!(p3.calls(), 0);
        assert_eq!(diagnostics.providers_tried(), vec!["P1", "P2"]);
    }

    #[tokio::test]
    async fn test_secondary_transient_failure_gets_single_attempt() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::FailTransient));
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(10))));
        let reg = registry(&[p1.clone(), p2.clone()]);

        let (result, _) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        assert!(result.is_ok());
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_secondary_opt_in() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::FailTransient));
        let reg = registry(&[p1.clone()]).with_retry_secondary(true);

        let (result, _) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        let error = result.unwrap_err();
        assert_eq!(p1.calls(), 3);
        assert!(error.failures()[0].message.contains("retries exhausted"));
        assert!(error.any_transient());
    }

    #[tokio::test]
    async fn test_all_permanent_failures_aggregate() {
        let providers: Vec<_> = ["P1", "P2", "P3", "P4"]
            .iter()
            .enumerate()
            .map(|(i, id)| Arc::new(MockProvider::new(*id, i as u8 + 1, Behavior::FailPermanent)))
            .collect();
        let reg = registry(&providers);

        let (result, diagnostics) = reg.fetch_latest_quote(&ticker("ZZZZ")).await;
        let error = result.unwrap_err();

        assert_eq!(error.failures().len(), 4);
        assert!(!error.any_transient());
        assert!(providers.iter().all(|p| p.calls() == 1));
        assert!(!diagnostics.has_success());

        let message = error.to_string();
        assert!(message.starts_with("All data sources failed for ZZZZ."));
        for id in ["P1", "P2", "P3", "P4"] {
            assert!(message.contains(id));
        }
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_skipped_without_call() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::FailPermanent));
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Unconfigured));
        let reg = registry(&[p1.clone(), p2.clone()]);

        let (result, diagnostics) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        let error = result.unwrap_err();

        assert_eq!(p2.calls(), 0);
        assert_eq!(diagnostics.skip_count(), 1);
        assert_eq!(error.failures()[1].message, "P2 API key not configured");
        assert!(!reg.alternatives_available());
    }

    #[tokio::test]
    async fn test_invalid_quote_moves_to_next_provider() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::WrongTicker));
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(55))));
        let reg = registry(&[p1.clone(), p2.clone()]);

        let (result, diagnostics) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        assert_eq!(result.unwrap().source(), "P2");
        assert_eq!(diagnostics.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_validator_ceiling() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::Succeed(dec!(5000))));
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(50))));
        let reg = registry(&[p1.clone(), p2.clone()]).with_validator(QuoteValidator::with_config(
            ValidatorConfig {
                max_price: Some(dec!(1000)),
            },
        ));

        let (result, _) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        assert_eq!(result.unwrap().source(), "P2");
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_providers() {
        let reg = registry(&[]);
        let (result, _) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        let error = result.unwrap_err();
        assert!(error.failures().is_empty());
        assert!(error.to_string().contains("No providers are registered"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_deadline_bounds_slow_provider() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::Hang));
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(1))));
        let reg = registry(&[p1.clone(), p2.clone()])
            .with_chain_deadline(Some(Duration::from_secs(5)));

        let start = Instant::now();
        let (result, diagnostics) = reg.fetch_latest_quote(&ticker("AAPL")).await;
        let error = result.unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(6));
        assert_eq!(p2.calls(), 0);
        assert_eq!(error.failures().len(), 2);
        assert_eq!(diagnostics.skip_count(), 1);
    }

    #[tokio::test]
    async fn test_probe_calls_every_provider_once() {
        let p1 = Arc::new(MockProvider::new("P1", 1, Behavior::FailTransient).retrying());
        let p2 = Arc::new(MockProvider::new("P2", 2, Behavior::Succeed(dec!(10))));
        let p3 = Arc::new(MockProvider::new("P3", 3, Behavior::Unconfigured));
        let reg = registry(&[p3.clone(), p2.clone(), p1.clone()]);

        let outcomes = reg.probe_all(&ticker("AAPL")).await;

        let ids: Vec<_> = outcomes.iter().map(|o| o.provider_id.as_ref()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
        assert!(!outcomes[2].configured);
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
        assert_eq!(p3.calls(), 1);
    }
}
