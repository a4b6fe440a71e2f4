//! Bounded exponential backoff for transient provider failures.
//!
//! The delay before retry `n` (the first call is attempt 0) is
//! `min(base_delay * 2^n + jitter, max_delay)` with `jitter` drawn from
//! `[0, max_jitter)`. Only [`RetryClass::WithBackoff`] failures are retried;
//! anything else is handed straight back to the caller.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::config::RetryConfig;
use crate::errors::{MarketDataError, RetryClass};

/// Retry policy applied around a single provider call.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl RetryPolicy {
    /// Build a policy from configuration. At least one attempt is always made.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            max_jitter: config.max_jitter,
        }
    }

    /// Policy that never retries.
    pub fn single_attempt() -> Self {
        Self::new(&RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt` given an already drawn `jitter`.
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        let exponential = 2u32
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(self.max_delay);
        exponential.saturating_add(jitter).min(self.max_delay)
    }

    fn draw_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget runs out.
    ///
    /// Permanent and not-configured failures are returned unchanged after the
    /// first occurrence. When every attempt fails transiently the result is
    /// [`MarketDataError::RetriesExhausted`] carrying the last message.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut operation: F) -> Result<T, MarketDataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let mut last_error: Option<MarketDataError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.delay_for(attempt, self.draw_jitter());
                debug!(
                    "Retrying '{}' in {:?} (attempt {}/{})",
                    provider,
                    delay,
                    attempt + 1,
                    self.max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retry_class() == RetryClass::WithBackoff => {
                    warn!(
                        "'{}' attempt {}/{} failed transiently: {}",
                        provider,
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());

        Err(MarketDataError::RetriesExhausted {
            provider: provider.to_string(),
            attempts: self.max_attempts,
            message,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}
