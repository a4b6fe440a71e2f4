//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The error enum for a single provider call
//! - [`RetryClass`]: Classification for determining retry behavior
//! - [`AggregateError`]: Combined report when the whole fallback chain fails

mod aggregate;
mod retry;

pub use aggregate::{AggregateError, ProviderFailure, RETRY_SUGGESTION};
pub use retry::{classify_failure, RetryClass};

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the retry policy and the registry handle the error.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The caller supplied something that cannot be a ticker.
    #[error("Invalid ticker: '{0}'")]
    InvalidTicker(String),

    /// The provider has no usable API key. No request was made.
    #[error("{provider} API key not configured")]
    NotConfigured {
        /// The provider missing credentials
        provider: String,
    },

    /// The requested symbol was not found by the provider.
    #[error("{0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429 or a quota notice).
    /// Should retry with exponential backoff.
    #[error("Rate limited: {provider} - {message}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
        /// What the provider said, if anything
        message: String,
    },

    /// The request to the provider timed out.
    /// Should retry with exponential backoff.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    /// The message decides whether it is worth retrying.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered with a payload we could not use.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// Data validation failed.
    /// The provider returned data that failed validation checks.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// Every attempt allowed by the retry policy hit a transient failure.
    #[error("{provider}: retries exhausted after {attempts} attempts ({message})")]
    RetriesExhausted {
        /// The provider that kept failing
        provider: String,
        /// How many attempts were made
        attempts: u32,
        /// The last failure seen
        message: String,
    },

    /// The overall deadline for the fallback chain ran out.
    #[error("Deadline exceeded before {provider} responded")]
    DeadlineExceeded {
        /// The provider that was being called (or about to be)
        provider: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::WithBackoff`]: Retry with exponential backoff
    /// - [`RetryClass::NextProvider`]: Give up on this provider, try the next one
    /// - [`RetryClass::NotConfigured`]: Provider skipped, no request was made
    ///
    /// # Examples
    ///
    /// ```
    /// use stockwatch_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::NextProvider);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::NotConfigured { .. } => RetryClass::NotConfigured,

            // Transient errors - retry with backoff
            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::Network(_)
            | Self::RetriesExhausted { .. } => RetryClass::WithBackoff,

            // Only the text tells us what kind of failure this was
            Self::ProviderError { message, .. } => classify_failure(message),

            Self::InvalidTicker(_)
            | Self::SymbolNotFound(_)
            | Self::InvalidResponse { .. }
            | Self::ValidationFailed { .. }
            | Self::DeadlineExceeded { .. } => RetryClass::NextProvider,
        }
    }

    /// Shorthand for `retry_class() == RetryClass::WithBackoff`.
    pub fn is_transient(&self) -> bool {
        self.retry_class() == RetryClass::WithBackoff
    }
}
