//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Retry with exponential backoff
//! - Fallback with aggregated failure reporting
//! - Quote data validation

mod registry;
mod retry_policy;
mod skip_reason;
mod validator;

pub use registry::{ProbeOutcome, ProviderRegistry};
pub use retry_policy::RetryPolicy;
pub use skip_reason::{AttemptOutcome, FetchDiagnostics, ProviderAttempt, SkipReason};
pub use validator::{QuoteValidator, ValidatorConfig};
