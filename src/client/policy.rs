//! 重试策略：网络错误或幂等请求的可重试错误（明确排除 500）。
//!
//! Retry policy.
//!
//! A failed attempt is retried when:
//! - no response was received and the attempt did not time out (pure network failure), or
//! - the method is idempotent, the failure is retryable (no response, 429 or 5xx) and the
//!   status is not exactly 500.
//!
//! A 500 on an idempotent method is treated as a server-side invariant violation that a
//! replay will not fix.

use crate::client::types::{is_idempotent_method, ResponseEnvelope};
use crate::config::RetryConfig;
use crate::transport::TransportError;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

/// Default retry cap.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Why one attempt failed.
#[derive(Debug)]
pub enum FailureCause {
    /// No response reached the client.
    Transport(TransportError),
    /// A response arrived with a non-success status.
    Status(Arc<ResponseEnvelope>),
}

/// A non-terminal view of a failed attempt, as seen by the retry policy.
#[derive(Debug)]
pub struct AttemptFailure {
    pub method: Method,
    pub cause: FailureCause,
}

impl AttemptFailure {
    pub fn status(&self) -> Option<u16> {
        match &self.cause {
            FailureCause::Status(env) => Some(env.status),
            FailureCause::Transport(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(&self.cause, FailureCause::Transport(e) if e.is_timeout())
    }

    pub fn is_request_error(&self) -> bool {
        matches!(&self.cause, FailureCause::Transport(e) if e.is_request_error())
    }

    /// No response, not a timeout, and the request was actually built.
    pub fn is_network_error(&self) -> bool {
        matches!(&self.cause, FailureCause::Transport(e) if !e.is_timeout() && !e.is_request_error())
    }

    /// Transient by status: no response, 429, or any 5xx. Timeouts and construction
    /// failures are never retryable.
    pub fn is_retryable(&self) -> bool {
        if self.is_timeout() || self.is_request_error() {
            return false;
        }
        match self.status() {
            None => true,
            Some(s) => s == 429 || (500..=599).contains(&s),
        }
    }

    pub fn is_idempotent_request_error(&self) -> bool {
        is_idempotent_method(&self.method) && self.is_retryable()
    }
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    Fail,
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

/// Pluggable per-client retry policy.
///
/// `attempt` is 0-based: the first failure is evaluated with `attempt == 0`.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, failure: &AttemptFailure, attempt: u32) -> bool;

    fn backoff(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }

    fn decide(&self, failure: &AttemptFailure, attempt: u32) -> RetryDecision {
        if self.should_retry(failure, attempt) {
            RetryDecision::Retry {
                delay: self.backoff(attempt),
            }
        } else {
            RetryDecision::Fail
        }
    }
}

/// Network-or-idempotent policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct IdempotentRetryPolicy {
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for IdempotentRetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl IdempotentRetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            min_delay: Duration::from_millis(cfg.min_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }
}

impl RetryPolicy for IdempotentRetryPolicy {
    fn should_retry(&self, failure: &AttemptFailure, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        failure.is_network_error()
            || (failure.status() != Some(500) && failure.is_idempotent_request_error())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        // min_delay * 2^attempt, capped at max_delay
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _failure: &AttemptFailure, _attempt: u32) -> bool {
        false
    }
}
