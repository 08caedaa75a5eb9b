//! Retry policy configuration
//!
//! Defines how many attempts a call gets, how the delay between attempts
//! grows, and which failures are worth another attempt.

use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProviderError;

/// Caller-supplied predicate deciding whether a failure is retryable.
pub type RetryPredicate = Arc<dyn Fn(&ProviderError) -> bool + Send + Sync>;

/// Retry policy configuration.
///
/// Immutable once built; clone it freely, concurrent invocations may share
/// one policy read-only. Without a custom condition the default
/// classification [`ProviderError::is_retryable`] applies.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Delay before the first re-attempt
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after every failed attempt (at least 1.0)
    pub backoff_multiplier: f64,
    /// Upper bound of the uniform random extra delay added to every backoff
    pub jitter_range: Duration,
    /// Cap applied to the computed delay before jitter, if any
    pub max_delay: Option<Duration>,
    /// Custom retry condition
    pub retry_condition: Option<RetryPredicate>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_range: Duration::ZERO,
            max_delay: None,
            retry_condition: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter_range", &self.jitter_range)
            .field("max_delay", &self.max_delay)
            .field(
                "retry_condition",
                &self.retry_condition.as_ref().map(|_| "<custom>"),
            )
            .finish()
    }
}

impl RetryPolicy {
    /// Create a new retry policy with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts (clamped to at least 1).
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Set the delay before the first re-attempt.
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier (clamped to at least 1.0).
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier < 1.0 { 1.0 } else { multiplier };
        self
    }

    /// Set the jitter range. Each backoff sleep gets a uniform random extra
    /// delay in `[0, jitter_range]`.
    pub const fn with_jitter_range(mut self, jitter_range: Duration) -> Self {
        self.jitter_range = jitter_range;
        self
    }

    /// Cap the computed pre-jitter delay.
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Set a custom retry condition, replacing the default classification.
    pub fn with_retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&ProviderError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Check if an error should be retried.
    pub fn should_retry(&self, error: &ProviderError) -> bool {
        if let Some(condition) = &self.retry_condition {
            condition(error)
        } else {
            error.is_retryable()
        }
    }

    /// Delay to sleep after the given zero-based failed attempt.
    ///
    /// The pre-jitter part is `initial_delay * backoff_multiplier^attempt`,
    /// capped by `max_delay` when one is set; a uniform random draw from
    /// `[0, jitter_range]` is added on top.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let mut delay = Duration::from_millis(base as u64);
        if let Some(cap) = self.max_delay {
            delay = delay.min(cap);
        }
        delay + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let range_ms = self.jitter_range.as_millis() as u64;
        if range_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=range_ms))
    }
}
