//! Retrying invoker
//!
//! Drives an idempotent async operation through bounded retry with
//! exponential backoff, returning a terminal [`InvocationResult`] instead of
//! raising for expected failure paths. Attempts run strictly sequentially;
//! a [`CancelHandle`] is observed before each attempt and during each
//! backoff sleep.

use std::future::Future;

use tokio::time::sleep;

use crate::cancel::CancelHandle;
use crate::error::ProviderError;

use super::policy::RetryPolicy;

/// Classified result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// The attempt produced a value.
    Success(T),
    /// The attempt failed with an error worth retrying.
    RetryableFailure(ProviderError),
    /// The attempt failed with an error no retry can fix.
    FatalFailure(ProviderError),
}

impl<T> AttemptOutcome<T> {
    /// Classify a raw attempt result against a policy's retry condition.
    pub fn classify(result: Result<T, ProviderError>, policy: &RetryPolicy) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) if policy.should_retry(&error) => Self::RetryableFailure(error),
            Err(error) => Self::FatalFailure(error),
        }
    }
}

/// Terminal result of a full retry sequence.
///
/// `attempts` counts completed attempts: on `Completed` it is the 1-based
/// number of the attempt that succeeded, on `GaveUp` the number of the
/// attempt that failed last, and on `Cancelled` the attempts finished before
/// the cancellation checkpoint fired.
#[derive(Debug, Clone)]
pub enum InvocationResult<T> {
    /// An attempt succeeded.
    Completed { value: T, attempts: u32 },
    /// The last allowed attempt failed, or a fatal failure ended the sequence.
    GaveUp { error: ProviderError, attempts: u32 },
    /// Cancellation was observed before a terminal outcome.
    Cancelled { attempts: u32 },
}

impl<T> InvocationResult<T> {
    /// Number of attempts completed when the sequence ended.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. }
            | Self::GaveUp { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Collapse into a plain `Result`, mapping `Cancelled` to
    /// [`ProviderError::Cancelled`].
    pub fn into_result(self) -> Result<T, ProviderError> {
        match self {
            Self::Completed { value, .. } => Ok(value),
            Self::GaveUp { error, .. } => Err(error),
            Self::Cancelled { .. } => Err(ProviderError::Cancelled),
        }
    }

    /// The completed value, if any.
    pub fn completed_value(self) -> Option<T> {
        match self {
            Self::Completed { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Executes operations under a [`RetryPolicy`].
///
/// One invoker serves any number of sequential invocations; it keeps no
/// state between them. The operation is re-created per attempt via `FnMut`,
/// so callers decide what gets cloned into each try.
pub struct RetryingInvoker {
    policy: RetryPolicy,
    cancel: Option<CancelHandle>,
}

impl RetryingInvoker {
    /// Create an invoker with the given policy and no cancellation handle.
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Attach a cancellation handle, checked before each attempt and raced
    /// against each backoff sleep.
    pub fn with_cancellation(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the operation until it succeeds, fails fatally, exhausts the
    /// attempt budget, or is cancelled.
    ///
    /// Expected failures come back inside the [`InvocationResult`]; this
    /// method itself never returns early through `?`.
    pub async fn invoke<F, Fut, T>(&self, mut operation: F) -> InvocationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        for attempt in 1..=self.policy.max_attempts {
            if let Some(cancel) = &self.cancel {
                if cancel.is_cancelled() {
                    return InvocationResult::Cancelled {
                        attempts: attempt - 1,
                    };
                }
            }

            match AttemptOutcome::classify(operation().await, &self.policy) {
                AttemptOutcome::Success(value) => {
                    return InvocationResult::Completed {
                        value,
                        attempts: attempt,
                    };
                }
                AttemptOutcome::FatalFailure(error) => {
                    return InvocationResult::GaveUp {
                        error,
                        attempts: attempt,
                    };
                }
                AttemptOutcome::RetryableFailure(error) => {
                    // No sleep after the final attempt
                    if attempt == self.policy.max_attempts {
                        return InvocationResult::GaveUp {
                            error,
                            attempts: attempt,
                        };
                    }

                    let delay = self.policy.calculate_delay(attempt - 1);
                    match &self.cancel {
                        Some(cancel) => {
                            tokio::select! {
                                // Cancellation wins over an elapsed sleep
                                biased;
                                _ = cancel.cancelled() => {
                                    return InvocationResult::Cancelled { attempts: attempt };
                                }
                                _ = sleep(delay) => {}
                            }
                        }
                        None => sleep(delay).await,
                    }
                }
            }
        }

        // Unreachable with a well-formed policy; max_attempts can only be 0
        // when the field was set directly.
        InvocationResult::GaveUp {
            error: ProviderError::Internal("retry sequence ended without an outcome".to_string()),
            attempts: self.policy.max_attempts,
        }
    }
}

/// Retry an operation with the default policy, collapsing the outcome into a
/// plain `Result`.
pub async fn retry<F, Fut, T>(operation: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    retry_with(operation, RetryPolicy::default()).await
}

/// Retry an operation with an explicit policy, collapsing the outcome into a
/// plain `Result`.
pub async fn retry_with<F, Fut, T>(operation: F, policy: RetryPolicy) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    RetryingInvoker::new(policy).invoke(operation).await.into_result()
}
