//! Resilient executor with exponential backoff retry
//!
//! Runs an async operation up to `max_attempts` times. An attempt fails when it
//! produces a non-success outcome (e.g. an HTTP 503) or a transient fault (e.g.
//! a connect timeout). Delays double from `base_delay_ms` and nothing is slept
//! after the last attempt. Attempts never overlap.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Something an attempt produced that may still count as a failure.
pub trait AttemptOutcome {
    fn is_success(&self) -> bool;
}

/// Fault raised by an attempt; only transient faults are retried.
pub trait TransientFault: Display {
    fn is_transient(&self) -> bool;
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay in milliseconds before the second attempt
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
        }
    }
}

pub struct ResilientExecutor {
    config: RetryConfig,
}

impl ResilientExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay after the given failed attempt (1-based): base * 2^(attempt-1)
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay_ms;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(exponential.min(self.config.max_delay_ms))
    }

    /// Run `operation` under the retry policy.
    ///
    /// Returns the first successful outcome. When every attempt fails, the
    /// last attempt's result is returned as-is: a non-success outcome as
    /// `Ok`, a transient fault as `Err`. Non-transient faults are returned
    /// immediately.
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: AttemptOutcome,
        E: TransientFault,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = operation().await;
            let last = attempt >= max_attempts;

            match &result {
                Ok(outcome) if outcome.is_success() => {
                    if attempt > 1 {
                        tracing::info!(
                            attempt,
                            operation = operation_name,
                            "Request succeeded after retry"
                        );
                    }
                    return result;
                }
                Ok(_) if last => {
                    tracing::error!(
                        attempts = attempt,
                        operation = operation_name,
                        "Request still unsuccessful after all retry attempts"
                    );
                    return result;
                }
                Ok(_) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        operation = operation_name,
                        "Request returned unsuccessful outcome, retrying..."
                    );
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!(
                        error = %e,
                        operation = operation_name,
                        "Request failed with non-retryable error"
                    );
                    return result;
                }
                Err(e) if last => {
                    tracing::error!(
                        attempts = attempt,
                        error = %e,
                        operation = operation_name,
                        "Request failed after all retry attempts"
                    );
                    return result;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        operation = operation_name,
                        "Request failed, retrying..."
                    );
                }
            }

            let delay = self.calculate_delay(attempt);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    struct Status(u16);

    impl AttemptOutcome for Status {
        fn is_success(&self) -> bool {
            self.0 < 400
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Fault {
        Timeout,
        Malformed,
    }

    impl std::fmt::Display for Fault {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl TransientFault for Fault {
        fn is_transient(&self) -> bool {
            matches!(self, Fault::Timeout)
        }
    }

    /// Operation that fails a configurable number of times before succeeding
    struct Flaky {
        failures_remaining: AtomicU32,
        calls: AtomicU32,
        started_at: Mutex<Vec<Instant>>,
        failure: Result<Status, Fault>,
    }

    impl Flaky {
        fn new(failure_count: u32, failure: Result<Status, Fault>) -> Arc<Self> {
            Arc::new(Self {
                failures_remaining: AtomicU32::new(failure_count),
                calls: AtomicU32::new(0),
                started_at: Mutex::new(Vec::new()),
                failure,
            })
        }

        async fn call(&self) -> Result<Status, Fault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started_at.lock().unwrap().push(Instant::now());
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
                match &self.failure {
                    Ok(Status(code)) => Ok(Status(*code)),
                    Err(fault) => Err(fault.clone()),
                }
            } else {
                Ok(Status(200))
            }
        }

        fn gaps(&self) -> Vec<Duration> {
            let starts = self.started_at.lock().unwrap();
            starts.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    async fn run(executor: &ResilientExecutor, flaky: &Arc<Flaky>) -> Result<Status, Fault> {
        executor
            .execute("test", || {
                let flaky = Arc::clone(flaky);
                async move { flaky.call().await }
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry() {
        let flaky = Flaky::new(0, Err(Fault::Timeout));
        let executor = ResilientExecutor::default();

        assert_eq!(run(&executor, &flaky).await, Ok(Status(200)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_transient_faults_then_success_backs_off_one_then_two_seconds() {
        let flaky = Flaky::new(2, Err(Fault::Timeout));
        let executor = ResilientExecutor::default();

        let result = run(&executor, &flaky).await;

        assert_eq!(result, Ok(Status(200)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            flaky.gaps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unsuccessful_outcome_is_retried_and_last_one_returned() {
        let flaky = Flaky::new(10, Ok(Status(503)));
        let executor = ResilientExecutor::default();

        let start = Instant::now();
        let result = run(&executor, &flaky).await;

        assert_eq!(result, Ok(Status(503)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        // No sleep after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_fault_on_last_attempt_is_propagated() {
        let flaky = Flaky::new(10, Err(Fault::Timeout));
        let executor = ResilientExecutor::default();

        assert_eq!(run(&executor, &flaky).await, Err(Fault::Timeout));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_fault_is_not_retried() {
        let flaky = Flaky::new(10, Err(Fault::Malformed));
        let executor = ResilientExecutor::default();

        assert_eq!(run(&executor, &flaky).await, Err(Fault::Malformed));
        assert_eq!(
            flaky.calls.load(Ordering::SeqCst),
            1,
            "Non-transient fault should not retry"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let flaky = Flaky::new(10, Ok(Status(500)));
        let executor = ResilientExecutor::new(RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });

        assert_eq!(run(&executor, &flaky).await, Ok(Status(500)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exponential_backoff() {
        let executor = ResilientExecutor::new(RetryConfig {
            max_attempts: 6,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
        });

        assert_eq!(executor.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(executor.calculate_delay(2), Duration::from_millis(2000));
        assert_eq!(executor.calculate_delay(3), Duration::from_millis(4000));
        assert_eq!(executor.calculate_delay(5), Duration::from_millis(16000));
        // 32000 capped at 30000
        assert_eq!(executor.calculate_delay(6), Duration::from_millis(30000));
    }
}
