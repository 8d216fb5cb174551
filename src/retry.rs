// src/retry.rs
use crate::{Job, JobContext, JobObserver, QueueError, Result, ThrottleBackoff};
use tracing::{Instrument, warn};

/// Retry-on-throttle policy shared by every job of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Throttle backoffs allowed per job. The job runs at most
    /// `max(max_retries, 1)` times; 0 still allows the first execution.
    pub max_retries: u32,
    pub backoff: ThrottleBackoff,
}

/// Result of running one job through [`RetryPolicy::run`]
#[derive(Debug)]
pub struct RetryReport {
    /// Times `perform` was called.
    pub attempts: u32,
    /// Throttle signals received, each followed by a backoff wait.
    pub throttled: u32,
    pub result: Result<()>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: ThrottleBackoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Run `job` until it succeeds, fails for a non-throttle reason, or the
    /// retry budget is spent.
    ///
    /// Every throttle signal waits the server's `retry_after` before the
    /// budget is checked, so a lane never fires its next request into an
    /// active rate limit. With `max_retries == 0` the first throttle signal
    /// is final and nothing is waited.
    pub async fn run(
        &self,
        job: &dyn Job,
        ctx: &JobContext,
        observer: Option<&dyn JobObserver>,
    ) -> RetryReport {
        let mut retries = 0u32;

        loop {
            let attempt = retries + 1;
            ctx.record_attempt(attempt);

            match job.perform().instrument(ctx.span.clone()).await {
                Ok(()) => {
                    return RetryReport {
                        attempts: attempt,
                        throttled: retries,
                        result: Ok(()),
                    };
                }
                Err(QueueError::RateLimited { retry_after }) => {
                    if self.max_retries == 0 {
                        return self.exhausted(attempt, attempt);
                    }

                    let delay = self.backoff.calculate_delay(retry_after);
                    warn!(
                        job_id = %ctx.job_id,
                        key = %ctx.key,
                        attempt,
                        "Job throttled, retrying after {:?}",
                        delay
                    );
                    if let Some(observer) = observer {
                        observer.on_throttled(ctx, attempt, delay);
                    }

                    tokio::time::sleep(delay).await;
                    retries += 1;

                    if retries >= self.max_retries {
                        return self.exhausted(attempt, retries);
                    }
                }
                Err(error) => {
                    return RetryReport {
                        attempts: attempt,
                        throttled: retries,
                        result: Err(error),
                    };
                }
            }
        }
    }

    fn exhausted(&self, attempts: u32, throttled: u32) -> RetryReport {
        RetryReport {
            attempts,
            throttled,
            result: Err(QueueError::RetriesExhausted {
                max_retries: self.max_retries,
            }),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, ThrottleBackoff::default())
    }
}
