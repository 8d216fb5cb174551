// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Throttle signal from the job's underlying operation.
    #[error("Rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<i64> },

    /// The throttle budget ran out. `max_retries` is the configured budget,
    /// not a count of executions: with a budget of 0 the job still ran once.
    #[error("Job failed after {max_retries} attempts.")]
    RetriesExhausted { max_retries: u32 },

    #[error("Job execution failed: {0}")]
    JobExecution(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Job completion signal dropped before the job resolved")]
    Canceled,
}

impl QueueError {
    /// Shorthand for a throttle failure carrying a `retry_after` hint in seconds.
    pub fn rate_limited(retry_after: Option<i64>) -> Self {
        QueueError::RateLimited { retry_after }
    }

    /// Whether the retry wrapper will back off and run the job again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
