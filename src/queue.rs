// src/queue.rs
use crate::{Result, RetryPolicy, ThrottleBackoff, backoff::DEFAULT_RETRY_AFTER_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for queue configuration, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    /// Wait after each job resolves before the next job on the same key.
    /// Zero or negative means no wait.
    #[serde(alias = "delayBetweenMessagesMs")]
    pub delay_between_messages_ms: i64,
    /// Throttle retries allowed per job; this counts backoffs, not executions.
    /// 0 runs the job once and gives up on its first throttle signal.
    /// Negative values are treated as 0.
    #[serde(alias = "maxRetries")]
    pub max_retries: i64,
    /// Backoff used when a throttle signal has no usable `retry_after`.
    #[serde(alias = "defaultRetryAfterSecs")]
    pub default_retry_after_secs: u64,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            delay_between_messages_ms: 1000,
            max_retries: 3,
            default_retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
        }
    }
}

impl QueueOptions {
    /// Parse options from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_delay_between_messages_ms(mut self, ms: i64) -> Self {
        self.delay_between_messages_ms = ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_default_retry_after_secs(mut self, secs: u64) -> Self {
        self.default_retry_after_secs = secs;
        self
    }
}

/// Normalized, immutable configuration shared by all lanes of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub inter_job_delay: Duration,
    pub retry: RetryPolicy,
}

impl From<&QueueOptions> for QueueConfig {
    fn from(options: &QueueOptions) -> Self {
        let delay_ms = u64::try_from(options.delay_between_messages_ms).unwrap_or(0);
        let max_retries = u32::try_from(options.max_retries.max(0)).unwrap_or(u32::MAX);

        Self {
            inter_job_delay: Duration::from_millis(delay_ms),
            retry: RetryPolicy::new(
                max_retries,
                ThrottleBackoff::new(options.default_retry_after_secs),
            ),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from(&QueueOptions::default())
    }
}
