// src/backoff.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seconds to wait when a throttle signal carries no usable `retry_after` hint.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Backoff for throttled jobs: the wait is whatever the server asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleBackoff {
    pub fallback_secs: u64,
}

impl ThrottleBackoff {
    pub fn new(fallback_secs: u64) -> Self {
        Self { fallback_secs }
    }

    /// Delay before the next attempt. Absent or non-positive hints use the fallback.
    pub fn calculate_delay(&self, retry_after: Option<i64>) -> Duration {
        match retry_after {
            Some(seconds) if seconds > 0 => Duration::from_secs(seconds as u64),
            _ => Duration::from_secs(self.fallback_secs),
        }
    }
}

impl Default for ThrottleBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_AFTER_SECS)
    }
}
