// src/lib.rs
//! keyed-queue: per-key sequential job queues for rate-limited APIs
//!
//! Jobs submitted under the same key run one at a time, in order, with a
//! fixed pause between them. Different keys run independently. A job that
//! is throttled (`QueueError::RateLimited`) is retried after the server's
//! `retry_after`; any other failure is logged and the lane moves on.

pub mod backoff;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod observer;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod throttle;

pub use backoff::{DEFAULT_RETRY_AFTER_SECS, ThrottleBackoff};
pub use context::JobContext;
pub use dispatcher::{DispatcherBuilder, KeyedDispatcher};
pub use error::{QueueError, Result};
pub use job::{Job, JobHandle, JobId, JobOutcome};
pub use observer::JobObserver;
pub use queue::{QueueConfig, QueueOptions};
pub use retry::{RetryPolicy, RetryReport};
pub use runner::{RunnerStats, SequentialRunner};
pub use throttle::{ApiErrorResponse, ResponseParameters};

// Re-export commonly used types
pub use async_trait::async_trait;
