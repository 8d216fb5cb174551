// src/observer.rs
use crate::{JobContext, QueueError};
use std::time::Duration;

/// Hook for job lifecycle events, shared by every lane of a dispatcher.
///
/// Lanes already log these events through `tracing`; an observer is for
/// callers that need to react to them (metrics, alerting, dead-letter
/// bookkeeping). Callbacks run on the lane's task and must not block.
pub trait JobObserver: Send + Sync + 'static {
    /// A throttle signal was received; the lane now waits `delay`.
    fn on_throttled(&self, _ctx: &JobContext, _attempt: u32, _delay: Duration) {}

    fn on_completed(&self, _ctx: &JobContext, _attempts: u32) {}

    /// The job will not run again. The lane moves on after its inter-job delay.
    fn on_permanent_failure(&self, _ctx: &JobContext, _error: &QueueError) {}
}
