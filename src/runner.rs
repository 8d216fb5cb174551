// src/runner.rs
use crate::{Job, JobContext, JobHandle, JobId, JobObserver, JobOutcome, QueueConfig, QueueError};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};
use tokio::{runtime::Handle, sync::oneshot};
use tracing::{debug, error};

struct QueuedJob {
    job: Box<dyn Job>,
    ctx: JobContext,
    done: Option<oneshot::Sender<JobOutcome>>,
}

#[derive(Default)]
struct RunnerState {
    pending: VecDeque<QueuedJob>,
    draining: bool,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    throttled: AtomicU64,
}

/// One lane: runs the jobs of a single key in FIFO order, one at a time.
///
/// A background drain task is spawned when the first job arrives on an idle
/// lane and exits once the queue is observed empty. Pushing a job and the
/// "queue empty, go idle" check happen under the same lock, so at most one
/// drain task is alive per lane.
pub struct SequentialRunner {
    key: Arc<str>,
    config: Arc<QueueConfig>,
    observer: Option<Arc<dyn JobObserver>>,
    runtime: Handle,
    state: Mutex<RunnerState>,
    counters: Counters,
}

impl SequentialRunner {
    pub fn new(
        key: impl Into<Arc<str>>,
        config: Arc<QueueConfig>,
        observer: Option<Arc<dyn JobObserver>>,
        runtime: Handle,
    ) -> Self {
        Self {
            key: key.into(),
            config,
            observer,
            runtime,
            state: Mutex::new(RunnerState::default()),
            counters: Counters::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append `job` to the lane and return immediately.
    pub fn enqueue<J: Job>(self: &Arc<Self>, job: J) -> JobId {
        self.push(Box::new(job), None)
    }

    /// Like [`enqueue`](Self::enqueue), with a handle that resolves to the job's outcome.
    pub fn enqueue_tracked<J: Job>(self: &Arc<Self>, job: J) -> JobHandle {
        let (tx, rx) = oneshot::channel();
        let job_id = self.push(Box::new(job), Some(tx));
        JobHandle::new(job_id, rx)
    }

    fn push(
        self: &Arc<Self>,
        job: Box<dyn Job>,
        done: Option<oneshot::Sender<JobOutcome>>,
    ) -> JobId {
        let ctx = JobContext::new(Arc::clone(&self.key));
        let job_id = ctx.job_id.clone();

        let start_drain = {
            let mut state = self.lock_state();
            state.pending.push_back(QueuedJob { job, ctx, done });
            !std::mem::replace(&mut state.draining, true)
        };

        debug!(key = %self.key, job_id = %job_id, "Job enqueued");

        if start_drain {
            let runner = Arc::clone(self);
            self.runtime.spawn(runner.drain());
        }

        job_id
    }

    async fn drain(self: Arc<Self>) {
        debug!(key = %self.key, "Drain loop started");
        let mut guard = DrainGuard {
            runner: &self,
            idle: false,
        };

        loop {
            let next = {
                let mut state = self.lock_state();
                match state.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        state.draining = false;
                        guard.idle = true;
                        break;
                    }
                }
            };

            self.execute(next).await;

            if !self.config.inter_job_delay.is_zero() {
                tokio::time::sleep(self.config.inter_job_delay).await;
            }
        }

        debug!(key = %self.key, "Drain loop idle");
    }

    /// Run one job through the retry policy. Never fails: permanent failures
    /// are reported and swallowed so the lane keeps moving.
    async fn execute(&self, queued: QueuedJob) {
        let QueuedJob { job, ctx, done } = queued;

        // A panicking job only takes down its own task.
        let retry = self.config.retry;
        let observer = self.observer.clone();
        let task_ctx = ctx.clone();
        let report = self
            .runtime
            .spawn(async move { retry.run(job.as_ref(), &task_ctx, observer.as_deref()).await })
            .await;

        let (attempts, result) = match report {
            Ok(report) => {
                self.counters
                    .throttled
                    .fetch_add(report.throttled as u64, Ordering::Relaxed);
                (report.attempts, report.result)
            }
            Err(join_error) => {
                // Every attempt before the one that panicked was throttled.
                let attempts = ctx.attempts().max(1);
                self.counters
                    .throttled
                    .fetch_add(u64::from(attempts - 1), Ordering::Relaxed);
                (
                    attempts,
                    Err(QueueError::JobExecution(anyhow::anyhow!(
                        "job task aborted: {}",
                        join_error
                    ))),
                )
            }
        };

        let outcome = match result {
            Ok(()) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(key = %self.key, job_id = %ctx.job_id, attempts, "Job completed");
                self.notify(&ctx, |observer| observer.on_completed(&ctx, attempts));
                JobOutcome::Completed { attempts }
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    key = %self.key,
                    job_id = %ctx.job_id,
                    attempts,
                    "Job failed permanently: {}",
                    error
                );
                self.notify(&ctx, |observer| observer.on_permanent_failure(&ctx, &error));
                JobOutcome::Failed { attempts, error }
            }
        };

        if let Some(done) = done {
            // Receiver may have been dropped; the outcome is already logged.
            let _ = done.send(outcome);
        }
    }

    /// Call the observer, if any. A panicking observer is logged and ignored.
    fn notify(&self, ctx: &JobContext, call: impl FnOnce(&dyn JobObserver)) {
        let Some(observer) = self.observer.as_deref() else {
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| call(observer))).is_err() {
            error!(key = %self.key, job_id = %ctx.job_id, "Job observer panicked");
        }
    }

    /// Snapshot of the lane's queue and counters
    pub fn stats(&self) -> RunnerStats {
        let (pending, draining) = {
            let state = self.lock_state();
            (state.pending.len(), state.draining)
        };

        RunnerStats {
            key: self.key.to_string(),
            pending,
            draining,
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            throttled: self.counters.throttled.load(Ordering::Relaxed),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.lock_state().draining
    }

    // The state is never left half-updated, so a poisoned lock is still usable.
    fn lock_state(&self) -> MutexGuard<'_, RunnerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the draining flag if the drain task stops without going idle
/// (a panic, or the runtime dropping the task). The next push restarts it.
struct DrainGuard<'a> {
    runner: &'a SequentialRunner,
    idle: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if !self.idle {
            self.runner.lock_state().draining = false;
        }
    }
}

impl std::fmt::Debug for SequentialRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialRunner")
            .field("key", &self.key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerStats {
    pub key: String,
    /// Jobs waiting; the one currently running is not counted.
    pub pending: usize,
    pub draining: bool,
    pub completed: u64,
    pub failed: u64,
    /// Throttle signals received across all jobs.
    pub throttled: u64,
}
