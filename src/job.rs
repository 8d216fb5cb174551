// src/job.rs
use crate::{QueueError, Result};
use std::future::Future;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Unique identifier for a job, used to correlate log lines
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work submitted under a key.
///
/// `perform` may be called more than once: a job that returns
/// [`QueueError::RateLimited`] is run again after the server's backoff.
/// Any other error is final for that job.
#[async_trait::async_trait]
pub trait Job: Send + Sync + 'static {
    async fn perform(&self) -> Result<()>;
}

#[async_trait::async_trait]
impl<F, Fut> Job for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn perform(&self) -> Result<()> {
        (self)().await
    }
}

/// How a job resolved once its retry sequence finished
#[derive(Debug)]
pub enum JobOutcome {
    Completed { attempts: u32 },
    Failed { attempts: u32, error: QueueError },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    /// Number of times `perform` was called.
    pub fn attempts(&self) -> u32 {
        match self {
            JobOutcome::Completed { attempts } | JobOutcome::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn error(&self) -> Option<&QueueError> {
        match self {
            JobOutcome::Completed { .. } => None,
            JobOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Completion signal for a job submitted with `submit_tracked`.
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub(crate) fn new(job_id: JobId, rx: oneshot::Receiver<JobOutcome>) -> Self {
        Self { job_id, rx }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Wait for the job to resolve.
    ///
    /// Returns [`QueueError::Canceled`] if the runtime shut down before the
    /// job got its turn.
    pub async fn outcome(self) -> Result<JobOutcome> {
        self.rx.await.map_err(|_| QueueError::Canceled)
    }
}
