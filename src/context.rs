// src/context.rs
use crate::JobId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::Span;

/// Identity of one queued job, carried through its retries
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub key: Arc<str>,
    pub span: Span,
    attempts: Arc<AtomicU32>,
}

impl JobContext {
    pub fn new(key: Arc<str>) -> Self {
        let job_id = JobId::new();
        let span = tracing::info_span!(
            "job_execution",
            job_id = %job_id,
            key = %key,
            attempt = tracing::field::Empty,
        );

        Self {
            job_id,
            key,
            span,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Tag the span with the 1-based attempt about to run.
    pub fn record_attempt(&self, attempt: u32) {
        self.attempts.store(attempt, Ordering::SeqCst);
        self.span.record("attempt", attempt);
    }

    /// Attempts started so far, shared by every clone of this context.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}
