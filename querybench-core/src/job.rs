//! Jobs and completion reporting.

use crate::error::JobError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Work performed by a job. Returns the measured elapsed time.
pub type WorkFn = Arc<dyn Fn(&Job) -> Result<Duration, JobError> + Send + Sync>;

/// Wrap a closure as a [`WorkFn`].
pub fn work_fn<F>(f: F) -> WorkFn
where
    F: Fn(&Job) -> Result<Duration, JobError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Immutable unit of work routed to exactly one lane.
#[derive(Clone)]
pub struct Job {
    sequence: u64,
    key: String,
    params: Vec<String>,
    work: WorkFn,
}

impl Job {
    /// Create a job
    pub fn new(sequence: u64, key: impl Into<String>, params: Vec<String>, work: WorkFn) -> Self {
        Self {
            sequence,
            key: key.into(),
            params,
            work,
        }
    }

    /// Submission order number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Routing key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Ordered job parameters
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Run the work function, converting a panic into [`JobError::Panicked`].
    pub fn run(&self) -> Result<Duration, JobError> {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.work)(self)));

        match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                Err(JobError::Panicked(message))
            }
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("sequence", &self.sequence)
            .field("key", &self.key)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Receives job outcomes from lane workers.
///
/// Called from every lane's thread concurrently.
pub trait CompletionSink: Send + Sync {
    /// A job finished successfully
    fn job_completed(&self, lane: usize, job: &Job, elapsed: Duration);

    /// A job's work function failed or panicked
    fn job_failed(&self, lane: usize, job: &Job, error: &JobError);
}

/// Sink that discards every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CompletionSink for NullSink {
    fn job_completed(&self, _lane: usize, _job: &Job, _elapsed: Duration) {}

    fn job_failed(&self, _lane: usize, _job: &Job, _error: &JobError) {}
}
