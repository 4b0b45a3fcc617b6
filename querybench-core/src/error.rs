//! Error types for job execution and lane lifecycle.

use thiserror::Error;

/// Failure of a single job's work function.
///
/// A failed job is recorded and skipped; it never stops its lane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The work function reported an error
    #[error("job failed: {0}")]
    Failed(String),

    /// The work function panicked
    #[error("job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Build a [`JobError::Failed`] from any displayable error.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        JobError::Failed(err.to_string())
    }
}

/// Errors from the lane pool itself.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Shutdown was requested while jobs were still in flight
    #[error("lane {lane} still has {outstanding} outstanding job(s); drain before shutdown")]
    Outstanding {
        /// Lane index
        lane: usize,
        /// Submitted-but-unfinished jobs
        outstanding: usize,
    },

    /// The lane no longer accepts jobs
    #[error("lane {lane} is closed")]
    LaneClosed {
        /// Lane index
        lane: usize,
    },

    /// The lane's worker has not been started
    #[error("lane {lane} has not been started")]
    NotStarted {
        /// Lane index
        lane: usize,
    },

    /// `start` was called on a lane that is already running
    #[error("lane {lane} was already started")]
    AlreadyStarted {
        /// Lane index
        lane: usize,
    },

    /// The worker thread could not be created
    #[error("failed to spawn worker for lane {lane}")]
    Spawn {
        /// Lane index
        lane: usize,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The worker thread panicked outside of job execution
    #[error("worker for lane {lane} panicked")]
    WorkerPanicked {
        /// Lane index
        lane: usize,
    },
}
