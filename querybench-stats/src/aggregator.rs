//! Stats Aggregator
//!
//! Collects elapsed times from every lane worker. One lock guards the sample
//! list end to end; [`StatsAggregator::finalize`] is meant to run once,
//! after the dispatcher has drained.

use crate::summary::{QueryTimeSummary, summarize_durations};
use parking_lot::Mutex;
use querybench_core::{CompletionSink, Job, JobError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A job whose work function failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedJob {
    /// Submission order number
    pub sequence: u64,
    /// Routing key
    pub key: String,
    /// Lane the job ran on
    pub lane: usize,
    /// Failure message
    pub message: String,
}

/// Thread-safe collector of query latencies
#[derive(Debug)]
pub struct StatsAggregator {
    samples: Mutex<Vec<Duration>>,
    failures: Mutex<Vec<FailedJob>>,
}

impl StatsAggregator {
    /// Initial sample capacity used by [`StatsAggregator::new`]
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an empty aggregator with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(Vec::with_capacity(capacity)),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Append one completed query's elapsed time
    pub fn record(&self, elapsed: Duration) {
        self.samples.lock().push(elapsed);
    }

    /// Remember a failed job
    pub fn record_failure(&self, failure: FailedJob) {
        self.failures.lock().push(failure);
    }

    /// Samples recorded so far
    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    /// Failed jobs recorded so far, in completion order
    pub fn failures(&self) -> Vec<FailedJob> {
        self.failures.lock().clone()
    }

    /// Summarize everything recorded so far.
    ///
    /// Call after the dispatcher has drained; samples recorded concurrently
    /// may or may not be included.
    pub fn finalize(&self, lanes: usize) -> QueryTimeSummary {
        let mut summary = {
            let samples = self.samples.lock();
            summarize_durations(&samples, lanes)
        };
        summary.failed = self.failures.lock().len();
        debug!(
            queries = summary.count,
            failed = summary.failed,
            lanes,
            "query times finalized"
        );
        summary
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSink for StatsAggregator {
    fn job_completed(&self, _lane: usize, _job: &Job, elapsed: Duration) {
        self.record(elapsed);
    }

    fn job_failed(&self, lane: usize, job: &Job, error: &JobError) {
        self.record_failure(FailedJob {
            sequence: job.sequence(),
            key: job.key().to_string(),
            lane,
            message: error.to_string(),
        });
    }
}
