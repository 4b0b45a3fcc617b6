//! Progress display
//!
//! Wraps the stats aggregator as the dispatcher's completion sink and ticks
//! an `indicatif` spinner as lane workers report outcomes.

use indicatif::{ProgressBar, ProgressStyle};
use querybench_core::{CompletionSink, Job, JobError};
use querybench_stats::StatsAggregator;
use std::sync::Arc;
use std::time::Duration;

/// Completion sink that records into a [`StatsAggregator`] and updates a spinner
pub struct ProgressSink {
    stats: Arc<StatsAggregator>,
    bar: ProgressBar,
}

impl ProgressSink {
    /// Show a spinner on stderr
    pub fn new(stats: Arc<StatsAggregator>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} queries {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { stats, bar }
    }

    /// Record without drawing anything
    pub fn hidden(stats: Arc<StatsAggregator>) -> Self {
        Self {
            stats,
            bar: ProgressBar::hidden(),
        }
    }

    /// Jobs reported so far, successful or not
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Clear the spinner from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl CompletionSink for ProgressSink {
    fn job_completed(&self, lane: usize, job: &Job, elapsed: Duration) {
        self.stats.job_completed(lane, job, elapsed);
        self.bar.inc(1);
    }

    fn job_failed(&self, lane: usize, job: &Job, error: &JobError) {
        self.stats.job_failed(lane, job, error);
        self.bar.inc(1);
        self.bar
            .set_message(format!("({} failed)", self.stats.failures().len()));
    }
}
