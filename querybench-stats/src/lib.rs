#![warn(missing_docs)]
//! QueryBench Statistics
//!
//! Aggregates completed-query latencies reported by lane workers and
//! summarizes them once the run has drained:
//! - Total, min, max, mean (whole-nanosecond truncation) and median
//! - Tail percentiles (p90, p99) with linear interpolation
//! - Failed-job bookkeeping

mod aggregator;
mod percentiles;
mod summary;

pub use aggregator::{FailedJob, StatsAggregator};
pub use percentiles::{Percentiles, compute_percentile, compute_percentiles};
pub use summary::{QueryTimeSummary, mean_duration, median_of_sorted, summarize_durations};

/// Sample count at which sorting switches to Rayon's parallel sort
pub const PARALLEL_SORT_THRESHOLD: usize = 100_000;
