#![warn(missing_docs)]
//! # QueryBench
//!
//! Sharded query benchmarking with latency statistics and cycle accounting.
//!
//! - **Keyed Lanes**: jobs are routed by the FNV-1a hash of their routing key;
//!   jobs sharing a key run one at a time, in submission order
//! - **No Cross-Lane Blocking**: a slow lane never stalls producers feeding
//!   other lanes
//! - **Query Time Summary**: total, min, max, mean, median, p90 and p99 over
//!   every completed job
//! - **Phase Cycle Table**: RDTSCP / CNTVCT_EL0 cycle totals per program phase
//! - **Failure Containment**: a failing or panicking job is recorded and skipped
//!
//! ## Quick Start
//!
//! ```no_run
//! use querybench::prelude::*;
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! let stats = Arc::new(StatsAggregator::new());
//! let mut dispatcher = Dispatcher::new(4, stats.clone()).unwrap();
//!
//! let work = work_fn(|_job| {
//!     let start = Instant::now();
//!     std::thread::sleep(Duration::from_millis(5));
//!     Ok(start.elapsed())
//! });
//!
//! for (seq, host) in ["host_000001", "host_000002", "host_000001"].iter().enumerate() {
//!     dispatcher
//!         .submit(Job::new(seq as u64, *host, Vec::new(), work.clone()))
//!         .unwrap();
//! }
//!
//! dispatcher.drain();
//! dispatcher.shutdown().unwrap();
//! let summary = stats.finalize(dispatcher.lane_count());
//! assert_eq!(summary.count, 3);
//! ```

// Re-export core types
pub use querybench_core::{
    CompletionSink, CycleBenchmark, CycleTimer, Dispatcher, HAS_CYCLE_COUNTER, Job, JobError,
    Lane, LaneLoad, LaneOptions, NullSink, Phase, PhaseBreakdown, PhaseReport, PhaseTotal,
    PoolError, WorkFn, fnv1a_32, lane_index, measure_overhead, read_cycles, work_fn,
};

// Re-export stats
pub use querybench_stats::{
    FailedJob, Percentiles, QueryTimeSummary, StatsAggregator, compute_percentiles,
    summarize_durations,
};

// Re-export report
pub use querybench_report::{
    OutputFormat, QueryTimeMetrics, RunReport, format_human_output, generate_json_report,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CompletionSink, CycleBenchmark, Dispatcher, Job, JobError, Phase, PhaseReport,
        StatsAggregator, work_fn,
    };
}

/// Run the QueryBench CLI.
///
/// ```no_run
/// fn main() {
///     querybench::run().unwrap();
/// }
/// ```
pub use querybench_cli::run;
