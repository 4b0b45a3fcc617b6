//! Report Data Structures

use chrono::{DateTime, Utc};
use querybench_core::{LaneLoad, PhaseReport};
use querybench_stats::{FailedJob, QueryTimeSummary};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete end-of-run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run metadata
    pub meta: ReportMeta,
    /// Query latency figures
    pub query_times: QueryTimeMetrics,
    /// Per-phase cycle breakdown
    pub phases: PhaseReport,
    /// Per-lane job counters
    pub lanes: Vec<LaneLoad>,
    /// Jobs whose work function failed
    pub failures: Vec<FailedJob>,
}

impl RunReport {
    /// Assemble a report from the run's collected results
    pub fn new(
        meta: ReportMeta,
        summary: &QueryTimeSummary,
        phases: PhaseReport,
        lanes: Vec<LaneLoad>,
        failures: Vec<FailedJob>,
    ) -> Self {
        Self {
            meta,
            query_times: QueryTimeMetrics::from(summary),
            phases,
            lanes,
            failures,
        }
    }

    /// Whether any job failed
    pub fn has_failures(&self) -> bool {
        self.query_times.failed > 0
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// QueryBench version
    pub version: String,
    /// Report generation time
    pub timestamp: DateTime<Utc>,
    /// Host description
    pub system: SystemInfo,
    /// Run configuration
    pub config: ReportConfig,
}

/// Run configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Configured lane count (after clamping)
    pub concurrency: usize,
    /// Job input source: a file path or "stdin"
    pub input: String,
    /// Whether lane workers were pinned to CPUs
    pub pin_lanes: bool,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name
    pub cpu: String,
    /// Available CPU cores
    pub cpu_cores: u32,
    /// Whether a hardware cycle counter is available
    pub cycle_counter: bool,
}

/// Query latency figures in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryTimeMetrics {
    /// Lanes the jobs ran on
    pub lanes: usize,
    /// Successful queries
    pub queries: usize,
    /// Failed queries
    pub failed: usize,
    /// Sum of query times
    pub total_ns: u64,
    /// Fastest query
    pub min_ns: u64,
    /// Slowest query
    pub max_ns: u64,
    /// Mean query time
    pub mean_ns: u64,
    /// Median query time
    pub median_ns: u64,
    /// 90th percentile
    pub p90_ns: u64,
    /// 99th percentile
    pub p99_ns: u64,
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl From<&QueryTimeSummary> for QueryTimeMetrics {
    fn from(s: &QueryTimeSummary) -> Self {
        Self {
            lanes: s.lanes,
            queries: s.count,
            failed: s.failed,
            total_ns: nanos(s.total),
            min_ns: nanos(s.min),
            max_ns: nanos(s.max),
            mean_ns: nanos(s.mean),
            median_ns: nanos(s.median),
            p90_ns: nanos(s.p90),
            p99_ns: nanos(s.p99),
        }
    }
}
