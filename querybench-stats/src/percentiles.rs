//! Percentile Computation
//!
//! Percentiles over latency samples. Inputs must already be sorted
//! ascending; the summary sorts once and reuses the order for the median
//! and every percentile.

use std::time::Duration;

/// Tail percentiles reported alongside the median
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Percentiles {
    /// 90th percentile
    pub p90: Duration,
    /// 95th percentile
    pub p95: Duration,
    /// 99th percentile
    pub p99: Duration,
}

/// Compute a single percentile from ascending samples
///
/// Uses linear interpolation between nearest ranks, truncated to whole
/// nanoseconds.
///
/// # Examples
///
/// ```ignore
/// # use querybench_stats::compute_percentile;
/// # use std::time::Duration;
/// let sorted: Vec<Duration> = (1..=5).map(Duration::from_secs).collect();
/// let p50 = compute_percentile(&sorted, 50.0); // 3s
/// ```
pub fn compute_percentile(sorted: &[Duration], percentile: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }

    if sorted.len() == 1 {
        return sorted[0];
    }

    let n = sorted.len();
    let p = percentile.clamp(0.0, 100.0) / 100.0;

    // Linear interpolation between nearest ranks
    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    let lower = sorted[lower_idx].as_nanos() as f64;
    let upper = sorted[upper_idx].as_nanos() as f64;
    Duration::from_nanos((lower + fraction * (upper - lower)) as u64)
}

/// Compute all reported tail percentiles
pub fn compute_percentiles(sorted: &[Duration]) -> Percentiles {
    Percentiles {
        p90: compute_percentile(sorted, 90.0),
        p95: compute_percentile(sorted, 95.0),
        p99: compute_percentile(sorted, 99.0),
    }
}
