//! Query Time Summary
//!
//! Reduces latency samples to the figures printed at the end of a run.
//! Extremes and the total come from a single pass over the samples; the
//! median and tail percentiles come from one ascending sort.

use crate::PARALLEL_SORT_THRESHOLD;
use crate::percentiles::compute_percentiles;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency summary for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryTimeSummary {
    /// Lanes the jobs were spread across
    pub lanes: usize,
    /// Successful queries measured
    pub count: usize,
    /// Queries whose work function failed
    pub failed: usize,
    /// Sum of all query times (not wall-clock run time)
    pub total: Duration,
    /// Fastest query
    pub min: Duration,
    /// Slowest query
    pub max: Duration,
    /// `total / count`, truncated to whole nanoseconds
    pub mean: Duration,
    /// Middle sample; mean of the two middle samples for even counts
    pub median: Duration,
    /// 90th percentile
    pub p90: Duration,
    /// 99th percentile
    pub p99: Duration,
}

/// Summarize latency samples.
///
/// No samples is a valid state: every duration is zero.
pub fn summarize_durations(samples: &[Duration], lanes: usize) -> QueryTimeSummary {
    let Some(&first) = samples.first() else {
        return QueryTimeSummary {
            lanes,
            ..QueryTimeSummary::default()
        };
    };

    let mut min = first;
    let mut max = first;
    let mut total = Duration::ZERO;
    for &sample in samples {
        min = min.min(sample);
        max = max.max(sample);
        total += sample;
    }

    let mut sorted = samples.to_vec();
    if sorted.len() >= PARALLEL_SORT_THRESHOLD {
        sorted.par_sort_unstable();
    } else {
        sorted.sort_unstable();
    }

    let tails = compute_percentiles(&sorted);

    QueryTimeSummary {
        lanes,
        count: samples.len(),
        failed: 0,
        total,
        min,
        max,
        mean: mean_duration(total, samples.len()),
        median: median_of_sorted(&sorted),
        p90: tails.p90,
        p99: tails.p99,
    }
}

/// `total / count` with integer nanosecond division (truncates toward zero).
pub fn mean_duration(total: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / count as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Median of ascending samples: the middle element, or the mean of the two
/// middle elements for an even count.
pub fn median_of_sorted(sorted: &[Duration]) -> Duration {
    let n = sorted.len();
    if n == 0 {
        Duration::ZERO
    } else if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2
    } else {
        sorted[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&s| Duration::from_secs(s)).collect()
    }

    #[test]
    fn test_even_count_summary() {
        for order in [[1, 2, 3, 4], [4, 3, 2, 1], [3, 1, 4, 2]] {
            let summary = summarize_durations(&secs(&order), 4);

            assert_eq!(summary.count, 4);
            assert_eq!(summary.total, Duration::from_secs(10));
            assert_eq!(summary.min, Duration::from_secs(1));
            assert_eq!(summary.max, Duration::from_secs(4));
            assert_eq!(summary.mean, Duration::from_millis(2_500));
            assert_eq!(summary.median, Duration::from_millis(2_500));
        }
    }

    #[test]
    fn test_odd_count_median() {
        let summary = summarize_durations(&secs(&[9, 1, 5]), 1);
        assert_eq!(summary.median, Duration::from_secs(5));
        assert_eq!(summary.mean, Duration::from_secs(5));
    }

    #[test]
    fn test_mean_truncates() {
        let samples = vec![Duration::from_nanos(1), Duration::from_nanos(2)];
        let summary = summarize_durations(&samples, 1);
        assert_eq!(summary.mean, Duration::from_nanos(1));
        assert_eq!(summary.median, Duration::from_nanos(1));
    }

    #[test]
    fn test_single_sample() {
        let summary = summarize_durations(&[Duration::from_millis(7)], 2);
        assert_eq!(summary.min, Duration::from_millis(7));
        assert_eq!(summary.max, Duration::from_millis(7));
        assert_eq!(summary.median, Duration::from_millis(7));
        assert_eq!(summary.p99, Duration::from_millis(7));
    }

    #[test]
    fn test_empty_samples() {
        let summary = summarize_durations(&[], 3);
        assert_eq!(
            summary,
            QueryTimeSummary {
                lanes: 3,
                ..QueryTimeSummary::default()
            }
        );
        assert_eq!(summary.total, Duration::ZERO);
        assert_eq!(summary.median, Duration::ZERO);
    }

    #[test]
    fn test_parallel_sort_path() {
        let samples: Vec<Duration> = (0..PARALLEL_SORT_THRESHOLD as u64)
            .rev()
            .map(Duration::from_micros)
            .collect();
        let summary = summarize_durations(&samples, 8);

        assert_eq!(summary.min, Duration::ZERO);
        assert_eq!(
            summary.max,
            Duration::from_micros(PARALLEL_SORT_THRESHOLD as u64 - 1)
        );
        // Middle of 0..100_000us is (49_999 + 50_000) / 2
        assert_eq!(summary.median, Duration::from_nanos(49_999_500));
    }

    #[test]
    fn test_median_helper() {
        assert_eq!(median_of_sorted(&[]), Duration::ZERO);
        assert_eq!(median_of_sorted(&secs(&[1, 3])), Duration::from_secs(2));
    }
}
