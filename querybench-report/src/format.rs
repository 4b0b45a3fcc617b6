//! Output Formatting
//!
//! Human-readable output for the end-of-run report:
//! - Cycle totals per phase with percentage shares
//! - Query time block (seconds, three decimals)
//! - Per-lane job counts and failed jobs

use crate::report::{QueryTimeMetrics, RunReport};
use querybench_core::{LaneLoad, PhaseReport};

const LABEL_WIDTH: usize = 17;
const CYCLES_WIDTH: usize = 10;

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &RunReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format_phase_table(&report.phases));
    output.push_str(&format_query_times(&report.query_times));
    output.push_str(&format_lane_loads(&report.lanes));

    if !report.failures.is_empty() {
        output.push_str("Failed jobs\n");
        output.push_str(&"-".repeat(30));
        output.push('\n');
        for failure in &report.failures {
            output.push_str(&format!(
                "  Job {} ({}, lane {}): {}\n",
                failure.sequence, failure.key, failure.lane, failure.message
            ));
        }
        output.push('\n');
    }

    output
}

/// Cycle totals table, or a notice when no cycle counter is available
pub fn format_phase_table(phases: &PhaseReport) -> String {
    let mut output = String::from("[CPU cycle totals]\n");

    let breakdown = match phases {
        PhaseReport::Unsupported => {
            output.push_str("Cycle counter not supported on this platform (x86_64 and aarch64 only)\n\n");
            return output;
        }
        PhaseReport::Measured(breakdown) => breakdown,
    };

    for phase in &breakdown.phases {
        output.push_str(&format!(
            "{:>lw$}:  {:>cw$}  | {:5.2}%\n",
            phase.phase.label(),
            group_thousands(phase.cycles),
            phase.percent,
            lw = LABEL_WIDTH,
            cw = CYCLES_WIDTH,
        ));
    }
    output.push(' ');
    output.push_str(&"=".repeat(49));
    output.push('\n');
    output.push_str(&format!(
        "{:>lw$}:  {:>cw$}\n\n",
        "Total cycles",
        group_thousands(breakdown.total_cycles),
        lw = LABEL_WIDTH,
        cw = CYCLES_WIDTH,
    ));
    output.push_str(
        "* Counter ticks, not true core cycles (invariant TSC ignores frequency scaling).\n",
    );
    output.push_str("  Still a fair view of how long each part of the run takes.\n\n");

    output
}

/// Query time block
pub fn format_query_times(metrics: &QueryTimeMetrics) -> String {
    let mut output = String::new();

    output.push_str(&"=".repeat(30));
    output.push('\n');
    output.push_str(&format!("Concurrency:  {}\n", metrics.lanes));
    output.push_str(&format!("Queries run:  {}\n", metrics.queries));
    if metrics.failed > 0 {
        output.push_str(&format!("     Failed:  {}\n", metrics.failed));
    }
    output.push_str(&format!(" Total time: {}\n", format_seconds(metrics.total_ns)));
    output.push_str(&format!("   Min time: {}\n", format_seconds(metrics.min_ns)));
    output.push_str(&format!("   Max time: {}\n", format_seconds(metrics.max_ns)));
    output.push_str(&format!("   Avg time: {}\n", format_seconds(metrics.mean_ns)));
    output.push_str(&format!("Median time: {}\n", format_seconds(metrics.median_ns)));
    output.push_str(&format!("   p90 time: {}\n", format_seconds(metrics.p90_ns)));
    output.push_str(&format!("   p99 time: {}\n", format_seconds(metrics.p99_ns)));
    output.push('\n');
    output.push_str(
        "Note: That is *not* tool run time, it's total query time! If queries ran in parallel,\n\
         the value may be larger than expected.\n\n",
    );

    output
}

/// Per-lane job counts
pub fn format_lane_loads(lanes: &[LaneLoad]) -> String {
    if lanes.is_empty() {
        return String::new();
    }

    let mut output = String::from("Lane loads\n");
    output.push_str(&"-".repeat(30));
    output.push('\n');
    for load in lanes {
        output.push_str(&format!(
            "  lane {:>3}: {:>6} submitted  {:>6} completed  {:>4} failed\n",
            load.lane, load.submitted, load.completed, load.failed
        ));
    }
    output.push('\n');
    output
}

/// Nanoseconds as seconds with three decimals, right-aligned to six columns
pub fn format_seconds(nanos: u64) -> String {
    format!("{:6.3}s", nanos as f64 / 1_000_000_000.0)
}

/// Group digits in threes with commas: `1234567` → `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
