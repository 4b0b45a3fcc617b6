#![warn(missing_docs)]
//! QueryBench Report - Reporting
//!
//! Builds the end-of-run report and renders it as:
//! - Human-readable text (cycle table + query time block)
//! - JSON (machine-readable)

mod format;
mod json;
mod report;

pub use format::{
    format_human_output, format_lane_loads, format_phase_table, format_query_times,
    format_seconds, group_thousands,
};
pub use json::generate_json_report;
pub use report::{QueryTimeMetrics, ReportConfig, ReportMeta, RunReport, SystemInfo};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON with the full report
    Json,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
