//! Configuration loading from querybench.toml
//!
//! QueryBench configuration can be specified in a `querybench.toml` file.
//! The configuration is discovered by walking up from the current directory,
//! or given explicitly with `--config`. Command-line flags override it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name looked up during discovery
pub const CONFIG_FILE_NAME: &str = "querybench.toml";

/// QueryBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryBenchConfig {
    /// Lane pool configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Simulated query configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Lane pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Number of lanes (values below 1 are clamped to 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Initial capacity of the latency ledger
    #[serde(default = "default_capacity_hint")]
    pub capacity_hint: usize,
    /// Pin each lane worker to CPU `index % cores` (Linux only)
    #[serde(default)]
    pub pin_lanes: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            capacity_hint: default_capacity_hint(),
            pin_lanes: false,
        }
    }
}

fn default_concurrency() -> usize {
    1
}
fn default_capacity_hint() -> usize {
    256
}

/// Simulated query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Shortest simulated query (e.g., "5ms")
    #[serde(default = "default_min_latency")]
    pub min_latency: String,
    /// Longest simulated query (e.g., "50ms")
    #[serde(default = "default_max_latency")]
    pub max_latency: String,
    /// Seed mixed into every job's latency draw
    #[serde(default)]
    pub seed: u64,
    /// Probability that a query fails (0.0 to 1.0)
    #[serde(default)]
    pub failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_latency: default_min_latency(),
            max_latency: default_max_latency(),
            seed: 0,
            failure_rate: 0.0,
        }
    }
}

fn default_min_latency() -> String {
    "5ms".to_string()
}
fn default_max_latency() -> String {
    "50ms".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Skip the first line of an input file
    #[serde(default = "default_skip_header")]
    pub skip_header: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            skip_header: default_skip_header(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_skip_header() -> bool {
    true
}

impl QueryBenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find the nearest `querybench.toml` walking up from `start`
    pub fn find_from(start: impl AsRef<Path>) -> Option<PathBuf> {
        let mut dir = start.as_ref().to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        let path = Self::find_from(dir)?;
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# QueryBench Configuration

[runner]
# Number of lanes; jobs with the same routing key always share a lane
concurrency = 1
# Initial capacity of the latency ledger
capacity_hint = 256
# Pin each lane worker to a CPU (Linux only)
pin_lanes = false

[simulation]
# Range of simulated query latencies
min_latency = "5ms"
max_latency = "50ms"
# Seed mixed into every job's latency draw
seed = 0
# Probability that a query fails (0.0 to 1.0)
failure_rate = 0.0

[output]
# Default output format: human or json
format = "human"
# Skip the first line of an input file
skip_header = true
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Duration must be non-negative: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueryBenchConfig::default();
        assert_eq!(config.runner.concurrency, 1);
        assert_eq!(config.runner.capacity_hint, 256);
        assert!(!config.runner.pin_lanes);
        assert_eq!(config.simulation.min_latency, "5ms");
        assert_eq!(config.output.format, "human");
        assert!(config.output.skip_header);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(QueryBenchConfig::parse_duration("3s").unwrap(), 3_000_000_000);
        assert_eq!(QueryBenchConfig::parse_duration("500ms").unwrap(), 500_000_000);
        assert_eq!(QueryBenchConfig::parse_duration("100us").unwrap(), 100_000);
        assert_eq!(QueryBenchConfig::parse_duration("100µs").unwrap(), 100_000);
        assert_eq!(QueryBenchConfig::parse_duration("1000ns").unwrap(), 1000);
        assert_eq!(QueryBenchConfig::parse_duration("2m").unwrap(), 120_000_000_000);
        assert_eq!(QueryBenchConfig::parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert_eq!(QueryBenchConfig::parse_duration("2").unwrap(), 2_000_000_000);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(QueryBenchConfig::parse_duration("").is_err());
        assert!(QueryBenchConfig::parse_duration("fast").is_err());
        assert!(QueryBenchConfig::parse_duration("5 parsecs").is_err());
        assert!(QueryBenchConfig::parse_duration("-5ms").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            concurrency = 8

            [simulation]
            failure_rate = 0.25
        "#;

        let config: QueryBenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.concurrency, 8);
        assert_eq!(config.simulation.failure_rate, 0.25);
        // Defaults should still apply
        assert_eq!(config.runner.capacity_hint, 256);
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = QueryBenchConfig::default_toml();
        let config: QueryBenchConfig = toml::from_str(&default_toml).unwrap();
        assert_eq!(config.runner.concurrency, 1);
        assert_eq!(config.simulation.max_latency, "50ms");
    }

    #[test]
    fn test_load_and_find_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[runner]\nconcurrency = 3\npin_lanes = true\n").unwrap();

        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = QueryBenchConfig::find_from(&nested).unwrap();
        assert_eq!(found, path);

        let config = QueryBenchConfig::load(&found).unwrap();
        assert_eq!(config.runner.concurrency, 3);
        assert!(config.runner.pin_lanes);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[runner\nconcurrency = ").unwrap();
        assert!(QueryBenchConfig::load(&path).is_err());
    }
}
