#![warn(missing_docs)]
//! QueryBench CLI Library
//!
//! Drives a run end to end: load `querybench.toml`, resolve flags, stream
//! `key,start,end` lines from a file or an interactive prompt into the lane
//! dispatcher, then drain, shut down and print the report. Each stage is
//! attributed to a [`Phase`] in the cycle table.
//!
//! # Example
//!
//! ```no_run
//! fn main() -> anyhow::Result<()> {
//!     querybench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod input;
mod metadata;
mod progress;

pub use config::*;
pub use executor::{SimulatedExecutor, SimulationError};
pub use input::{InputError, JobSpec, LINE_FORMAT_EXAMPLE, TIMESTAMP_FORMAT, parse_line};
pub use metadata::{build_report_meta, system_info};
pub use progress::ProgressSink;

use anyhow::Context;
use clap::Parser;
use querybench_core::{CycleBenchmark, Dispatcher, Job, LaneOptions, Phase, WorkFn};
use querybench_report::{
    OutputFormat, ReportConfig, RunReport, format_human_output, generate_json_report,
};
use querybench_stats::StatsAggregator;
use regex::Regex;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// QueryBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "querybench")]
#[command(author, version, about = "QueryBench - sharded query benchmarking tool")]
pub struct Cli {
    /// Job input file (`key,start,end` per line); interactive mode if omitted
    pub input: Option<PathBuf>,

    /// Number of lanes (jobs sharing a key always run on the same lane)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Configuration file (default: nearest querybench.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only run jobs whose routing key matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Shortest simulated query (e.g., "5ms")
    #[arg(long)]
    pub min_latency: Option<String>,

    /// Longest simulated query (e.g., "50ms")
    #[arg(long)]
    pub max_latency: Option<String>,

    /// Seed for simulated latencies
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability that a simulated query fails (0.0 to 1.0)
    #[arg(long)]
    pub failure_rate: Option<f64>,

    /// Pin each lane worker to a CPU (Linux only)
    #[arg(long)]
    pub pin_lanes: bool,

    /// Treat the first line of the input file as a job, not a header
    #[arg(long)]
    pub no_header: bool,

    /// Print a default querybench.toml and exit
    #[arg(long)]
    pub init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where job lines come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Lines read from a file; the header line may be skipped
    File,
    /// Lines typed at a `> ` prompt until `exit`
    Interactive,
}

/// Run settings after layering querybench.toml and CLI overrides
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Requested lane count (0 is clamped to 1 by the dispatcher)
    pub concurrency: usize,
    /// Initial capacity of the latency ledger
    pub capacity_hint: usize,
    /// Pin lane workers to CPUs
    pub pin_lanes: bool,
    /// Skip the first line of an input file
    pub skip_header: bool,
    /// Routing key filter
    pub filter: Option<Regex>,
    /// Report format
    pub format: OutputFormat,
    /// Work function backend
    pub executor: SimulatedExecutor,
    /// Input description for report metadata
    pub input_label: String,
    /// Show a spinner while jobs run
    pub show_progress: bool,
}

impl RunSettings {
    /// Layer CLI flags over configuration file values
    pub fn resolve(cli: &Cli, config: &QueryBenchConfig) -> anyhow::Result<Self> {
        let format = cli
            .format
            .as_deref()
            .unwrap_or(config.output.format.as_str())
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?;

        let filter = cli
            .filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("invalid --filter pattern")?;

        let mut simulation = config.clone();
        if let Some(ref min) = cli.min_latency {
            simulation.simulation.min_latency = min.clone();
        }
        if let Some(ref max) = cli.max_latency {
            simulation.simulation.max_latency = max.clone();
        }
        if let Some(seed) = cli.seed {
            simulation.simulation.seed = seed;
        }
        if let Some(rate) = cli.failure_rate {
            simulation.simulation.failure_rate = rate;
        }
        let executor = SimulatedExecutor::from_config(&simulation)?;

        let input_label = cli
            .input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdin".to_string());

        Ok(Self {
            concurrency: cli.concurrency.unwrap_or(config.runner.concurrency),
            capacity_hint: config.runner.capacity_hint,
            pin_lanes: cli.pin_lanes || config.runner.pin_lanes,
            skip_header: !cli.no_header && config.output.skip_header,
            filter,
            format,
            executor,
            input_label,
            show_progress: !cli.verbose,
        })
    }
}

/// Counts of input lines by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Jobs handed to the dispatcher
    pub submitted: u64,
    /// Lines rejected by the parser
    pub rejected: u64,
    /// Lines dropped by `--filter`
    pub filtered: u64,
}

/// Run the QueryBench CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the QueryBench CLI with pre-parsed arguments.
///
/// Exits the process with status 1 if any query failed.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        "querybench=debug"
    } else {
        "querybench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if cli.init_config {
        print!("{}", QueryBenchConfig::default_toml());
        return Ok(());
    }

    let bench = CycleBenchmark::new(StatsAggregator::DEFAULT_CAPACITY);

    let config = bench.measure(Phase::LoadConfig, || load_config(cli.config.as_deref()))?;
    let settings = bench.measure(Phase::ReadInputArgs, || RunSettings::resolve(&cli, &config))?;

    let report = match cli.input {
        Some(ref path) => {
            let file = bench
                .measure(Phase::ReadInputArgs, || std::fs::File::open(path))
                .with_context(|| format!("failed to open {}", path.display()))?;
            execute_run(
                &settings,
                BufReader::new(file),
                InputMode::File,
                &mut std::io::stderr(),
                &bench,
            )?
        }
        None => {
            let stdin = std::io::stdin();
            execute_run(
                &settings,
                stdin.lock(),
                InputMode::Interactive,
                &mut std::io::stdout(),
                &bench,
            )?
        }
    };

    let output = render_report(&report, settings.format)?;

    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    if report.has_failures() {
        eprintln!("\n{} query(ies) failed", report.query_times.failed);
        std::process::exit(1);
    }

    Ok(())
}

/// Load `path`, or discover querybench.toml, falling back to defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<QueryBenchConfig> {
    match path {
        Some(path) => QueryBenchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(QueryBenchConfig::discover().unwrap_or_default()),
    }
}

/// Render a report in the requested format
pub fn render_report(report: &RunReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Human => format_human_output(report),
    })
}

/// Stream job lines through a fresh dispatcher and build the run report.
///
/// Parse errors and prompts go to `console`. Every line parse is recorded
/// under [`Phase::ParseInput`], the final summary under
/// [`Phase::CalcQueryStats`].
pub fn execute_run<R: BufRead, W: Write>(
    settings: &RunSettings,
    reader: R,
    mode: InputMode,
    console: &mut W,
    bench: &CycleBenchmark,
) -> anyhow::Result<RunReport> {
    let stats = Arc::new(StatsAggregator::with_capacity(settings.capacity_hint));
    let sink = Arc::new(if settings.show_progress && mode == InputMode::File {
        ProgressSink::new(Arc::clone(&stats))
    } else {
        ProgressSink::hidden(Arc::clone(&stats))
    });

    let mut dispatcher = Dispatcher::with_options(
        settings.concurrency,
        sink.clone(),
        LaneOptions {
            pin_workers: settings.pin_lanes,
        },
    )?;

    let work = settings.executor.work_fn();
    let feed = feed_jobs(&dispatcher, &work, settings, reader, mode, console, bench)?;

    dispatcher.drain();
    dispatcher.shutdown()?;
    sink.finish();

    info!(
        submitted = feed.submitted,
        rejected = feed.rejected,
        filtered = feed.filtered,
        "input finished"
    );

    let lanes = dispatcher.lane_count();
    let summary = bench.measure(Phase::CalcQueryStats, || stats.finalize(lanes));

    let meta = build_report_meta(ReportConfig {
        concurrency: lanes,
        input: settings.input_label.clone(),
        pin_lanes: settings.pin_lanes,
    });

    Ok(RunReport::new(
        meta,
        &summary,
        bench.report(),
        dispatcher.lane_loads(),
        stats.failures(),
    ))
}

fn feed_jobs<R: BufRead, W: Write>(
    dispatcher: &Dispatcher,
    work: &WorkFn,
    settings: &RunSettings,
    reader: R,
    mode: InputMode,
    console: &mut W,
    bench: &CycleBenchmark,
) -> anyhow::Result<FeedStats> {
    let interactive = mode == InputMode::Interactive;
    let mut feed = FeedStats::default();
    let mut lines = reader.lines();

    if interactive {
        writeln!(console, "You're running in interactive mode. Enter lines in the format:")?;
        writeln!(console, "{}", LINE_FORMAT_EXAMPLE)?;
        writeln!(console, "Type \"exit\" to exit")?;
    } else if settings.skip_header {
        if let Some(header) = lines.next() {
            header?;
        }
    }

    let mut sequence = 0u64;
    loop {
        if interactive {
            write!(console, "> ")?;
            console.flush()?;
        }

        let Some(line) = lines.next() else {
            if interactive {
                writeln!(console)?;
            }
            break;
        };
        let line = line?;
        let trimmed = line.trim();

        if interactive && trimmed == "exit" {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }

        let spec = match bench.measure(Phase::ParseInput, || parse_line(&line)) {
            Ok(spec) => spec,
            Err(e) => {
                writeln!(console, "{}", e)?;
                feed.rejected += 1;
                continue;
            }
        };

        if settings
            .filter
            .as_ref()
            .is_some_and(|filter| !filter.is_match(&spec.key))
        {
            feed.filtered += 1;
            continue;
        }

        let params = spec.params();
        dispatcher.submit(Job::new(sequence, spec.key, params, Arc::clone(work)))?;
        sequence += 1;
        feed.submitted += 1;
    }

    Ok(feed)
}
