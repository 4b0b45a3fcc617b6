//! Feed a batch of simulated host queries through four lanes and print the
//! report.
//!
//! ```text
//! cargo run -p querybench --example simulated_run
//! ```

use clap::Parser;
use querybench::{
    CycleBenchmark, Dispatcher, Job, Phase, RunReport, StatsAggregator, format_human_output,
};
use querybench_cli::{
    Cli, InputMode, QueryBenchConfig, RunSettings, SimulatedExecutor, build_report_meta, parse_line,
};
use querybench_report::ReportConfig;
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let bench = CycleBenchmark::new(64);
    let executor = bench.measure(Phase::LoadConfig, || {
        SimulatedExecutor::new(Duration::from_millis(1), Duration::from_millis(20), 7, 0.05)
    })?;

    let stats = Arc::new(StatsAggregator::new());
    let mut dispatcher = Dispatcher::new(4, stats.clone())?;
    let work = executor.work_fn();

    for seq in 0..48u64 {
        let line = format!(
            "host_{:06},2017-01-01 {:02}:00:00,2017-01-01 {:02}:59:59",
            seq % 10,
            seq % 24,
            seq % 24
        );
        let spec = bench.measure(Phase::ParseInput, || parse_line(&line))?;
        let params = spec.params();
        dispatcher.submit(Job::new(seq, spec.key, params, work.clone()))?;
    }

    dispatcher.drain();
    dispatcher.shutdown()?;

    let summary = bench.measure(Phase::CalcQueryStats, || stats.finalize(dispatcher.lane_count()));
    let meta = build_report_meta(ReportConfig {
        concurrency: dispatcher.lane_count(),
        input: "generated".to_string(),
        pin_lanes: false,
    });
    let report = RunReport::new(
        meta,
        &summary,
        bench.report(),
        dispatcher.lane_loads(),
        stats.failures(),
    );
    print!("{}", format_human_output(&report));

    // The same run through the CLI driver, from an in-memory "file".
    let mut settings = RunSettings::resolve(
        &Cli::parse_from(["querybench", "-c", "2"]),
        &QueryBenchConfig::default(),
    )?;
    settings.show_progress = false;
    let input = "hostname,start_time,end_time\n\
                 host_000001,2017-01-01 08:59:22,2017-01-01 09:59:22\n\
                 host_000002,2017-01-02 13:02:02,2017-01-02 14:02:02\n";
    let report = querybench_cli::execute_run(
        &settings,
        std::io::Cursor::new(input),
        InputMode::File,
        &mut std::io::stderr(),
        &CycleBenchmark::new(8),
    )?;
    println!("CLI driver ran {} queries", report.query_times.queries);

    Ok(())
}
