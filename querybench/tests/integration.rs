//! Integration tests for QueryBench
//!
//! These tests drive the dispatcher, aggregator and cycle ledger together
//! the way a run does.

use parking_lot::Mutex;
use querybench::{
    CompletionSink, CycleBenchmark, Dispatcher, Job, JobError, Phase, PhaseReport,
    StatsAggregator, format_human_output, lane_index, summarize_durations, work_fn,
};
use querybench_report::{ReportConfig, ReportMeta, RunReport, SystemInfo};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Records every outcome in completion order
#[derive(Default)]
struct Journal {
    completed: Mutex<Vec<(usize, u64, String)>>,
    failed: Mutex<Vec<(usize, u64)>>,
}

impl CompletionSink for Journal {
    fn job_completed(&self, lane: usize, job: &Job, _elapsed: Duration) {
        self.completed
            .lock()
            .push((lane, job.sequence(), job.key().to_string()));
    }

    fn job_failed(&self, lane: usize, job: &Job, _error: &JobError) {
        self.failed.lock().push((lane, job.sequence()));
    }
}

fn host(i: usize) -> String {
    format!("host_{:06}", i)
}

fn sleepy(millis: u64) -> querybench::WorkFn {
    work_fn(move |_| {
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(millis));
        Ok(start.elapsed())
    })
}

/// Same key, same lane, for any pool size
#[test]
fn test_routing_is_deterministic() {
    for lanes in 1..=16 {
        let mut dispatcher = Dispatcher::new(lanes, Arc::new(Journal::default())).unwrap();
        for i in 0..64 {
            let key = host(i);
            assert_eq!(dispatcher.lane_index(&key), lane_index(&key, lanes));
            assert_eq!(dispatcher.lane_index(&key), dispatcher.lane_index(&key));
        }
        dispatcher.shutdown().unwrap();
    }
}

/// Jobs sharing a key complete in submission order
#[test]
fn test_per_key_ordering() {
    let journal = Arc::new(Journal::default());
    let mut dispatcher = Dispatcher::new(4, journal.clone()).unwrap();

    let work = work_fn(|job| {
        // Reverse the natural finishing order if jobs could overlap.
        let delay = 5 - (job.sequence() % 5);
        std::thread::sleep(Duration::from_millis(delay));
        Ok(Duration::from_millis(delay))
    });

    for seq in 0..60u64 {
        let key = host((seq % 3) as usize);
        dispatcher
            .submit(Job::new(seq, key, Vec::new(), work.clone()))
            .unwrap();
    }
    dispatcher.drain();
    dispatcher.shutdown().unwrap();

    let completed = journal.completed.lock();
    assert_eq!(completed.len(), 60);

    let mut by_key: HashMap<&str, Vec<u64>> = HashMap::new();
    for (_, seq, key) in completed.iter() {
        by_key.entry(key.as_str()).or_default().push(*seq);
    }
    for (key, seqs) in by_key {
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted, "jobs for {} ran out of order", key);
    }
}

/// A slow lane does not delay jobs routed elsewhere
#[test]
fn test_no_cross_key_blocking() {
    let journal = Arc::new(Journal::default());
    let mut dispatcher = Dispatcher::new(2, journal.clone()).unwrap();

    let slow_key = (0..).map(host).find(|k| dispatcher.lane_index(k) == 0).unwrap();
    let fast_key = (0..).map(host).find(|k| dispatcher.lane_index(k) == 1).unwrap();

    dispatcher
        .submit(Job::new(0, slow_key, Vec::new(), sleepy(600)))
        .unwrap();

    let start = Instant::now();
    for seq in 1..=5 {
        dispatcher
            .submit(Job::new(seq, fast_key.clone(), Vec::new(), sleepy(1)))
            .unwrap();
    }
    dispatcher.route(&fast_key).drain();
    assert!(start.elapsed() < Duration::from_millis(450));
    assert_eq!(journal.completed.lock().len(), 5);

    dispatcher.drain();
    dispatcher.shutdown().unwrap();
    assert_eq!(journal.completed.lock().len(), 6);
}

/// Drain returns only after every submitted job reported
#[test]
fn test_drain_completes_everything() {
    let stats = Arc::new(StatsAggregator::new());
    let mut dispatcher = Dispatcher::new(3, stats.clone()).unwrap();

    for seq in 0..30u64 {
        dispatcher
            .submit(Job::new(seq, host(seq as usize % 7), Vec::new(), sleepy(2)))
            .unwrap();
    }
    dispatcher.drain();

    assert_eq!(dispatcher.outstanding(), 0);
    assert_eq!(stats.sample_count(), 30);
    dispatcher.shutdown().unwrap();
}

/// [1s, 2s, 3s, 4s] in any order: median 2.5s, mean 2.5s, total 10s
#[test]
fn test_median_and_mean() {
    let stats = Arc::new(StatsAggregator::new());
    let mut dispatcher = Dispatcher::new(4, stats.clone()).unwrap();

    for (seq, secs) in [3u64, 1, 4, 2].into_iter().enumerate() {
        let work = work_fn(move |_| Ok(Duration::from_secs(secs)));
        dispatcher
            .submit(Job::new(seq as u64, host(seq), Vec::new(), work))
            .unwrap();
    }
    dispatcher.drain();
    dispatcher.shutdown().unwrap();

    let summary = stats.finalize(4);
    assert_eq!(summary.count, 4);
    assert_eq!(summary.total, Duration::from_secs(10));
    assert_eq!(summary.min, Duration::from_secs(1));
    assert_eq!(summary.max, Duration::from_secs(4));
    assert_eq!(summary.median, Duration::from_millis(2500));
    assert_eq!(summary.mean, Duration::from_millis(2500));
}

/// Nothing submitted: zero report, no fault
#[test]
fn test_empty_run() {
    let stats = Arc::new(StatsAggregator::new());
    let mut dispatcher = Dispatcher::new(2, stats.clone()).unwrap();
    dispatcher.drain();
    dispatcher.shutdown().unwrap();

    let summary = stats.finalize(2);
    assert_eq!(summary.count, 0);
    assert_eq!(summary.total, Duration::ZERO);
    assert_eq!(summary.median, Duration::ZERO);
    assert_eq!(summary.mean, Duration::ZERO);
    assert_eq!(summary, summarize_durations(&[], 2));
}

/// [O+100, O+200] stored as [100, 200], total 300
#[test]
fn test_cycle_overhead_correction() {
    let bench = CycleBenchmark::with_overhead(8, 75);
    bench.add(Phase::ParseInput, 175);
    bench.add(Phase::ParseInput, 275);

    assert_eq!(bench.samples(Phase::ParseInput), vec![100, 200]);
    match bench.report() {
        PhaseReport::Measured(breakdown) => {
            assert_eq!(breakdown.total_cycles, 300);
            assert_eq!(breakdown.get(Phase::ParseInput).unwrap().percent, 100.0);
        }
        PhaseReport::Unsupported => panic!("expected measured phases"),
    }
}

/// All phases zero: unsupported, not a division by zero
#[test]
fn test_zero_cycle_total() {
    let bench = CycleBenchmark::with_overhead(8, 0);
    for phase in Phase::ALL {
        bench.add(phase, 0);
    }
    let report = bench.report();
    assert_eq!(report, PhaseReport::Unsupported);
    assert!(report.breakdown().is_none());
}

/// M jobs from T producers over N lanes: exactly M samples, each job once
#[test]
fn test_concurrent_submission() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 250;

    let journal = Arc::new(Journal::default());
    let mut dispatcher = Dispatcher::new(5, journal.clone()).unwrap();
    let work = work_fn(|_| Ok(Duration::from_micros(1)));

    std::thread::scope(|s| {
        for producer in 0..PRODUCERS {
            let dispatcher = &dispatcher;
            let work = work.clone();
            s.spawn(move || {
                for i in 0..PER_PRODUCER {
                    let seq = (producer * PER_PRODUCER + i) as u64;
                    let key = host(seq as usize % 37);
                    dispatcher
                        .submit(Job::new(seq, key, Vec::new(), work.clone()))
                        .unwrap();
                }
            });
        }
    });
    dispatcher.drain();
    dispatcher.shutdown().unwrap();

    let completed = journal.completed.lock();
    assert_eq!(completed.len(), PRODUCERS * PER_PRODUCER);

    let mut seqs: Vec<u64> = completed.iter().map(|(_, seq, _)| *seq).collect();
    seqs.sort_unstable();
    let expected: Vec<u64> = (0..(PRODUCERS * PER_PRODUCER) as u64).collect();
    assert_eq!(seqs, expected);

    for (lane, _, key) in completed.iter() {
        assert_eq!(*lane, lane_index(key, 5));
    }
}

/// Failing and panicking jobs are recorded; their lane keeps working
#[test]
fn test_failed_jobs_do_not_stop_lane() {
    let stats = Arc::new(StatsAggregator::new());
    let mut dispatcher = Dispatcher::new(1, stats.clone()).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = ran.clone();
    let work = work_fn(move |job| {
        counter.fetch_add(1, Ordering::SeqCst);
        match job.sequence() {
            1 => Err(JobError::failed("connection reset")),
            3 => panic!("malformed result row"),
            _ => Ok(Duration::from_millis(1)),
        }
    });

    for seq in 0..6u64 {
        dispatcher
            .submit(Job::new(seq, "host_000001", Vec::new(), work.clone()))
            .unwrap();
    }
    dispatcher.drain();

    let load = &dispatcher.lane_loads()[0];
    assert_eq!(load.submitted, 6);
    assert_eq!(load.completed, 4);
    assert_eq!(load.failed, 2);
    dispatcher.shutdown().unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 6);
    let summary = stats.finalize(1);
    assert_eq!(summary.count, 4);
    assert_eq!(summary.failed, 2);

    let failures = stats.failures();
    let mut failed: Vec<u64> = failures.iter().map(|f| f.sequence).collect();
    failed.sort_unstable();
    assert_eq!(failed, vec![1, 3]);
    assert!(failures.iter().any(|f| f.message.contains("malformed result row")));
}

/// The human report carries the cycle table and query time block
#[test]
fn test_human_report_end_to_end() {
    let bench = CycleBenchmark::with_overhead(8, 0);
    bench.add(Phase::LoadConfig, 1_000);
    bench.add(Phase::ReadInputArgs, 1_000);
    bench.add(Phase::ParseInput, 3_000);
    bench.add(Phase::CalcQueryStats, 5_000);

    let summary = summarize_durations(
        &[Duration::from_secs(1), Duration::from_secs(3)],
        2,
    );
    let meta = ReportMeta {
        version: "0.0.0".to_string(),
        timestamp: chrono::Utc::now(),
        system: SystemInfo {
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            cpu: "test".to_string(),
            cpu_cores: 2,
            cycle_counter: true,
        },
        config: ReportConfig {
            concurrency: 2,
            input: "jobs.csv".to_string(),
            pin_lanes: false,
        },
    };
    let report = RunReport::new(meta, &summary, bench.report(), Vec::new(), Vec::new());
    let text = format_human_output(&report);

    assert!(text.contains("[CPU cycle totals]"));
    assert!(text.contains("Parse input lines:       3,000  | 30.00%"));
    assert!(text.contains("Total cycles:      10,000"));
    assert!(text.contains("Concurrency:  2"));
    assert!(text.contains(" Total time:  4.000s"));
    assert!(text.contains("Median time:  2.000s"));
}
