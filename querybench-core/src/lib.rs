#![warn(missing_docs)]
//! QueryBench Core - Lane Runtime
//!
//! This crate provides the execution environment for query benchmarks:
//! - `Dispatcher`, a fixed pool of lanes with FNV-1a key routing
//! - `Lane`, one worker thread fed through a rendezvous handoff queue
//! - `Job` and the `CompletionSink` seam that receives job outcomes
//! - `CycleBenchmark`, per-phase cycle accounting (RDTSCP / CNTVCT_EL0)

mod cycles;
mod dispatcher;
mod error;
mod job;
mod lane;
mod measure;
mod route;

pub use cycles::{CycleBenchmark, Phase, PhaseBreakdown, PhaseReport, PhaseTotal};
pub use dispatcher::Dispatcher;
pub use error::{JobError, PoolError};
pub use job::{CompletionSink, Job, NullSink, WorkFn, work_fn};
pub use lane::{Lane, LaneLoad, LaneOptions};
/// Whether this platform provides hardware cycle counters (x86_64 RDTSCP or AArch64 CNTVCT_EL0).
/// When `false`, every cycle reading is 0 and phase reports are `Unsupported`.
pub use measure::HAS_CYCLE_COUNTER;
pub use measure::{CycleTimer, measure_overhead, pin_to_cpu, read_cycles};
pub use route::{fnv1a_32, lane_index};
