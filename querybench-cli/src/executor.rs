//! Simulated query execution
//!
//! Stands in for a database round trip: each job sleeps for a latency drawn
//! from `[min_latency, max_latency]` and reports the measured elapsed time.
//! The draw is seeded from the run seed, the routing key hash and the job's
//! sequence number, so a given input replays with the same latencies.

use crate::config::QueryBenchConfig;
use querybench_core::{Job, JobError, WorkFn, fnv1a_32, work_fn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Invalid simulation settings
#[derive(Debug, Error)]
pub enum SimulationError {
    /// `min_latency` exceeds `max_latency`
    #[error("min latency {min:?} exceeds max latency {max:?}")]
    LatencyRange {
        /// Configured minimum
        min: Duration,
        /// Configured maximum
        max: Duration,
    },
    /// Failure rate outside `0.0..=1.0`
    #[error("failure rate must be between 0.0 and 1.0, got {0}")]
    FailureRate(f64),
    /// Unparseable duration string
    #[error("invalid latency '{value}': {reason}")]
    Latency {
        /// Offending value
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Deterministic stand-in for a query backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedExecutor {
    min_latency: Duration,
    max_latency: Duration,
    seed: u64,
    failure_rate: f64,
}

impl SimulatedExecutor {
    /// Create an executor, validating its settings
    pub fn new(
        min_latency: Duration,
        max_latency: Duration,
        seed: u64,
        failure_rate: f64,
    ) -> Result<Self, SimulationError> {
        if min_latency > max_latency {
            return Err(SimulationError::LatencyRange {
                min: min_latency,
                max: max_latency,
            });
        }
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(SimulationError::FailureRate(failure_rate));
        }
        Ok(Self {
            min_latency,
            max_latency,
            seed,
            failure_rate,
        })
    }

    /// Build an executor from the `[simulation]` table
    pub fn from_config(config: &QueryBenchConfig) -> Result<Self, SimulationError> {
        let sim = &config.simulation;
        Self::new(
            latency(&sim.min_latency)?,
            latency(&sim.max_latency)?,
            sim.seed,
            sim.failure_rate,
        )
    }

    /// Shortest simulated query
    pub fn min_latency(&self) -> Duration {
        self.min_latency
    }

    /// Longest simulated query
    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }

    /// Latency and outcome drawn for `job`, without sleeping
    pub fn plan(&self, job: &Job) -> Result<Duration, JobError> {
        let mut rng = StdRng::seed_from_u64(self.job_seed(job));

        if self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate) {
            return Err(JobError::failed(format!(
                "simulated query failure for {}",
                job.key()
            )));
        }

        let min = self.min_latency.as_nanos() as u64;
        let max = self.max_latency.as_nanos() as u64;
        Ok(Duration::from_nanos(rng.gen_range(min..=max)))
    }

    /// Run one simulated query and return the measured elapsed time
    pub fn execute(&self, job: &Job) -> Result<Duration, JobError> {
        let latency = self.plan(job)?;
        let start = Instant::now();
        std::thread::sleep(latency);
        Ok(start.elapsed())
    }

    /// Work function submitting every job through this executor
    pub fn work_fn(self) -> WorkFn {
        work_fn(move |job| self.execute(job))
    }

    fn job_seed(&self, job: &Job) -> u64 {
        let key_hash = u64::from(fnv1a_32(job.key().as_bytes()));
        self.seed ^ (key_hash << 32) ^ job.sequence()
    }
}

fn latency(value: &str) -> Result<Duration, SimulationError> {
    QueryBenchConfig::parse_duration(value)
        .map(Duration::from_nanos)
        .map_err(|e| SimulationError::Latency {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
