//! Phase Cycle Accounting
//!
//! [`CycleBenchmark`] keeps one ledger of corrected cycle counts per
//! [`Phase`]. Each ledger has its own lock, so recording one phase never
//! contends with another. The instrument overhead is calibrated once at
//! construction and subtracted from every raw sample on insertion.

use crate::measure::{CycleTimer, measure_overhead};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Program phase a cycle sample is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Loading run configuration
    LoadConfig,
    /// Reading and resolving command-line arguments
    ReadInputArgs,
    /// Reading and parsing job input lines
    ParseInput,
    /// Computing query time statistics
    CalcQueryStats,
}

impl Phase {
    /// All phases, in report order
    pub const ALL: [Phase; 4] = [
        Phase::LoadConfig,
        Phase::ReadInputArgs,
        Phase::ParseInput,
        Phase::CalcQueryStats,
    ];

    /// Label used in the cycle table
    pub fn label(self) -> &'static str {
        match self {
            Phase::LoadConfig => "Load config",
            Phase::ReadInputArgs => "Read input args",
            Phase::ParseInput => "Parse input lines",
            Phase::CalcQueryStats => "Calc query stats",
        }
    }

    fn slot(self) -> usize {
        match self {
            Phase::LoadConfig => 0,
            Phase::ReadInputArgs => 1,
            Phase::ParseInput => 2,
            Phase::CalcQueryStats => 3,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Corrected cycle total for one phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTotal {
    /// Phase
    pub phase: Phase,
    /// Sum of corrected samples
    pub cycles: u64,
    /// Number of samples recorded
    pub samples: usize,
    /// Share of the grand total, in percent
    pub percent: f64,
}

/// Per-phase totals and their shares of the grand total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseBreakdown {
    /// One entry per phase, in [`Phase::ALL`] order
    pub phases: Vec<PhaseTotal>,
    /// Sum of every phase total
    pub total_cycles: u64,
}

impl PhaseBreakdown {
    /// Total for a single phase
    pub fn get(&self, phase: Phase) -> Option<&PhaseTotal> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}

/// Outcome of [`CycleBenchmark::report`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseReport {
    /// Every phase summed to zero: no usable cycle counter on this platform.
    /// Phases are "not measured", not "free".
    Unsupported,
    /// Cycle counts were collected
    Measured(PhaseBreakdown),
}

impl PhaseReport {
    /// Breakdown, if cycles were measured
    pub fn breakdown(&self) -> Option<&PhaseBreakdown> {
        match self {
            PhaseReport::Unsupported => None,
            PhaseReport::Measured(b) => Some(b),
        }
    }
}

/// Per-phase cycle ledger for one program run.
///
/// Construct one per run and pass it by reference to the code paths that
/// record phases.
#[derive(Debug)]
pub struct CycleBenchmark {
    overhead: u64,
    ledgers: [Mutex<Vec<u64>>; 4],
}

impl CycleBenchmark {
    /// Create a ledger, calibrating the counter overhead.
    pub fn new(capacity_hint: usize) -> Self {
        Self::with_overhead(capacity_hint, measure_overhead())
    }

    /// Create a ledger with a known overhead.
    pub fn with_overhead(capacity_hint: usize, overhead: u64) -> Self {
        Self {
            overhead,
            ledgers: std::array::from_fn(|_| Mutex::new(Vec::with_capacity(capacity_hint))),
        }
    }

    /// Calibrated overhead subtracted from every sample
    pub fn overhead(&self) -> u64 {
        self.overhead
    }

    /// Record a raw cycle span for `phase`.
    ///
    /// Samples smaller than the overhead mean start/end were captured out of
    /// order; they are clamped to zero.
    pub fn add(&self, phase: Phase, raw_cycles: u64) {
        let corrected = raw_cycles.saturating_sub(self.overhead);
        self.ledgers[phase.slot()].lock().push(corrected);
    }

    /// Run `f` and record its cycle span under `phase`.
    pub fn measure<T>(&self, phase: Phase, f: impl FnOnce() -> T) -> T {
        let timer = CycleTimer::start();
        let out = f();
        self.add(phase, timer.stop());
        out
    }

    /// Corrected samples recorded for `phase`, in insertion order
    pub fn samples(&self, phase: Phase) -> Vec<u64> {
        self.ledgers[phase.slot()].lock().clone()
    }

    /// Sum every phase and compute each phase's share of the total.
    pub fn report(&self) -> PhaseReport {
        let totals: Vec<(Phase, u64, usize)> = Phase::ALL
            .iter()
            .map(|&phase| {
                let ledger = self.ledgers[phase.slot()].lock();
                (phase, ledger.iter().sum::<u64>(), ledger.len())
            })
            .collect();

        let total_cycles: u64 = totals.iter().map(|&(_, cycles, _)| cycles).sum();
        if total_cycles == 0 {
            return PhaseReport::Unsupported;
        }

        let phases = totals
            .into_iter()
            .map(|(phase, cycles, samples)| PhaseTotal {
                phase,
                cycles,
                samples,
                percent: 100.0 * cycles as f64 / total_cycles as f64,
            })
            .collect();

        PhaseReport::Measured(PhaseBreakdown {
            phases,
            total_cycles,
        })
    }
}
