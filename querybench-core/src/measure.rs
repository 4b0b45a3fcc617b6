//! Cycle Counter Access
//!
//! Uses RDTSCP on x86_64 and CNTVCT_EL0 on AArch64. Other platforms read 0,
//! which the cycle ledger reports as "unsupported".
//!
//! These are timestamp-counter ticks, not true core cycles: modern x86 parts
//! run an invariant TSC that does not follow frequency scaling. They are still
//! a cheap and consistent way to attribute time between program phases.

// ─── Inline cycle counter helpers ────────────────────────────────────────────

/// Read the CPU cycle/tick counter (platform-specific).
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn read_cycles() -> u64 {
    // SAFETY: RDTSCP is available on all x86_64 CPUs since ~2006 and waits
    // for prior instructions to retire before reading the counter.
    unsafe {
        let mut _aux: u32 = 0;
        std::arch::x86_64::__rdtscp(&mut _aux)
    }
}

/// Read the virtual counter timer on AArch64 (comparable to x86 TSC).
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn read_cycles() -> u64 {
    let cnt: u64;
    // SAFETY: CNTVCT_EL0 is readable from EL0 on all AArch64 implementations.
    unsafe {
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) cnt, options(nostack, nomem));
    }
    cnt
}

/// Read the cycle counter. Always 0 on platforms without one.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
pub fn read_cycles() -> u64 {
    0
}

/// Whether this platform provides real cycle counters.
pub const HAS_CYCLE_COUNTER: bool = cfg!(target_arch = "x86_64") || cfg!(target_arch = "aarch64");

/// Number of back-to-back reads used to calibrate the instrument overhead.
pub const CALIBRATION_ROUNDS: usize = 100_000;

/// Estimate the fixed cost of one start/stop counter pair.
///
/// Takes the minimum over [`CALIBRATION_ROUNDS`] consecutive reads, which is
/// the cost with no interference from interrupts or migrations. Returns 0
/// when the platform has no cycle counter.
pub fn measure_overhead() -> u64 {
    if !HAS_CYCLE_COUNTER {
        return 0;
    }

    let mut overhead = u64::MAX;
    for _ in 0..CALIBRATION_ROUNDS {
        let start = read_cycles();
        let end = read_cycles();
        overhead = overhead.min(end.saturating_sub(start));
    }
    overhead
}

// ─── CycleTimer ──────────────────────────────────────────────────────────────

/// Raw cycle span around a region of code.
///
/// The value returned by [`CycleTimer::stop`] still contains the instrument
/// overhead; [`crate::CycleBenchmark::add`] removes it.
#[derive(Debug, Clone, Copy)]
pub struct CycleTimer {
    start: u64,
}

impl CycleTimer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: read_cycles(),
        }
    }

    /// Raw cycles elapsed since `start`
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        read_cycles().saturating_sub(self.start)
    }
}

/// Set CPU affinity to pin the current thread to a specific core
///
/// Keeps a lane worker on one core so its counter readings stay comparable.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// CPU pinning is a no-op on this platform.
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
