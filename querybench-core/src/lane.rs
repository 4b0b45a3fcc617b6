//! Lane Worker
//!
//! A lane is one dedicated worker thread plus a private rendezvous handoff
//! queue. Jobs handed to a lane run one at a time, in handoff order.
//!
//! ## Lifecycle
//!
//! ```text
//!  new ──► start ──► enqueue* ──► drain ──► stop
//!                       │                    │
//!                       ▼                    ▼
//!              worker runs job      shutdown signal dropped
//!              reports to sink      worker joined
//!              counter - 1          handoff queue closed
//! ```
//!
//! `stop` refuses to tear a lane down while its completion counter is
//! non-zero, and always closes the handoff queue only after the worker has
//! observed the shutdown signal and exited.

use crate::error::{JobError, PoolError};
use crate::job::{CompletionSink, Job};
use crate::measure::pin_to_cpu;
use crossbeam_channel::{Receiver, Sender, bounded, select};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Options applied when a lane's worker starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneOptions {
    /// Pin each worker to CPU `lane % available cores`
    pub pin_workers: bool,
}

/// Snapshot of a lane's job counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLoad {
    /// Lane index
    pub lane: usize,
    /// Jobs accepted by the lane
    pub submitted: u64,
    /// Jobs that finished successfully
    pub completed: u64,
    /// Jobs whose work function failed or panicked
    pub failed: u64,
}

/// Barrier counting submitted-but-unfinished jobs.
#[derive(Debug, Default)]
struct Completion {
    outstanding: Mutex<usize>,
    idle: Condvar,
}

impl Completion {
    fn add(&self) {
        *self.outstanding.lock() += 1;
    }

    fn done(&self) {
        let mut outstanding = self.outstanding.lock();
        debug_assert!(*outstanding > 0, "completion counter underflow");
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            self.idle.wait(&mut outstanding);
        }
    }

    fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }
}

/// Decrements the completion counter even if reporting the outcome unwinds.
struct DoneGuard<'a>(&'a Completion);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.done();
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Receiving ends held until the worker starts.
struct Pending {
    jobs: Receiver<Job>,
    shutdown: Receiver<()>,
}

/// One worker thread with its private handoff queue.
pub struct Lane {
    index: usize,
    jobs: Option<Sender<Job>>,
    shutdown: Option<Sender<()>>,
    pending: Option<Pending>,
    worker: Option<JoinHandle<()>>,
    completion: Arc<Completion>,
    counters: Arc<Counters>,
}

impl Lane {
    /// Create an idle lane. No thread is spawned until [`Lane::start`].
    pub fn new(index: usize) -> Self {
        let (jobs_tx, jobs_rx) = bounded::<Job>(0);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        Self {
            index,
            jobs: Some(jobs_tx),
            shutdown: Some(shutdown_tx),
            pending: Some(Pending {
                jobs: jobs_rx,
                shutdown: shutdown_rx,
            }),
            worker: None,
            completion: Arc::new(Completion::default()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Lane index within its dispatcher
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the worker thread is running
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the worker thread.
    pub fn start(
        &mut self,
        sink: Arc<dyn CompletionSink>,
        options: LaneOptions,
    ) -> Result<(), PoolError> {
        let lane = self.index;
        if self.worker.is_some() {
            return Err(PoolError::AlreadyStarted { lane });
        }
        let Some(pending) = self.pending.take() else {
            return Err(PoolError::LaneClosed { lane });
        };

        let completion = Arc::clone(&self.completion);
        let counters = Arc::clone(&self.counters);

        let handle = std::thread::Builder::new()
            .name(format!("lane-{}", lane))
            .spawn(move || {
                if options.pin_workers {
                    pin_worker(lane);
                }
                run_worker(lane, pending, sink.as_ref(), &completion, &counters);
            })
            .map_err(|source| PoolError::Spawn { lane, source })?;

        self.worker = Some(handle);
        debug!(lane, "lane worker started");
        Ok(())
    }

    /// Hand a job to the worker, blocking until the worker accepts it.
    ///
    /// The completion counter is raised before the handoff so that a
    /// concurrent [`Lane::drain`] never misses the job.
    pub fn enqueue(&self, job: Job) -> Result<(), PoolError> {
        let lane = self.index;
        let Some(jobs) = self.jobs.as_ref() else {
            return Err(PoolError::LaneClosed { lane });
        };
        if self.worker.is_none() {
            return Err(PoolError::NotStarted { lane });
        }

        self.completion.add();
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(lane, job = job.sequence(), key = job.key(), "submitting job");

        if jobs.send(job).is_err() {
            // Worker is gone; the job was never accepted.
            self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
            self.completion.done();
            return Err(PoolError::LaneClosed { lane });
        }
        Ok(())
    }

    /// Block until every job handed to this lane has finished.
    pub fn drain(&self) {
        self.completion.wait();
    }

    /// Submitted-but-unfinished jobs
    pub fn outstanding(&self) -> usize {
        self.completion.outstanding()
    }

    /// Current job counters
    pub fn load(&self) -> LaneLoad {
        LaneLoad {
            lane: self.index,
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker and close the handoff queue.
    ///
    /// Fails with [`PoolError::Outstanding`] without touching the lane if
    /// jobs are still in flight. Stopping a stopped lane is a no-op.
    pub fn stop(&mut self) -> Result<(), PoolError> {
        let outstanding = self.completion.outstanding();
        if outstanding > 0 {
            return Err(PoolError::Outstanding {
                lane: self.index,
                outstanding,
            });
        }
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), PoolError> {
        // Signal first and wait for the worker to exit; the handoff queue
        // must outlive the worker's last select.
        drop(self.shutdown.take());
        let joined = match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PoolError::WorkerPanicked { lane: self.index }),
            None => Ok(()),
        };
        drop(self.jobs.take());
        self.pending = None;

        if joined.is_ok() {
            debug!(lane = self.index, "lane stopped");
        }
        joined
    }
}

impl Drop for Lane {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(lane = self.index, error = %e, "lane teardown failed");
        }
    }
}

impl std::fmt::Debug for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lane")
            .field("index", &self.index)
            .field("running", &self.is_running())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

fn pin_worker(lane: usize) {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if let Err(e) = pin_to_cpu(lane % cores) {
        warn!(lane, error = %e, "failed to pin lane worker");
    }
}

/// Worker loop: one job at a time until the shutdown signal fires.
fn run_worker(
    lane: usize,
    pending: Pending,
    sink: &dyn CompletionSink,
    completion: &Completion,
    counters: &Counters,
) {
    let Pending { jobs, shutdown } = pending;

    loop {
        select! {
            recv(jobs) -> msg => match msg {
                Ok(job) => {
                    let _done = DoneGuard(completion);
                    execute(lane, &job, sink, counters);
                }
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }

    debug!(lane, "lane worker exiting");
}

fn execute(lane: usize, job: &Job, sink: &dyn CompletionSink, counters: &Counters) {
    match job.run() {
        Ok(elapsed) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(
                lane,
                job = job.sequence(),
                key = job.key(),
                elapsed_ms = as_millis_f64(elapsed),
                "job finished"
            );
            sink.job_completed(lane, job, elapsed);
        }
        Err(error) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log_failure(lane, job, &error);
            sink.job_failed(lane, job, &error);
        }
    }
}

fn log_failure(lane: usize, job: &Job, error: &JobError) {
    warn!(
        lane,
        job = job.sequence(),
        key = job.key(),
        error = %error,
        "job failed"
    );
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}
