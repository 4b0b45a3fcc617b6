//! Sharded Lane Dispatcher
//!
//! Owns a fixed set of [`Lane`]s and routes each job to exactly one of them
//! by hashing its routing key. Jobs sharing a key always land on the same
//! lane and therefore never run concurrently with each other; jobs on
//! different lanes never wait on one another.
//!
//! ```text
//!   producers ──submit──► route(key) ──► lane[fnv1a(key) % N] ──► sink
//! ```
//!
//! Teardown is two-step: [`Dispatcher::drain`] waits for every lane to go
//! idle, then [`Dispatcher::shutdown`] stops the lanes. Shutting down with
//! work still in flight is reported as [`PoolError::Outstanding`].

use crate::error::PoolError;
use crate::job::{CompletionSink, Job};
use crate::lane::{Lane, LaneLoad, LaneOptions};
use crate::route::lane_index;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed pool of lanes with consistent key routing
#[derive(Debug)]
pub struct Dispatcher {
    lanes: Vec<Lane>,
}

impl Dispatcher {
    /// Create `concurrency` lanes and start their workers.
    ///
    /// A concurrency of 0 is clamped to 1.
    pub fn new(concurrency: usize, sink: Arc<dyn CompletionSink>) -> Result<Self, PoolError> {
        Self::with_options(concurrency, sink, LaneOptions::default())
    }

    /// Like [`Dispatcher::new`], applying `options` to every lane.
    pub fn with_options(
        concurrency: usize,
        sink: Arc<dyn CompletionSink>,
        options: LaneOptions,
    ) -> Result<Self, PoolError> {
        let concurrency = if concurrency == 0 {
            warn!("concurrency must be at least 1 (got 0), using 1");
            1
        } else {
            concurrency
        };

        let mut lanes: Vec<Lane> = (0..concurrency).map(Lane::new).collect();
        // Already-started lanes are torn down by Drop if a later one fails.
        for lane in &mut lanes {
            lane.start(Arc::clone(&sink), options)?;
        }

        info!(lanes = concurrency, pinned = options.pin_workers, "dispatcher started");
        Ok(Self { lanes })
    }

    /// Number of lanes
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Index of the lane `key` routes to
    pub fn lane_index(&self, key: &str) -> usize {
        lane_index(key, self.lanes.len())
    }

    /// Lane `key` routes to
    pub fn route(&self, key: &str) -> &Lane {
        &self.lanes[self.lane_index(key)]
    }

    /// Route `job` by its key and hand it to that lane.
    ///
    /// Blocks while the target lane's worker is busy with an earlier job.
    /// Returns the lane index the job ran on.
    pub fn submit(&self, job: Job) -> Result<usize, PoolError> {
        let index = self.lane_index(job.key());
        self.lanes[index].enqueue(job)?;
        Ok(index)
    }

    /// Block until every lane has finished every job handed to it.
    ///
    /// Producers must stop submitting before calling this; jobs submitted
    /// concurrently may or may not be waited for.
    pub fn drain(&self) {
        for lane in &self.lanes {
            lane.drain();
        }
    }

    /// Submitted-but-unfinished jobs across all lanes
    pub fn outstanding(&self) -> usize {
        self.lanes.iter().map(Lane::outstanding).sum()
    }

    /// Per-lane job counters
    pub fn lane_loads(&self) -> Vec<LaneLoad> {
        self.lanes.iter().map(Lane::load).collect()
    }

    /// Stop every lane.
    ///
    /// Checks all lanes first: if any still has work in flight, returns
    /// [`PoolError::Outstanding`] and leaves the whole pool running. Then
    /// stops lanes one by one, each signalled and joined before its handoff
    /// queue closes. A second call is a no-op.
    pub fn shutdown(&mut self) -> Result<(), PoolError> {
        if let Some(lane) = self.lanes.iter().find(|lane| lane.outstanding() > 0) {
            return Err(PoolError::Outstanding {
                lane: lane.index(),
                outstanding: lane.outstanding(),
            });
        }

        let was_running = self.lanes.iter().any(Lane::is_running);
        for lane in &mut self.lanes {
            lane.stop()?;
        }
        if was_running {
            info!(lanes = self.lanes.len(), "dispatcher stopped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::job::{NullSink, work_fn};
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        completed: Mutex<Vec<(usize, u64)>>,
    }

    impl CompletionSink for Recorder {
        fn job_completed(&self, lane: usize, job: &Job, _elapsed: Duration) {
            self.completed.lock().push((lane, job.sequence()));
        }

        fn job_failed(&self, _lane: usize, _job: &Job, _error: &JobError) {}
    }

    fn quick_job(sequence: u64, key: &str) -> Job {
        Job::new(sequence, key, Vec::new(), work_fn(|_| Ok(Duration::ZERO)))
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        let mut dispatcher = Dispatcher::new(0, Arc::new(NullSink)).unwrap();
        assert_eq!(dispatcher.lane_count(), 1);
        dispatcher.shutdown().unwrap();
    }

    #[test]
    fn test_route_is_deterministic() {
        let mut dispatcher = Dispatcher::new(7, Arc::new(NullSink)).unwrap();
        for host in 0..100 {
            let key = format!("host_{:06}", host);
            let index = dispatcher.lane_index(&key);
            assert!(index < 7);
            assert_eq!(dispatcher.route(&key).index(), index);
            assert_eq!(dispatcher.lane_index(&key), lane_index(&key, 7));
        }
        dispatcher.shutdown().unwrap();
    }

    #[test]
    fn test_submit_reports_routed_lane() {
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher = Dispatcher::new(4, recorder.clone()).unwrap();

        let mut expected = Vec::new();
        for seq in 0..40 {
            let key = format!("host_{:06}", seq % 9);
            let lane = dispatcher.submit(quick_job(seq, &key)).unwrap();
            assert_eq!(lane, dispatcher.lane_index(&key));
            expected.push((lane, seq));
        }
        dispatcher.drain();

        let mut completed = recorder.completed.lock().clone();
        completed.sort_by_key(|&(_, seq)| seq);
        assert_eq!(completed, expected);

        let loads = dispatcher.lane_loads();
        assert_eq!(loads.iter().map(|l| l.submitted).sum::<u64>(), 40);
        assert_eq!(loads.iter().map(|l| l.completed).sum::<u64>(), 40);
        dispatcher.shutdown().unwrap();
    }

    #[test]
    fn test_slow_lane_does_not_block_other_lanes() {
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher = Dispatcher::new(2, recorder.clone()).unwrap();

        // Find one key per lane.
        let slow_key = (0..)
            .map(|i| format!("host_{:06}", i))
            .find(|k| dispatcher.lane_index(k) == 0)
            .unwrap();
        let fast_key = (0..)
            .map(|i| format!("host_{:06}", i))
            .find(|k| dispatcher.lane_index(k) == 1)
            .unwrap();

        dispatcher
            .submit(Job::new(
                0,
                slow_key,
                Vec::new(),
                work_fn(|_| {
                    std::thread::sleep(Duration::from_millis(500));
                    Ok(Duration::from_millis(500))
                }),
            ))
            .unwrap();

        let start = Instant::now();
        dispatcher.submit(quick_job(1, &fast_key)).unwrap();
        dispatcher.route(&fast_key).drain();
        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(recorder.completed.lock().as_slice(), &[(1, 1)]);

        dispatcher.drain();
        dispatcher.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_before_drain_is_rejected() {
        let mut dispatcher = Dispatcher::new(1, Arc::new(NullSink)).unwrap();
        dispatcher
            .submit(Job::new(
                0,
                "host_000001",
                Vec::new(),
                work_fn(|_| {
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(Duration::from_millis(200))
                }),
            ))
            .unwrap();

        let err = dispatcher.shutdown().unwrap_err();
        assert!(matches!(err, PoolError::Outstanding { lane: 0, .. }));

        dispatcher.drain();
        assert_eq!(dispatcher.outstanding(), 0);
        dispatcher.shutdown().unwrap();
        dispatcher.shutdown().unwrap();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut dispatcher = Dispatcher::new(2, Arc::new(NullSink)).unwrap();
        dispatcher.shutdown().unwrap();
        let err = dispatcher.submit(quick_job(0, "host_000000")).unwrap_err();
        assert!(matches!(err, PoolError::LaneClosed { .. }));
    }
}
