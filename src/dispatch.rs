//! Frame dispatch loop.
//!
//! One driver runs at a fixed cadence, reading frames from the playlist
//! and submitting them to a bounded worker pool. Admission control is a
//! single in-flight flag: while a frame is mid-processing, new ticks are
//! dropped outright (drop-latest backpressure — under overload the
//! effective frame rate degrades instead of latency or memory growing).
//!
//! Results arrive in completion order and are consumed only on the driver
//! (`poll_deliver`), which serializes all downstream state mutation. Every
//! job carries the source epoch at submission; the epoch is bumped on each
//! playlist advance and results from a stale epoch are discarded at
//! delivery.

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::{ClassMap, DispatchSettings, PoseSettings};
use crate::detect::{self, CascadeOutput, ObjectDetector, PoseEstimator};
use crate::frame::Frame;
use crate::source::{Playlist, PlaylistRead};

/// Immutable configuration snapshot passed into each cascade invocation.
///
/// Reconfiguration swaps the snapshot reference; it never mutates fields
/// an in-flight worker might be reading.
#[derive(Clone, Debug)]
pub struct PipelineSnapshot {
    pub classes: ClassMap,
    pub pose: PoseSettings,
}

/// Swappable handle to the current snapshot, shared with the workers.
#[derive(Clone)]
pub struct SharedSnapshot(Arc<Mutex<Arc<PipelineSnapshot>>>);

impl SharedSnapshot {
    pub fn new(snapshot: PipelineSnapshot) -> Self {
        Self(Arc::new(Mutex::new(Arc::new(snapshot))))
    }

    /// Current snapshot reference. Lock poisoning cannot corrupt an
    /// immutable Arc swap, so a poisoned lock is recovered.
    pub fn load(&self) -> Arc<PipelineSnapshot> {
        match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Publish a new snapshot. In-flight workers keep the one they loaded.
    pub fn store(&self, snapshot: PipelineSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.0.lock() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/// One processed frame, delivered back to the driver.
pub struct FrameResult {
    /// Source epoch at submission time.
    pub epoch: u64,
    pub frame: Frame,
    pub output: CascadeOutput,
    /// Model failure absorbed at the worker boundary; output is empty.
    pub error: Option<String>,
}

struct Job {
    epoch: u64,
    frame: Frame,
}

/// Consumer of delivered results. Delivery is serialized: at most one
/// `deliver` call runs at a time, always on the driver.
pub trait ResultSink {
    fn deliver(&mut self, result: FrameResult);
}

impl<F: FnMut(FrameResult)> ResultSink for F {
    fn deliver(&mut self, result: FrameResult) {
        self(result)
    }
}

/// What one admission tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// A frame was submitted to the pool.
    Submitted,
    /// A frame is still mid-processing; this tick was dropped.
    Busy,
    /// The current source was exhausted; the playlist advanced and the
    /// epoch was bumped. No frame this tick.
    Advanced,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DispatchStats {
    pub submitted: u64,
    pub dropped_busy: u64,
    pub advanced: u64,
    pub delivered: u64,
    pub stale_discarded: u64,
}

// ----------------------------------------------------------------------------
// Worker pool
// ----------------------------------------------------------------------------

struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    result_rx: Receiver<FrameResult>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn spawn(
        workers: usize,
        detector: Arc<Mutex<Box<dyn ObjectDetector>>>,
        estimator: Option<Arc<Mutex<Box<dyn PoseEstimator>>>>,
        snapshot: SharedSnapshot,
        in_flight: Arc<AtomicBool>,
    ) -> Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<FrameResult>();

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let detector = detector.clone();
            let estimator = estimator.clone();
            let snapshot = snapshot.clone();
            let in_flight = in_flight.clone();
            let handle = std::thread::Builder::new()
                .name(format!("cascade-{}", worker_id))
                .spawn(move || {
                    for job in job_rx.iter() {
                        let result = run_job(job, &detector, &estimator, &snapshot);
                        // Completion releases the admission slot whether or
                        // not the result is ever consumed.
                        let _ = result_tx.send(result);
                        in_flight.store(false, Ordering::Release);
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            job_tx: Some(job_tx),
            result_rx,
            handles,
        })
    }

    fn submit(&self, job: Job) -> Result<()> {
        self.job_tx
            .as_ref()
            .ok_or_else(|| anyhow!("worker pool is shut down"))?
            .send(job)
            .map_err(|_| anyhow!("worker pool is gone"))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channel lets the workers drain and exit.
        self.job_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn run_job(
    job: Job,
    detector: &Arc<Mutex<Box<dyn ObjectDetector>>>,
    estimator: &Option<Arc<Mutex<Box<dyn PoseEstimator>>>>,
    snapshot: &SharedSnapshot,
) -> FrameResult {
    let snapshot = snapshot.load();
    let outcome = (|| -> Result<CascadeOutput> {
        let mut detector = detector
            .lock()
            .map_err(|_| anyhow!("detector lock poisoned"))?;
        let mut estimator_guard = match estimator {
            Some(est) => Some(est.lock().map_err(|_| anyhow!("estimator lock poisoned"))?),
            None => None,
        };
        let estimator_ref = estimator_guard
            .as_deref_mut()
            .map(|boxed| &mut **boxed as &mut dyn PoseEstimator);
        detect::process(
            &job.frame,
            &mut **detector,
            estimator_ref,
            &snapshot.classes,
            &snapshot.pose,
        )
    })();

    match outcome {
        Ok(output) => FrameResult {
            epoch: job.epoch,
            frame: job.frame,
            output,
            error: None,
        },
        Err(e) => FrameResult {
            epoch: job.epoch,
            frame: job.frame,
            output: CascadeOutput::default(),
            error: Some(e.to_string()),
        },
    }
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

pub struct Dispatcher {
    playlist: Playlist,
    settings: DispatchSettings,
    pool: WorkerPool,
    in_flight: Arc<AtomicBool>,
    snapshot: SharedSnapshot,
    epoch: u64,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(
        playlist: Playlist,
        settings: DispatchSettings,
        detector: Box<dyn ObjectDetector>,
        estimator: Option<Box<dyn PoseEstimator>>,
        snapshot: PipelineSnapshot,
    ) -> Result<Self> {
        let in_flight = Arc::new(AtomicBool::new(false));
        let snapshot = SharedSnapshot::new(snapshot);
        let pool = WorkerPool::spawn(
            settings.workers.max(1),
            Arc::new(Mutex::new(detector)),
            estimator.map(|est| Arc::new(Mutex::new(est))),
            snapshot.clone(),
            in_flight.clone(),
        )?;
        Ok(Self {
            playlist,
            settings,
            pool,
            in_flight,
            snapshot,
            epoch: 0,
            stats: DispatchStats::default(),
        })
    }

    /// Handle for publishing configuration snapshots.
    pub fn snapshot_handle(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// One admission tick: drop when busy, otherwise read and submit.
    pub fn tick(&mut self) -> Result<Tick> {
        if self.in_flight.load(Ordering::Acquire) {
            self.stats.dropped_busy += 1;
            log::debug!("tick dropped: frame in flight");
            return Ok(Tick::Busy);
        }

        match self.playlist.next_frame()? {
            PlaylistRead::Advanced { from, to } => {
                self.epoch += 1;
                self.stats.advanced += 1;
                log::info!("source switch {} -> {}, epoch {}", from, to, self.epoch);
                Ok(Tick::Advanced)
            }
            PlaylistRead::Frame(frame) => {
                self.in_flight.store(true, Ordering::Release);
                if let Err(e) = self.pool.submit(Job {
                    epoch: self.epoch,
                    frame,
                }) {
                    self.in_flight.store(false, Ordering::Release);
                    return Err(e);
                }
                self.stats.submitted += 1;
                Ok(Tick::Submitted)
            }
        }
    }

    /// Drain completed results, delivering current-epoch ones to the sink.
    /// Runs on the driver only; this is the serialization point for all
    /// downstream state.
    pub fn poll_deliver(&mut self, sink: &mut dyn ResultSink) -> usize {
        let mut delivered = 0;
        loop {
            match self.pool.result_rx.try_recv() {
                Ok(result) => {
                    if result.epoch != self.epoch {
                        self.stats.stale_discarded += 1;
                        log::debug!(
                            "discarding stale result (epoch {} != {})",
                            result.epoch,
                            self.epoch
                        );
                        continue;
                    }
                    if let Some(err) = &result.error {
                        log::warn!("cascade failed, empty frame result: {}", err);
                    }
                    sink.deliver(result);
                    self.stats.delivered += 1;
                    delivered += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }

    /// Cadence loop: deliver pending results, then run one admission tick,
    /// then sleep out the remainder of the period. Runs until `stop`.
    pub fn run(&mut self, sink: &mut dyn ResultSink, stop: &AtomicBool) -> Result<()> {
        let period = Duration::from_secs_f64(1.0 / self.settings.tick_hz.max(1) as f64);
        let mut last_health = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            let started = Instant::now();

            self.poll_deliver(sink);
            if let Err(e) = self.tick() {
                // Source trouble is diagnosed and retried next tick, the
                // loop itself never stalls.
                log::warn!("tick failed: {}", e);
            }

            if last_health.elapsed() >= Duration::from_secs(5) {
                let s = self.stats;
                log::debug!(
                    "dispatch: submitted={} dropped={} advanced={} delivered={} stale={} source={}",
                    s.submitted,
                    s.dropped_busy,
                    s.advanced,
                    s.delivered,
                    s.stale_discarded,
                    self.playlist.current_name()
                );
                last_health = Instant::now();
            }

            if let Some(rest) = period.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        // Final drain so the sink sees everything completed before stop.
        self.poll_deliver(sink);
        Ok(())
    }
}
