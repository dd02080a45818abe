//! Transfer engine: a queue drained by one background copy worker.
//!
//! Jobs run strictly one at a time in FIFO order. The worker thread exists only
//! while there is work: the first `enqueue` on an idle engine spawns it and it
//! exits once the queue drains (or a cancel has been unwound).
//!
//! Lock order is `state` → `queue` → `tracker`; the per-chunk progress path
//! only takes `tracker`.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};

use crate::config::EngineConfig;
use crate::control::TransferControl;
use crate::copier::{self, CopyOptions, CopyOutcome};
use crate::events::EventChannels;
use crate::job::{CompletedItem, JobId, JobReport, JobStatus, TransferJob};
use crate::progress::{ProgressSnapshot, ProgressTracker};
use crate::queue::TransferQueue;
use crate::storage::{Locator, StorageError, StorageProvider};

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Paused,
    Cancelling,
}

/// Failure of the engine itself or of a single job.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("copy {source_locator} -> {destination}: {source}")]
    Copy {
        source_locator: Locator,
        destination: Locator,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn copy worker: {0}")]
    WorkerSpawn(#[source] io::Error),
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct Shared {
    provider: Arc<dyn StorageProvider>,
    copy_opts: CopyOptions,
    queue: TransferQueue,
    control: TransferControl,
    tracker: Mutex<ProgressTracker>,
    events: EventChannels,
    state: Mutex<EngineState>,
    worker: Mutex<Option<JoinHandle<()>>>,
    reports: Mutex<Vec<JobReport>>,
    next_id: AtomicU64,
}

/// Handle to a transfer engine. Cheap to clone; all clones drive the same worker.
#[derive(Clone)]
pub struct TransferEngine {
    shared: Arc<Shared>,
}

impl TransferEngine {
    pub fn new(provider: Arc<dyn StorageProvider>, config: &EngineConfig) -> Self {
        let shared = Shared {
            provider,
            copy_opts: CopyOptions::from(config),
            queue: TransferQueue::new(),
            control: TransferControl::new(),
            tracker: Mutex::new(ProgressTracker::new()),
            events: EventChannels::new(config.completed_buffer),
            state: Mutex::new(EngineState::Idle),
            worker: Mutex::new(None),
            reports: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Append `jobs` to the queue and start the worker if the engine is idle.
    /// Returns the ids assigned to the jobs, in order.
    pub fn enqueue(&self, mut jobs: Vec<TransferJob>) -> Result<Vec<JobId>, EngineError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<JobId> = jobs
            .iter_mut()
            .map(|job| {
                job.id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
                job.status = JobStatus::Pending;
                job.id
            })
            .collect();

        let mut state = lock(&self.shared.state);
        let batch_bytes = self.shared.queue.push_batch(jobs);
        match *state {
            EngineState::Idle => {
                let total = self.shared.queue.queued_bytes();
                self.shared.control.reset();
                {
                    let mut tracker = lock(&self.shared.tracker);
                    tracker.start_run(total, Instant::now());
                    self.shared
                        .events
                        .publish_progress(tracker.snapshot(Instant::now(), false));
                }
                let shared = Arc::clone(&self.shared);
                let handle = std::thread::Builder::new()
                    .name("vayu-copy-worker".into())
                    .spawn(move || run_worker(shared))
                    .map_err(|e| {
                        // Leave nothing queued that no worker will ever pick up.
                        for job in self.shared.queue.clear() {
                            record(&self.shared, &job, JobStatus::Failed, Some(e.to_string()));
                        }
                        EngineError::WorkerSpawn(e)
                    })?;
                *lock(&self.shared.worker) = Some(handle);
                *state = EngineState::Running;
                tracing::info!(jobs = ids.len(), total_bytes = total, "transfer run started");
            }
            EngineState::Running | EngineState::Paused => {
                let mut tracker = lock(&self.shared.tracker);
                tracker.extend_total(batch_bytes);
                self.shared
                    .events
                    .publish_progress(tracker.snapshot(Instant::now(), false));
                tracing::debug!(jobs = ids.len(), batch_bytes, "jobs appended to running transfer");
            }
            EngineState::Cancelling => {
                // The worker starts a fresh run for these once the cancel is unwound.
                tracing::debug!(jobs = ids.len(), "jobs queued behind pending cancel");
            }
        }
        Ok(ids)
    }

    /// Stop issuing new chunks until `resume`. No-op unless running.
    pub fn pause(&self) {
        let mut state = lock(&self.shared.state);
        if *state != EngineState::Running {
            tracing::debug!(state = ?*state, "pause ignored");
            return;
        }
        self.shared.control.request_pause();
        let mut tracker = lock(&self.shared.tracker);
        let now = Instant::now();
        tracker.pause(now);
        *state = EngineState::Paused;
        self.shared.events.publish_progress(tracker.snapshot(now, false));
        tracing::info!("transfer paused");
    }

    /// Continue a paused transfer. No-op unless paused.
    pub fn resume(&self) {
        let mut state = lock(&self.shared.state);
        if *state != EngineState::Paused {
            tracing::debug!(state = ?*state, "resume ignored");
            return;
        }
        let mut tracker = lock(&self.shared.tracker);
        let now = Instant::now();
        tracker.resume(now);
        self.shared.control.request_resume();
        *state = EngineState::Running;
        self.shared.events.publish_progress(tracker.snapshot(now, false));
        tracing::info!("transfer resumed");
    }

    /// Drop every queued job and abort the in-flight one after its current
    /// chunk; its partial destination is deleted. No-op when idle.
    pub fn cancel(&self) {
        let mut state = lock(&self.shared.state);
        if !matches!(*state, EngineState::Running | EngineState::Paused) {
            tracing::debug!(state = ?*state, "cancel ignored");
            return;
        }
        self.shared.control.request_cancel();
        let dropped = self.shared.queue.clear();
        for job in &dropped {
            record(&self.shared, job, JobStatus::Cancelled, None);
        }
        *state = EngineState::Cancelling;
        tracing::info!(dropped = dropped.len(), "transfer cancel requested");
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.shared.state)
    }

    /// Jobs still waiting in the queue (excludes the in-flight job).
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn latest_progress(&self) -> ProgressSnapshot {
        self.shared.events.latest_progress()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.shared.events.subscribe_progress()
    }

    pub fn subscribe_completed(&self) -> broadcast::Receiver<CompletedItem> {
        self.shared.events.subscribe_completed()
    }

    /// Terminal records of every job that has finished, in completion order.
    pub fn reports(&self) -> Vec<JobReport> {
        lock(&self.shared.reports).clone()
    }

    /// Block until the worker has exited and the engine is idle.
    pub fn wait_idle(&self) {
        loop {
            let handle = lock(&self.shared.worker).take();
            match handle {
                Some(h) => {
                    if h.join().is_err() {
                        tracing::error!("copy worker panicked");
                        *lock(&self.shared.state) = EngineState::Idle;
                    }
                }
                None if self.state() == EngineState::Idle => return,
                None => std::thread::sleep(Duration::from_millis(10)),
            }
        }
    }
}

fn record(shared: &Shared, job: &TransferJob, status: JobStatus, error: Option<String>) {
    tracing::debug!(job_id = job.id, status = %status, "job report recorded");
    lock(&shared.reports).push(JobReport {
        job_id: job.id,
        display_name: job.display_name.clone(),
        status,
        error,
    });
}

/// Worker body: drain the queue, then go idle.
fn run_worker(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = lock(&shared.state);
            if *state == EngineState::Cancelling {
                finish_cancelled_run(&shared, &mut state);
                if *state == EngineState::Idle {
                    return;
                }
            }
            match shared.queue.pop() {
                Some(job) => job,
                None => {
                    finish_run(&shared);
                    *state = EngineState::Idle;
                    return;
                }
            }
        };
        run_job(&shared, job);
    }
}

/// Queue drained without a cancel: publish the final snapshot.
fn finish_run(shared: &Shared) {
    let mut tracker = lock(&shared.tracker);
    let now = Instant::now();
    tracker.stop(now);
    let snapshot = tracker.snapshot(now, true);
    tracing::info!(
        copied_bytes = snapshot.copied_bytes,
        elapsed_secs = snapshot.active_elapsed_secs,
        "transfer run completed"
    );
    shared.events.publish_progress(snapshot);
}

/// A cancel has been unwound. Start a new run if jobs arrived meanwhile.
fn finish_cancelled_run(shared: &Shared, state: &mut EngineState) {
    {
        let mut tracker = lock(&shared.tracker);
        let now = Instant::now();
        tracker.stop(now);
        let mut snapshot = tracker.snapshot(now, false);
        snapshot.cancelled = true;
        shared.events.publish_progress(snapshot);
    }
    tracing::info!("transfer run cancelled");

    if shared.queue.is_empty() {
        *state = EngineState::Idle;
        return;
    }
    let total = shared.queue.queued_bytes();
    shared.control.reset();
    let mut tracker = lock(&shared.tracker);
    let now = Instant::now();
    tracker.start_run(total, now);
    shared.events.publish_progress(tracker.snapshot(now, false));
    *state = EngineState::Running;
    tracing::info!(total_bytes = total, "transfer run restarted after cancel");
}

fn run_job(shared: &Shared, mut job: TransferJob) {
    job.transition(JobStatus::InProgress);
    lock(&shared.tracker).begin_job(job.size_bytes);
    tracing::info!(
        job_id = job.id,
        name = %job.display_name,
        size = job.size_bytes,
        "copy started"
    );

    let mut destination = None;
    let result = copy_job(shared, &job, &mut destination);

    match result {
        Ok(CopyOutcome::Completed(written)) => {
            job.transition(JobStatus::Completed);
            if written != job.size_bytes {
                tracing::debug!(
                    job_id = job.id,
                    written,
                    declared = job.size_bytes,
                    "copied size differs from declared size"
                );
            }
            {
                let mut tracker = lock(&shared.tracker);
                tracker.finish_job();
                shared
                    .events
                    .publish_progress(tracker.snapshot(Instant::now(), false));
            }
            record(shared, &job, JobStatus::Completed, None);
            if let Some(destination) = destination {
                shared.events.publish_completed(CompletedItem {
                    job_id: job.id,
                    display_name: job.display_name.clone(),
                    source: job.source.clone(),
                    destination,
                    size_bytes: job.size_bytes,
                });
            }
            tracing::info!(job_id = job.id, "copy completed");
        }
        Ok(CopyOutcome::Cancelled(written)) => {
            remove_partial(shared, &job, destination.as_ref());
            job.transition(JobStatus::Cancelled);
            record(shared, &job, JobStatus::Cancelled, None);
            tracing::info!(job_id = job.id, written, "copy cancelled, partial removed");
        }
        Err(err) => {
            remove_partial(shared, &job, destination.as_ref());
            job.transition(JobStatus::Failed);
            {
                let mut tracker = lock(&shared.tracker);
                tracker.fail_job();
                shared
                    .events
                    .publish_progress(tracker.snapshot(Instant::now(), false));
            }
            tracing::warn!(job_id = job.id, name = %job.display_name, "copy failed: {}", err);
            record(shared, &job, JobStatus::Failed, Some(err.to_string()));
        }
    }
}

/// Open both ends and stream the bytes. `destination` is set as soon as the
/// destination item exists so the caller can clean it up.
fn copy_job(
    shared: &Shared,
    job: &TransferJob,
    destination: &mut Option<Locator>,
) -> Result<CopyOutcome, EngineError> {
    if shared.control.is_cancelled() {
        return Ok(CopyOutcome::Cancelled(0));
    }
    let provider = &shared.provider;
    let mut reader = provider.open_read_stream(&job.source)?;
    let dest = provider.create_child_document(
        &job.destination_folder,
        &job.media_type,
        &job.display_name,
    )?;
    *destination = Some(dest.clone());
    let mut writer = provider.open_write_stream(&dest)?;

    let control = &shared.control;
    copier::copy_stream(
        &mut reader,
        &mut writer,
        shared.copy_opts,
        || control.is_paused(),
        || control.is_cancelled(),
        |bytes| {
            let mut tracker = lock(&shared.tracker);
            tracker.job_progress(bytes);
            shared
                .events
                .publish_progress(tracker.snapshot(Instant::now(), false));
        },
    )
    .map_err(|source| EngineError::Copy {
        source_locator: job.source.clone(),
        destination: dest,
        source,
    })
}

fn remove_partial(shared: &Shared, job: &TransferJob, destination: Option<&Locator>) {
    let Some(dest) = destination else {
        return;
    };
    if let Err(e) = shared.provider.delete_document(dest) {
        tracing::warn!(job_id = job.id, "could not remove partial {}: {}", dest, e);
    }
}
