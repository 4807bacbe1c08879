//! Tokio-backed worker pool implementing [`TaskExecutor`].
//!
//! Each submitted job runs as its own tokio task. Completions are announced
//! on a `watch` channel so [`TaskExecutor::wait`] can sleep until something
//! finishes without missing a wake-up.
//!
//! # Features
//!
//! - Unbounded fan-out by default; optional cap on concurrently running units
//! - Optional per-unit deadline
//! - Panics inside a unit surface as [`ExecutorError::Panicked`]
//! - Pool statistics tracking

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ExecutorError;
use crate::lookup::{Lookup, LookupOutput};

use super::executor::{TaskExecutor, TaskHandle, WaitOutcome};
use super::job::Job;

/// Configuration for the worker pool.
///
/// Both limits are off by default, matching the fire-everything-at-once
/// behaviour of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Maximum number of units running at once. `None` means unbounded.
    pub max_concurrent: Option<usize>,
    /// Maximum time allowed for a single unit. `None` means no deadline.
    pub job_timeout: Option<Duration>,
}

impl WorkerPoolConfig {
    /// Creates an unbounded configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of concurrently running units.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = Some(max);
        self
    }

    /// Sets a per-unit deadline.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Units submitted so far.
    pub submitted: u64,
    /// Units that have finished, successfully or not.
    pub finished: u64,
    /// Finished units that failed.
    pub failed: u64,
    /// Average duration of finished units.
    pub average_job_duration: Duration,
}

impl PoolStats {
    /// Units submitted but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.finished)
    }

    /// Finished units that succeeded.
    pub fn succeeded(&self) -> u64 {
        self.finished.saturating_sub(self.failed)
    }

    /// Returns the success rate as a percentage of finished units.
    pub fn success_rate(&self) -> f64 {
        if self.finished == 0 {
            return 0.0;
        }
        (self.succeeded() as f64 / self.finished as f64) * 100.0
    }
}

/// Shared state for tracking pool statistics.
struct SharedPoolStats {
    submitted: AtomicU64,
    finished: AtomicU64,
    failed: AtomicU64,
    total_duration_ms: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            finished: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
        }
    }

    fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    fn record_finish(&self, duration: Duration) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn to_pool_stats(&self) -> PoolStats {
        let finished = self.finished.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);

        let average_job_duration = if finished > 0 {
            Duration::from_millis(total_duration_ms / finished)
        } else {
            Duration::ZERO
        };

        PoolStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            finished,
            failed: self.failed.load(Ordering::SeqCst),
            average_job_duration,
        }
    }
}

/// One submitted unit.
struct TaskSlot {
    join: JoinHandle<Result<LookupOutput, ExecutorError>>,
    /// Completion sequence number; zero while still running.
    finished_seq: Arc<AtomicU64>,
}

/// Marks a unit finished when dropped, including while unwinding a panic.
struct CompletionGuard {
    finished_seq: Arc<AtomicU64>,
    sequence: Arc<AtomicU64>,
    completions: Arc<watch::Sender<u64>>,
    stats: Arc<SharedPoolStats>,
    started: Instant,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.finished_seq.store(seq, Ordering::SeqCst);
        self.stats.record_finish(self.started.elapsed());
        self.completions.send_modify(|count| *count += 1);
    }
}

/// Worker pool that runs every submitted job as an independent tokio task.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    lookup: Arc<dyn Lookup>,
    tasks: Mutex<HashMap<TaskHandle, TaskSlot>>,
    completions: Arc<watch::Sender<u64>>,
    sequence: Arc<AtomicU64>,
    permits: Option<Arc<Semaphore>>,
    stats: Arc<SharedPoolStats>,
}

impl WorkerPool {
    /// Creates a pool running `lookup` for every submitted job.
    ///
    /// Must be used from within a tokio runtime.
    pub fn new(config: WorkerPoolConfig, lookup: Arc<dyn Lookup>) -> Self {
        let (completions, _) = watch::channel(0u64);
        let permits = config
            .max_concurrent
            .map(|max| Arc::new(Semaphore::new(max.max(1))));

        Self {
            config,
            lookup,
            tasks: Mutex::new(HashMap::new()),
            completions: Arc::new(completions),
            sequence: Arc::new(AtomicU64::new(0)),
            permits,
            stats: Arc::new(SharedPoolStats::new()),
        }
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.to_pool_stats()
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Number of handles submitted but not yet fetched.
    pub fn outstanding(&self) -> usize {
        self.lock_tasks().len()
    }

    fn lock_tasks(&self) -> MutexGuard<'_, HashMap<TaskHandle, TaskSlot>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Splits `handles` into finished and running, finished ones ordered by
    /// completion. Handles the pool does not know are reported ready so the
    /// following `get` can fail them.
    fn partition(&self, handles: &[TaskHandle]) -> WaitOutcome {
        let tasks = self.lock_tasks();
        let mut ready = Vec::new();
        let mut pending = Vec::new();

        for handle in handles {
            match tasks.get(handle) {
                None => ready.push((0, *handle)),
                Some(slot) => match slot.finished_seq.load(Ordering::SeqCst) {
                    0 => pending.push(*handle),
                    seq => ready.push((seq, *handle)),
                },
            }
        }

        ready.sort_by_key(|(seq, _)| *seq);
        WaitOutcome {
            ready: ready.into_iter().map(|(_, handle)| handle).collect(),
            pending,
        }
    }
}

async fn run_unit(
    lookup: &dyn Lookup,
    job: &Job,
    job_timeout: Option<Duration>,
) -> Result<LookupOutput, ExecutorError> {
    match job_timeout {
        Some(limit) => match tokio::time::timeout(limit, lookup.run(job)).await {
            Ok(result) => result.map_err(ExecutorError::from),
            Err(_) => Err(ExecutorError::DeadlineExceeded { limit }),
        },
        None => lookup.run(job).await.map_err(ExecutorError::from),
    }
}

fn join_error(err: JoinError) -> ExecutorError {
    if err.is_cancelled() {
        return ExecutorError::Cancelled;
    }
    let payload = err.into_panic();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    ExecutorError::Panicked(message)
}

#[async_trait]
impl TaskExecutor for WorkerPool {
    async fn submit(&self, job: Job) -> TaskHandle {
        let handle = TaskHandle::new();
        let finished_seq = Arc::new(AtomicU64::new(0));

        let guard = CompletionGuard {
            finished_seq: Arc::clone(&finished_seq),
            sequence: Arc::clone(&self.sequence),
            completions: Arc::clone(&self.completions),
            stats: Arc::clone(&self.stats),
            started: Instant::now(),
        };
        let lookup = Arc::clone(&self.lookup);
        let permits = self.permits.clone();
        let job_timeout = self.config.job_timeout;
        let stats = Arc::clone(&self.stats);

        debug!(%handle, query = %job.query(), "Submitting job");

        let join = tokio::spawn(async move {
            let mut guard = guard;
            let _permit = match permits {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            // Queue time behind the concurrency cap is not job time.
            guard.started = Instant::now();

            let result = run_unit(lookup.as_ref(), &job, job_timeout).await;
            if let Err(ref e) = result {
                stats.record_failure();
                warn!(query = %job.query(), error = %e, "Job failed");
            }
            result
        });

        self.stats.record_submit();
        self.lock_tasks()
            .insert(handle, TaskSlot { join, finished_seq });
        handle
    }

    async fn wait(
        &self,
        handles: &[TaskHandle],
        min_ready: usize,
        timeout: Duration,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let min_ready = min_ready.min(handles.len());
        let mut completions = self.completions.subscribe();

        loop {
            // Mark the current value seen before checking, so a completion
            // landing after the check still wakes `changed()`.
            completions.borrow_and_update();
            let outcome = self.partition(handles);
            if outcome.ready.len() >= min_ready {
                return outcome;
            }

            match tokio::time::timeout_at(deadline, completions.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => return self.partition(handles),
            }
        }
    }

    async fn get(&self, handle: TaskHandle) -> Result<LookupOutput, ExecutorError> {
        let slot = self
            .lock_tasks()
            .remove(&handle)
            .ok_or(ExecutorError::UnknownHandle(handle))?;

        match slot.join.await {
            Ok(result) => result,
            Err(e) => {
                self.stats.record_failure();
                Err(join_error(e))
            }
        }
    }
}
