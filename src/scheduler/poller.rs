//! Completion poller: the fan-out/fan-in loop of a batch.
//!
//! The poller submits every job up front, then alternates between a bounded
//! [`TaskExecutor::wait`] and local bookkeeping until nothing is pending.
//! Results are kept in the order the executor reported them ready. A failed
//! unit becomes a `TaskResult` with `error` set; nothing that happens to a
//! single unit stops the loop.
//!
//! There is no per-job deadline here. A unit that never resolves keeps the
//! loop waiting forever unless the executor itself enforces one (see
//! [`WorkerPoolConfig::job_timeout`](super::WorkerPoolConfig)).

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::progress::{completion_percent, ProgressEvent, ProgressReporter};

use super::executor::{TaskExecutor, TaskHandle};
use super::job::{Job, TaskResult};

/// Default bound on a single wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for the completion poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Upper bound on each executor wait.
    pub wait_timeout: Duration,
    /// Extra sleep after every iteration. Off by default; setting it to the
    /// wait timeout reproduces the doubled-delay polling of older
    /// deployments.
    pub idle_delay: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            idle_delay: None,
        }
    }
}

impl PollerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wait timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the extra per-iteration delay.
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = Some(delay);
        self
    }
}

/// Final output of a batch: results in completion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    results: Vec<TaskResult>,
}

impl BatchOutcome {
    pub fn new(results: Vec<TaskResult>) -> Self {
        Self { results }
    }

    /// Results in the order jobs finished.
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TaskResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results whose lookup succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Results whose lookup failed.
    pub fn failed(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Loop-local state; owned by a single `run` call.
struct BatchState {
    total: usize,
    pending: Vec<TaskHandle>,
    jobs: HashMap<TaskHandle, Job>,
    results: Vec<TaskResult>,
    completed: usize,
}

impl BatchState {
    fn new(total: usize) -> Self {
        Self {
            total,
            pending: Vec::with_capacity(total),
            jobs: HashMap::with_capacity(total),
            results: Vec::with_capacity(total),
            completed: 0,
        }
    }

    fn track(&mut self, handle: TaskHandle, job: Job) {
        self.pending.push(handle);
        self.jobs.insert(handle, job);
    }

    /// Takes a handle out of `pending`, returning its job.
    fn take(&mut self, handle: TaskHandle) -> Option<Job> {
        let job = self.jobs.remove(&handle)?;
        self.pending.retain(|h| *h != handle);
        Some(job)
    }

    /// Appends a result and returns the new completed count.
    fn record(&mut self, result: TaskResult) -> usize {
        self.results.push(result);
        self.completed += 1;
        debug_assert_eq!(self.completed, self.results.len());
        debug_assert_eq!(self.pending.len() + self.results.len(), self.total);
        self.completed
    }
}

/// Drives a batch of jobs through a [`TaskExecutor`].
#[derive(Debug, Clone, Default)]
pub struct CompletionPoller {
    config: PollerConfig,
}

impl CompletionPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Submits every job and collects one result per job.
    ///
    /// Progress events for each finished job go to `reporter` when one is
    /// given. Reporter failures are logged and ignored.
    pub async fn run(
        &self,
        executor: &dyn TaskExecutor,
        jobs: Vec<Job>,
        reporter: Option<&dyn ProgressReporter>,
    ) -> BatchOutcome {
        let mut state = BatchState::new(jobs.len());
        for job in jobs {
            let handle = executor.submit(job.clone()).await;
            state.track(handle, job);
        }

        info!(total = state.total, "Submitted batch");

        while !state.pending.is_empty() {
            let outcome = executor
                .wait(&state.pending, 1, self.config.wait_timeout)
                .await;

            if outcome.is_empty() {
                debug!(
                    pending = state.pending.len(),
                    completed = state.completed,
                    "No job finished within wait timeout"
                );
            }

            for handle in outcome.ready {
                let Some(job) = state.take(handle) else {
                    warn!(%handle, "Executor reported a handle that is not pending");
                    continue;
                };

                let result = match executor.get(handle).await {
                    Ok(output) => TaskResult::success(&job, output),
                    Err(e) => TaskResult::failure(&job, e.to_string()),
                };

                let total = state.total;
                let completed = state.record(result);
                let result = &state.results[completed - 1];

                info!(
                    query = %result.query(),
                    completed = completed,
                    total = total,
                    success = result.is_success(),
                    "Job completed ({}/{})",
                    completed,
                    total
                );

                if let Some(reporter) = reporter {
                    report_result(reporter, result, completed, total).await;
                }
            }

            if let Some(delay) = self.config.idle_delay {
                tokio::time::sleep(delay).await;
            }
        }

        info!(
            total = state.total,
            failed = state.results.iter().filter(|r| !r.is_success()).count(),
            "Batch finished"
        );

        BatchOutcome::new(state.results)
    }
}

/// Sends the four events describing one finished job.
async fn report_result(
    reporter: &dyn ProgressReporter,
    result: &TaskResult,
    completed: usize,
    total: usize,
) {
    let body = match (result.output(), result.error()) {
        (_, Some(error)) => ProgressEvent::Error(error.to_string()),
        (Some(output), None) => ProgressEvent::Output(output.to_string()),
        (None, None) => ProgressEvent::Output(String::new()),
    };

    let events = [
        ProgressEvent::Header {
            query: result.query().to_string(),
        },
        ProgressEvent::Progress {
            completed,
            total,
            percent: completion_percent(completed, total),
        },
        body,
        ProgressEvent::Separator,
    ];

    for event in events {
        if let Err(e) = reporter.report(event).await {
            warn!(query = %result.query(), error = %e, "Progress reporter failed");
        }
    }
}
