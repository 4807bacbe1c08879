//! Executor contract the completion poller depends on.
//!
//! Any worker pool, async task pool or remote job-queue client that can
//! submit work, report which handles are finished, and hand back a finished
//! outcome can drive a batch.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::lookup::LookupOutput;

use super::job::Job;

/// Opaque reference to one submitted unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(Uuid);

impl TaskHandle {
    /// Creates a fresh, never-before-seen handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Result of one [`TaskExecutor::wait`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Handles whose outcome can be fetched without further waiting.
    pub ready: Vec<TaskHandle>,
    /// The remaining handles from the request.
    pub pending: Vec<TaskHandle>,
}

impl WaitOutcome {
    /// Whether the wait timed out with nothing ready.
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

/// A pool that runs jobs with independent latency.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Starts work for `job` and returns immediately.
    async fn submit(&self, job: Job) -> TaskHandle;

    /// Waits until at least `min_ready` of `handles` are finished or
    /// `timeout` elapses, whichever comes first.
    ///
    /// `ready` and `pending` partition `handles`. Must not block past
    /// `timeout`.
    async fn wait(&self, handles: &[TaskHandle], min_ready: usize, timeout: Duration)
        -> WaitOutcome;

    /// Takes the outcome of a handle, waiting for it if necessary.
    ///
    /// A failure inside the unit comes back as `Err`, never as a panic. The
    /// handle is forgotten afterwards.
    async fn get(&self, handle: TaskHandle) -> Result<LookupOutput, ExecutorError>;
}
