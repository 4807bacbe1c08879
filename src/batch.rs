//! Entry points for running a whole batch.
//!
//! [`run_batch`] validates a [`BatchRequest`] and drives it through any
//! executor. [`NewsSearch`] bundles a worker pool, the news lookup and the
//! poller settings for callers that just want results.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::NewsConfig;
use crate::error::BatchError;
use crate::llm::LlmProvider;
use crate::lookup::NewsLookup;
use crate::progress::ProgressReporter;
use crate::scheduler::{
    BatchOutcome, BatchRequest, CompletionPoller, PollerConfig, PoolStats, TaskExecutor,
    WorkerPool,
};

/// Validates `request` and runs every job through `executor`.
///
/// Validation happens before anything is submitted: an invalid request
/// returns `BatchError::Inputs` and the executor is never called.
pub async fn run_batch(
    request: BatchRequest,
    executor: &dyn TaskExecutor,
    reporter: Option<&dyn ProgressReporter>,
    config: &PollerConfig,
) -> Result<BatchOutcome, BatchError> {
    let jobs = request.into_jobs().map_err(|e| {
        warn!(error = %e, "Rejected batch request");
        e
    })?;

    info!(jobs = jobs.len(), "Starting news batch");

    let poller = CompletionPoller::new(config.clone());
    Ok(poller.run(executor, jobs, reporter).await)
}

/// A ready-to-use news search service.
pub struct NewsSearch {
    pool: WorkerPool,
    poller: PollerConfig,
    model: String,
}

impl NewsSearch {
    /// Creates a search backed by `provider`, with pool and poller settings
    /// taken from `config`.
    pub fn new(config: &NewsConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let lookup = NewsLookup::new(provider).with_model(config.model.clone());
        let model = lookup.model().to_string();
        Self {
            pool: WorkerPool::new(config.pool_config(), Arc::new(lookup)),
            poller: config.poller_config(),
            model,
        }
    }

    /// Model sent with every lookup.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Statistics of the underlying pool.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Runs one batch.
    pub async fn search(
        &self,
        request: BatchRequest,
        reporter: Option<&dyn ProgressReporter>,
    ) -> Result<BatchOutcome, BatchError> {
        run_batch(request, &self.pool, reporter, &self.poller).await
    }
}
