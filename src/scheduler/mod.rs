//! Fan-out/fan-in execution of news lookups.
//!
//! This module provides the pieces that run one batch:
//!
//! - **Job**: One query plus the date range, built from the raw inputs
//! - **TaskExecutor**: The submit / wait / get contract of a worker pool
//! - **WorkerPool**: In-process executor running each job on a tokio task
//! - **CompletionPoller**: Submits every job and collects results as they finish
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │ BatchRequest │
//!                      │ (CLI / file) │
//!                      └──────┬───────┘
//!                             │ build_jobs
//!                      ┌──────▼───────┐
//!                      │  Completion  │──── ProgressEvent ───▶ reporter
//!                      │    Poller    │
//!                      └──────┬───────┘
//!                             │ submit / wait / get
//!         ┌───────────────────┼───────────────────┐
//!         │                   │                   │
//!         ▼                   ▼                   ▼
//!    ┌─────────┐         ┌─────────┐         ┌─────────┐
//!    │ Lookup 1│         │ Lookup 2│         │ Lookup N│
//!    └─────────┘         └─────────┘         └─────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use company_news::scheduler::{BatchRequest, CompletionPoller, WorkerPool, WorkerPoolConfig};
//! use company_news::lookup::NewsLookup;
//! use company_news::llm::OpenAiClient;
//! use std::sync::Arc;
//!
//! let client = Arc::new(OpenAiClient::from_env()?);
//! let pool = WorkerPool::new(WorkerPoolConfig::new(), Arc::new(NewsLookup::new(client)));
//!
//! let jobs = BatchRequest::new(["Acme Corp", "Globex"], "2024-01-01", "2024-01-31")
//!     .into_jobs()?;
//! let outcome = CompletionPoller::default().run(&pool, jobs, None).await;
//!
//! for result in outcome.results() {
//!     println!("{}: {:?}", result.query(), result.output());
//! }
//! ```
//!
//! # Failure Semantics
//!
//! - **Isolation**: A failed or panicking lookup becomes a result with `error` set
//! - **No early exit**: The loop ends only when every job has a result
//! - **Completion order**: Results are appended in the order jobs finish

pub mod executor;
pub mod job;
pub mod poller;
pub mod worker_pool;

// Re-export main types for convenience
pub use executor::{TaskExecutor, TaskHandle, WaitOutcome};
pub use job::{build_jobs, parse_date, BatchRequest, Job, TaskResult, DATE_FORMAT};
pub use poller::{BatchOutcome, CompletionPoller, PollerConfig, DEFAULT_WAIT_TIMEOUT};
pub use worker_pool::{PoolStats, WorkerPool, WorkerPoolConfig};
