//! company-news: concurrent company news search with a web-search LLM.
//!
//! This library turns a list of company names and a date range into one
//! lookup per company, runs them concurrently and collects the results in
//! the order they finish.

// Core modules
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod lookup;
pub mod progress;
pub mod prompts;
pub mod scheduler;

// Re-export commonly used types
pub use batch::{run_batch, NewsSearch};
pub use config::{ConfigError, NewsConfig};
pub use error::{
    BatchError, ExecutorError, FieldError, InputsError, LlmError, LookupError, ReporterError,
};
pub use lookup::{Lookup, LookupOutput, NewsLookup};
pub use progress::{
    ChannelReporter, MarkdownReporter, ProgressEvent, ProgressReporter, TracingReporter,
};
pub use scheduler::{
    BatchOutcome, BatchRequest, CompletionPoller, Job, PollerConfig, TaskExecutor, TaskHandle,
    TaskResult, WorkerPool, WorkerPoolConfig,
};
