//! The unit of work run for each job.
//!
//! A [`Lookup`] turns one job into output text. The worker pool treats it as
//! opaque: it only awaits the future and records whether it failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::error::LookupError;
use crate::llm::{GenerationRequest, LlmProvider, Tool};
use crate::prompts::build_job_prompt;
use crate::scheduler::Job;

/// Successful outcome of one lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutput {
    /// Text returned by the model.
    pub output: String,
    /// Model that produced it.
    pub model: String,
    /// Wall-clock duration of the call.
    pub runtime: Duration,
}

/// A unit of work that can be run for a job.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn run(&self, job: &Job) -> Result<LookupOutput, LookupError>;
}

/// Searches for news about a company with a web-search-enabled model.
pub struct NewsLookup {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl NewsLookup {
    /// Create a lookup using `provider`'s default model.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let model = provider.default_model().to_string();
        Self { provider, model }
    }

    /// Override the model sent with each request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Lookup for NewsLookup {
    async fn run(&self, job: &Job) -> Result<LookupOutput, LookupError> {
        let prompt = build_job_prompt(job)?;
        let request = GenerationRequest::new(&self.model, prompt).with_tool(Tool::web_search());

        let started = Instant::now();
        let response = self.provider.generate(request).await?;
        let runtime = started.elapsed();

        debug!(
            query = %job.query(),
            model = %response.model,
            runtime_ms = runtime.as_millis() as u64,
            "News lookup finished"
        );

        if response.output_text.trim().is_empty() {
            return Err(LookupError::EmptyOutput);
        }

        Ok(LookupOutput {
            output: response.output_text,
            model: self.model.clone(),
            runtime,
        })
    }
}
