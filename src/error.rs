//! Error types for company-news operations.
//!
//! Defines error types for each subsystem:
//! - Caller input validation (keyed by form field)
//! - LLM API interactions
//! - Per-job lookups and the worker pool that runs them
//! - Progress reporting sinks
//! - Batch orchestration

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::scheduler::TaskHandle;

/// A single validation failure attached to an input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending field (`texts`, `start`, `end`).
    pub field: String,
    /// Human-readable message for that field.
    pub message: String,
}

/// Validation errors for a batch request, collected per field.
///
/// All checks run before anything is reported, so a caller sees every
/// problem with its input at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputsError {
    errors: Vec<FieldError>,
}

impl InputsError {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether any failure was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All recorded failures, in the order they were added.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Turn the collection into a `Result`, failing if anything was recorded.
    pub fn into_result(self) -> Result<(), InputsError> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for InputsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid inputs")?;
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for InputsError {}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors produced by a single lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("LLM returned no output text")]
    EmptyOutput,
}

/// Errors surfaced by a task executor when fetching a unit's outcome.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task was cancelled")]
    Cancelled,

    #[error("Task exceeded its deadline of {limit:?}")]
    DeadlineExceeded { limit: Duration },

    #[error("Unknown task handle {0}")]
    UnknownHandle(TaskHandle),
}

/// Errors raised by a progress sink.
///
/// The poller never propagates these; they are logged and dropped.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Progress channel closed")]
    ChannelClosed,
}

/// Errors that stop a batch before dispatch.
///
/// Once jobs are submitted nothing is fatal, so input validation is the only
/// variant.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Inputs(#[from] InputsError),
}
