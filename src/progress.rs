//! Progress reporting for running batches.
//!
//! The poller pushes a fixed sequence of events per finished job: a header
//! naming the query, the completion fraction, the output or error, and a
//! separator. Sinks decide what to do with them: render markdown, forward
//! them over a channel, or log them.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::ReporterError;

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A job finished; names its query.
    Header { query: String },
    /// Completion fraction after that job.
    Progress {
        completed: usize,
        total: usize,
        percent: u32,
    },
    /// Output of a successful job.
    Output(String),
    /// Error of a failed job.
    Error(String),
    /// End of this job's report.
    Separator,
}

/// `completed / total * 100`, rounded to the nearest whole percent with
/// ties going to the even neighbour (1/8 is 12%, 5/8 is 62%).
pub fn completion_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round_ties_even() as u32
}

/// Sink for progress events.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, event: ProgressEvent) -> Result<(), ReporterError>;
}

/// Renders events as markdown to a writer.
///
/// ```text
/// #### Acme Corp
/// 1/2 = 50%
/// * 2024-01-05 - [**Headline**](https://...): Summary.
///
/// ---
/// ```
pub struct MarkdownReporter<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> MarkdownReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, e.g. to inspect a buffer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MarkdownReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

/// Markdown text for one event.
pub fn render_markdown(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Header { query } => format!("#### {}\n", query),
        ProgressEvent::Progress {
            completed,
            total,
            percent,
        } => format!("{}/{} = {}%\n", completed, total, percent),
        ProgressEvent::Output(text) => format!("{}\n", text.trim_end()),
        ProgressEvent::Error(error) => format!("**Error:** {}\n", error),
        ProgressEvent::Separator => "\n---\n\n".to_string(),
    }
}

#[async_trait]
impl<W: Write + Send> ProgressReporter for MarkdownReporter<W> {
    async fn report(&self, event: ProgressEvent) -> Result<(), ReporterError> {
        let text = render_markdown(&event);
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Forwards events into a channel, for callers that render progress
/// themselves.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(sender: mpsc::Sender<ProgressEvent>) -> Self {
        Self { sender }
    }

    /// Creates a reporter together with the receiving end.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl ProgressReporter for ChannelReporter {
    async fn report(&self, event: ProgressEvent) -> Result<(), ReporterError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| ReporterError::ChannelClosed)
    }
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl ProgressReporter for TracingReporter {
    async fn report(&self, event: ProgressEvent) -> Result<(), ReporterError> {
        match event {
            ProgressEvent::Header { query } => tracing::info!(query = %query, "Job report"),
            ProgressEvent::Progress {
                completed,
                total,
                percent,
            } => tracing::info!(
                completed = completed,
                total = total,
                progress_pct = format!("{}%", percent),
                "Batch progress"
            ),
            ProgressEvent::Output(text) => tracing::info!(bytes = text.len(), "{}", text),
            ProgressEvent::Error(error) => tracing::warn!(error = %error, "Job error"),
            ProgressEvent::Separator => {}
        }
        Ok(())
    }
}
