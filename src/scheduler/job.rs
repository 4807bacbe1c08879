//! Job definitions for the scheduler.
//!
//! This module defines the data that flows through a batch:
//!
//! - `BatchRequest`: raw caller input as it arrives from a form or file
//! - `Job`: one validated lookup (query text plus the shared date range)
//! - `TaskResult`: the terminal outcome of one job, success or failure

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InputsError;
use crate::lookup::LookupOutput;

/// Date format accepted for `start` and `end`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const EMPTY_TEXTS_MESSAGE: &str = "Please specify a query to search for news.";
const START_AFTER_END_MESSAGE: &str = "Must be before or equal to end date.";

/// A single validated lookup.
///
/// Jobs are immutable once built. Every job in a batch shares the same
/// `start`/`end` range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    id: Uuid,
    query: String,
    start: NaiveDate,
    end: NaiveDate,
}

impl Job {
    /// Identifier used to correlate a result with its job.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Trimmed, non-empty query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Start of the searched date range (inclusive).
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// End of the searched date range (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Split `texts` into one job per non-empty line.
///
/// Lines are trimmed and blank lines dropped; the remaining order is kept.
/// Validation covers both the query list and the date range, and every
/// failure is reported together. On error no job is produced.
pub fn build_jobs(texts: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Job>, InputsError> {
    let queries: Vec<&str> = texts
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut errors = InputsError::new();
    if queries.is_empty() {
        errors.add("texts", EMPTY_TEXTS_MESSAGE);
    }
    if start > end {
        errors.add("start", START_AFTER_END_MESSAGE);
    }
    errors.into_result()?;

    Ok(queries
        .into_iter()
        .map(|query| Job {
            id: Uuid::new_v4(),
            query: query.to_string(),
            start,
            end,
        })
        .collect())
}

/// Raw batch input, one query per line of `texts`.
///
/// This mirrors the search form: dates travel as `YYYY-MM-DD` strings and are
/// only parsed when the request is turned into jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Newline-separated queries.
    #[serde(default)]
    pub texts: String,
    /// Start date, `YYYY-MM-DD`.
    pub start: String,
    /// End date, `YYYY-MM-DD`.
    pub end: String,
}

impl BatchRequest {
    /// Creates a request from already-split queries.
    pub fn new<I, S>(queries: I, start: impl Into<String>, end: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let texts = queries
            .into_iter()
            .map(|q| q.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            texts,
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parses the dates and builds the jobs.
    ///
    /// Date parse failures are reported under their own field. The range
    /// check only runs when both dates parsed.
    pub fn into_jobs(self) -> Result<Vec<Job>, InputsError> {
        let mut errors = InputsError::new();
        let start = parse_date_field("start", &self.start, &mut errors);
        let end = parse_date_field("end", &self.end, &mut errors);

        match (start, end) {
            (Some(start), Some(end)) => build_jobs(&self.texts, start, end),
            _ => {
                if self.texts.lines().all(|l| l.trim().is_empty()) {
                    errors.add("texts", EMPTY_TEXTS_MESSAGE);
                }
                Err(errors)
            }
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

fn parse_date_field(field: &str, value: &str, errors: &mut InputsError) -> Option<NaiveDate> {
    match parse_date(value) {
        Ok(date) => Some(date),
        Err(e) => {
            errors.add(field, format!("Invalid date '{}': {}", value.trim(), e));
            None
        }
    }
}

/// Terminal outcome of one job.
///
/// Exactly one of `output` and `error` is set; the two constructors are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredTaskResult")]
pub struct TaskResult {
    job_id: Uuid,
    query: String,
    start: NaiveDate,
    end: NaiveDate,
    output: Option<String>,
    error: Option<String>,
    model: Option<String>,
    runtime_secs: Option<f64>,
    completed_at: DateTime<Utc>,
}

/// Wire form of [`TaskResult`], checked before it becomes one.
#[derive(Deserialize)]
struct StoredTaskResult {
    job_id: Uuid,
    query: String,
    start: NaiveDate,
    end: NaiveDate,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    runtime_secs: Option<f64>,
    completed_at: DateTime<Utc>,
}

impl TryFrom<StoredTaskResult> for TaskResult {
    type Error = String;

    fn try_from(stored: StoredTaskResult) -> Result<Self, Self::Error> {
        if stored.output.is_some() == stored.error.is_some() {
            return Err(format!(
                "result for '{}' must have exactly one of output and error",
                stored.query
            ));
        }

        Ok(Self {
            job_id: stored.job_id,
            query: stored.query,
            start: stored.start,
            end: stored.end,
            output: stored.output,
            error: stored.error,
            model: stored.model,
            runtime_secs: stored.runtime_secs,
            completed_at: stored.completed_at,
        })
    }
}

impl TaskResult {
    /// Creates a successful result from a lookup's output.
    pub fn success(job: &Job, lookup: LookupOutput) -> Self {
        Self {
            job_id: job.id,
            query: job.query.clone(),
            start: job.start,
            end: job.end,
            output: Some(lookup.output),
            error: None,
            model: Some(lookup.model),
            runtime_secs: Some(lookup.runtime.as_secs_f64()),
            completed_at: Utc::now(),
        }
    }

    /// Creates a failed result.
    pub fn failure(job: &Job, error: impl Into<String>) -> Self {
        Self {
            job_id: job.id,
            query: job.query.clone(),
            start: job.start,
            end: job.end,
            output: None,
            error: Some(error.into()),
            model: None,
            runtime_secs: None,
            completed_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Model that answered, when the lookup got that far.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Wall-clock time of the LLM call in seconds.
    pub fn runtime_secs(&self) -> Option<f64> {
        self.runtime_secs
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).expect("valid test date")
    }

    #[test]
    fn test_build_jobs_drops_blank_lines() {
        let jobs = build_jobs(
            "Acme Corp\n\n  \nGlobex\r\n  Initech  ",
            date("2024-01-01"),
            date("2024-01-31"),
        )
        .expect("valid input");

        let queries: Vec<&str> = jobs.iter().map(Job::query).collect();
        assert_eq!(queries, vec!["Acme Corp", "Globex", "Initech"]);
        assert!(jobs.iter().all(|j| j.start() == date("2024-01-01")));
        assert!(jobs.iter().all(|j| j.end() == date("2024-01-31")));
    }

    #[test]
    fn test_build_jobs_assigns_distinct_ids() {
        let jobs = build_jobs("a\na", date("2024-01-01"), date("2024-01-01")).expect("valid");
        assert_eq!(jobs.len(), 2);
        assert_ne!(jobs[0].id(), jobs[1].id());
    }

    #[test]
    fn test_build_jobs_rejects_empty_texts() {
        let err = build_jobs(" \n\t\n", date("2024-01-01"), date("2024-01-31"))
            .expect_err("blank input must fail");
        assert_eq!(
            err.get("texts"),
            Some("Please specify a query to search for news.")
        );
        assert_eq!(err.get("start"), None);
    }

    #[test]
    fn test_build_jobs_rejects_inverted_range() {
        let err = build_jobs("Acme", date("2024-02-01"), date("2024-01-31"))
            .expect_err("start after end must fail");
        assert_eq!(err.get("start"), Some("Must be before or equal to end date."));
        assert_eq!(err.errors().len(), 1);
    }

    #[test]
    fn test_build_jobs_reports_both_errors() {
        let err = build_jobs("", date("2024-02-01"), date("2024-01-31")).expect_err("invalid");
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn test_build_jobs_allows_single_day_range() {
        let jobs = build_jobs("Acme", date("2024-01-15"), date("2024-01-15")).expect("valid");
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn test_batch_request_into_jobs() {
        let request = BatchRequest::new(["Acme Corp", "", "Globex"], "2024-01-01", "2024-01-31");
        let jobs = request.into_jobs().expect("valid request");
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn test_batch_request_bad_date() {
        let request = BatchRequest {
            texts: String::new(),
            start: "01/02/2024".to_string(),
            end: "2024-01-31".to_string(),
        };
        let err = request.into_jobs().expect_err("bad date");
        assert!(err.get("start").is_some_and(|m| m.contains("01/02/2024")));
        assert!(err.get("texts").is_some());
        assert!(err.get("end").is_none());
    }

    #[test]
    fn test_batch_request_from_yaml() {
        let yaml = "texts: |\n  Acme Corp\n  Globex\nstart: 2024-01-01\nend: 2024-01-31\n";
        let request: BatchRequest = serde_yaml::from_str(yaml).expect("valid yaml");
        assert_eq!(request.start, "2024-01-01");
        assert_eq!(request.into_jobs().expect("valid").len(), 2);
    }

    #[test]
    fn test_task_result_exactly_one_outcome() {
        let jobs = build_jobs("Acme", date("2024-01-01"), date("2024-01-31")).expect("valid");
        let job = &jobs[0];

        let ok = TaskResult::success(
            job,
            LookupOutput {
                output: "* 2024-01-02 - news".to_string(),
                model: "gpt-4o-mini".to_string(),
                runtime: Duration::from_millis(1500),
            },
        );
        assert!(ok.is_success());
        assert_eq!(ok.output(), Some("* 2024-01-02 - news"));
        assert_eq!(ok.error(), None);
        assert_eq!(ok.model(), Some("gpt-4o-mini"));
        assert_eq!(ok.runtime_secs(), Some(1.5));
        assert_eq!(ok.job_id(), job.id());

        let failed = TaskResult::failure(job, "timeout");
        assert!(!failed.is_success());
        assert_eq!(failed.output(), None);
        assert_eq!(failed.error(), Some("timeout"));
        assert_eq!(failed.query(), "Acme");
    }

    #[test]
    fn test_task_result_serialization() {
        let jobs = build_jobs("Acme", date("2024-01-01"), date("2024-01-31")).expect("valid");
        let result = TaskResult::failure(&jobs[0], "boom");
        let json = serde_json::to_value(&result).expect("serializable");
        assert_eq!(json["query"], "Acme");
        assert_eq!(json["start"], "2024-01-01");
        assert_eq!(json["error"], "boom");
        assert!(json["output"].is_null());
    }

    #[test]
    fn test_task_result_deserialization_keeps_one_outcome() {
        let jobs = build_jobs("Acme", date("2024-01-01"), date("2024-01-31")).expect("valid");
        let result = TaskResult::failure(&jobs[0], "boom");
        let mut json = serde_json::to_value(&result).expect("serializable");

        let parsed: TaskResult = serde_json::from_value(json.clone()).expect("valid result");
        assert_eq!(parsed, result);

        json["output"] = serde_json::Value::from("* news");
        let err = serde_json::from_value::<TaskResult>(json.clone()).expect_err("both set");
        assert!(err.to_string().contains("exactly one of output and error"));

        json["output"] = serde_json::Value::Null;
        json["error"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<TaskResult>(json).is_err());
    }
}
