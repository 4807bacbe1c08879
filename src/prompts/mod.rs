//! Prompt for the per-company news search.
//!
//! The template is rendered with Tera so the wording can be read and edited
//! as plain text.

use chrono::NaiveDate;
use tera::{Context, Tera};

use crate::scheduler::job::DATE_FORMAT;
use crate::scheduler::Job;

/// Template for a single company news lookup.
///
/// Variables: `name`, `start`, `end` (dates formatted `YYYY-MM-DD`).
pub const NEWS_SEARCH_TEMPLATE: &str = r#"Identify news from {{ start }} to {{ end }} about company **"{{ name }}"**.
Format the output as a bullet point list in the following format:

* YYYY-mm-dd - [**Headline**](Link): Brief Summary of the news.

Only output the bullet point list about news in the specified date range.
Do not include any other text or additional information. If you cannot find
any news for the given date range then output the text "no news found".
"#;

/// Text the model is asked to emit when there is nothing to report.
pub const NO_NEWS_FOUND: &str = "no news found";

/// Renders the news search prompt for one company and date range.
pub fn build_news_prompt(name: &str, start: NaiveDate, end: NaiveDate) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("name", name);
    context.insert("start", &start.format(DATE_FORMAT).to_string());
    context.insert("end", &end.format(DATE_FORMAT).to_string());

    Tera::one_off(NEWS_SEARCH_TEMPLATE, &context, false)
}

/// Renders the news search prompt for a job.
pub fn build_job_prompt(job: &Job) -> Result<String, tera::Error> {
    build_news_prompt(job.query(), job.start(), job.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::{build_jobs, parse_date};

    #[test]
    fn test_build_news_prompt_substitutes_variables() {
        let prompt = build_news_prompt(
            "Acme Corp",
            parse_date("2024-01-01").expect("date"),
            parse_date("2024-01-31").expect("date"),
        )
        .expect("renders");

        assert!(prompt.starts_with("Identify news from 2024-01-01 to 2024-01-31"));
        assert!(prompt.contains("**\"Acme Corp\"**"));
        assert!(prompt.contains(NO_NEWS_FOUND));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_build_news_prompt_does_not_escape_names() {
        let prompt = build_news_prompt(
            "Procter & Gamble <PG>",
            parse_date("2024-01-01").expect("date"),
            parse_date("2024-01-02").expect("date"),
        )
        .expect("renders");
        assert!(prompt.contains("Procter & Gamble <PG>"));
    }

    #[test]
    fn test_build_job_prompt() {
        let jobs = build_jobs(
            "Globex",
            parse_date("2023-12-01").expect("date"),
            parse_date("2023-12-31").expect("date"),
        )
        .expect("valid");
        let prompt = build_job_prompt(&jobs[0]).expect("renders");
        assert!(prompt.contains("from 2023-12-01 to 2023-12-31"));
        assert!(prompt.contains("Globex"));
    }
}
