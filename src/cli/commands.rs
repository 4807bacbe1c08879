//! CLI command definitions for company-news.
//!
//! `search` takes queries from flags or a text file, `run` reads a whole
//! batch request from YAML or JSON, and `prompt` prints the rendered query
//! text without calling the API.

use crate::batch::NewsSearch;
use crate::config::NewsConfig;
use crate::error::InputsError;
use crate::progress::{MarkdownReporter, ProgressReporter, TracingReporter};
use crate::prompts::build_news_prompt;
use crate::scheduler::{parse_date, BatchOutcome, BatchRequest, TaskResult};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Company news search powered by a web-search-enabled LLM.
#[derive(Parser)]
#[command(name = "company-news")]
#[command(about = "Search recent news about companies with a web-search LLM")]
#[command(version)]
#[command(
    long_about = "company-news fans out one web-search LLM call per company and prints each \
    result as soon as it arrives.\n\nExample usage:\n  company-news search -q \"Acme Corp\" \
    -q Globex --start 2024-01-01 --end 2024-01-31"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Search news for one or more companies.
    Search(SearchArgs),

    /// Run a batch request stored in a YAML or JSON file.
    ///
    /// The file holds `texts` (newline-separated queries) and/or `queries`
    /// (a list), plus `start` and `end` as YYYY-MM-DD.
    Run(RunArgs),

    /// Print the prompt sent for a query without calling the API.
    Prompt(PromptArgs),
}

/// Arguments for `company-news search`.
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Company or topic to search for. Repeat for several queries.
    #[arg(short = 'q', long = "query", required_unless_present = "texts_file")]
    pub queries: Vec<String>,

    /// File with one query per line.
    #[arg(short = 'f', long, conflicts_with = "queries")]
    pub texts_file: Option<PathBuf>,

    /// First day of the range (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last day of the range (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Arguments for `company-news run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Batch file (.yaml, .yml or .json).
    pub batch_file: PathBuf,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Arguments for `company-news prompt`.
#[derive(Parser, Debug)]
pub struct PromptArgs {
    /// Company or topic to search for.
    #[arg(short = 'q', long)]
    pub query: String,

    /// First day of the range (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last day of the range (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,
}

/// Options shared by every command that runs a batch.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Model to use (defaults to NEWS_MODEL or gpt-4o-mini).
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Maximum lookups running at once (unbounded by default).
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Deadline for a single lookup in seconds (none by default).
    #[arg(long)]
    pub job_timeout_secs: Option<u64>,

    /// Write the results as JSON to this file.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Output JSON to stdout instead of markdown progress.
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Do not print per-job progress.
    #[arg(long)]
    pub quiet: bool,
}

/// JSON document produced by a batch run.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    /// "success" when every job succeeded, "partial" or "failed" otherwise.
    pub status: String,
    /// Model used for every lookup.
    pub model: String,
    /// Number of jobs in the batch.
    pub total: usize,
    /// Number of jobs that failed.
    pub failed: usize,
    /// Wall-clock duration of the batch.
    pub total_duration_ms: u64,
    /// Results in completion order.
    pub results: Vec<TaskResult>,
}

impl SearchOutput {
    fn new(model: &str, outcome: BatchOutcome, elapsed: Duration) -> Self {
        let total = outcome.len();
        let failed = outcome.failed().count();
        let status = match (total, failed) {
            (_, 0) => "success",
            (t, f) if t == f => "failed",
            _ => "partial",
        };

        Self {
            status: status.to_string(),
            model: model.to_string(),
            total,
            failed,
            total_duration_ms: elapsed.as_millis() as u64,
            results: outcome.into_results(),
        }
    }
}

/// Batch file contents. `queries` lines are appended to `texts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub texts: String,
    #[serde(default)]
    pub queries: Vec<String>,
    pub start: String,
    pub end: String,
}

impl From<BatchFile> for BatchRequest {
    fn from(file: BatchFile) -> Self {
        let mut lines: Vec<String> = file.texts.lines().map(str::to_string).collect();
        lines.extend(file.queries);
        BatchRequest::new(lines, file.start, file.end)
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the company-news CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Search(args) => {
            run_search_command(args).await?;
        }
        Commands::Run(args) => {
            run_batch_command(args).await?;
        }
        Commands::Prompt(args) => {
            run_prompt_command(args)?;
        }
    }
    Ok(())
}

// ============================================================================
// Search / Run Command Implementation
// ============================================================================

async fn run_search_command(args: SearchArgs) -> anyhow::Result<()> {
    let texts = match &args.texts_file {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read texts file {}: {}", path.display(), e)
        })?,
        None => args.queries.join("\n"),
    };

    let request = BatchRequest {
        texts,
        start: args.start,
        end: args.end,
    };
    execute_request(request, &args.run).await
}

async fn run_batch_command(args: RunArgs) -> anyhow::Result<()> {
    let request = load_batch_file(&args.batch_file)?;
    execute_request(request, &args.run).await
}

/// Reads a YAML or JSON batch file, picking the format by extension.
pub fn load_batch_file(path: &Path) -> anyhow::Result<BatchRequest> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read batch file {}: {}", path.display(), e))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let file: BatchFile = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid JSON batch file {}: {}", path.display(), e))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid YAML batch file {}: {}", path.display(), e))?
    };

    Ok(file.into())
}

/// Applies CLI overrides on top of the environment configuration.
fn build_config(options: &RunOptions) -> anyhow::Result<NewsConfig> {
    let mut config = NewsConfig::from_env()?;

    if let Some(key) = &options.api_key {
        config = config.with_api_key(key.clone());
    }
    if let Some(model) = &options.model {
        config = config.with_model(model.clone());
    }
    if let Some(max) = options.max_concurrent {
        config = config.with_max_concurrent(max);
    }
    if let Some(secs) = options.job_timeout_secs {
        config = config.with_job_timeout(Duration::from_secs(secs));
    }

    config.validate()?;
    Ok(config)
}

/// Checks the request without submitting anything. The returned error lists
/// every failing field; `main` prints it once.
fn validate_request(request: &BatchRequest) -> anyhow::Result<()> {
    request
        .clone()
        .into_jobs()
        .map(|_| ())
        .map_err(|err: InputsError| anyhow::Error::new(err))
}

async fn execute_request(request: BatchRequest, options: &RunOptions) -> anyhow::Result<()> {
    // Report bad input before asking for credentials.
    validate_request(&request)?;

    let config = build_config(options)?;
    let client = config.build_client().map_err(|e| {
        anyhow::anyhow!(
            "Failed to initialize LLM client: {}. Please provide --api-key or set \
             OPENAI_API_KEY env var.",
            e
        )
    })?;

    info!(model = %config.model, "Using OpenAI Responses API at {}", client.api_base());
    let search = NewsSearch::new(&config, Arc::new(client));

    let reporter: Option<Box<dyn ProgressReporter>> = if options.quiet {
        None
    } else if options.json {
        Some(Box::new(TracingReporter))
    } else {
        Some(Box::new(MarkdownReporter::stdout()))
    };

    let started = Instant::now();
    let outcome = search.search(request, reporter.as_deref()).await?;
    let output = SearchOutput::new(search.model(), outcome, started.elapsed());

    let json_output = serde_json::to_string_pretty(&output)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;

    if let Some(path) = &options.output {
        fs::write(path, &json_output)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        info!(path = %path.display(), "Results written");
    }

    if options.json {
        println!("{}", json_output);
    } else {
        println!(
            "Done: {} results, {} failed in {:.1}s",
            output.total,
            output.failed,
            output.total_duration_ms as f64 / 1000.0
        );
    }

    if output.failed > 0 {
        warn!(failed = output.failed, total = output.total, "Some lookups failed");
    }

    Ok(())
}

// ============================================================================
// Prompt Command Implementation
// ============================================================================

fn run_prompt_command(args: PromptArgs) -> anyhow::Result<()> {
    let start = parse_date(&args.start)
        .map_err(|e| anyhow::anyhow!("Invalid start date '{}': {}", args.start, e))?;
    let end = parse_date(&args.end)
        .map_err(|e| anyhow::anyhow!("Invalid end date '{}': {}", args.end, e))?;

    let prompt = build_news_prompt(args.query.trim(), start, end)
        .map_err(|e| anyhow::anyhow!("Failed to render prompt: {}", e))?;
    println!("{}", prompt);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupOutput;
    use crate::scheduler::build_jobs;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_command_defaults() {
        let args = vec![
            "company-news",
            "search",
            "-q",
            "Acme Corp",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");
        assert_eq!(cli.log_level, "info");

        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.queries, vec!["Acme Corp"]);
                assert!(args.texts_file.is_none());
                assert_eq!(args.start, "2024-01-01");
                assert_eq!(args.end, "2024-01-31");
                assert!(args.run.model.is_none());
                assert!(args.run.max_concurrent.is_none());
                assert!(args.run.output.is_none());
                assert!(!args.run.json);
                assert!(!args.run.quiet);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_search_command_with_all_options() {
        let args = vec![
            "company-news",
            "--log-level",
            "debug",
            "search",
            "-q",
            "Acme Corp",
            "-q",
            "Globex",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
            "-m",
            "gpt-4o",
            "--max-concurrent",
            "4",
            "--job-timeout-secs",
            "120",
            "-o",
            "results.json",
            "-j",
            "--quiet",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");
        assert_eq!(cli.log_level, "debug");

        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.queries, vec!["Acme Corp", "Globex"]);
                assert_eq!(args.run.model.as_deref(), Some("gpt-4o"));
                assert_eq!(args.run.max_concurrent, Some(4));
                assert_eq!(args.run.job_timeout_secs, Some(120));
                assert_eq!(args.run.output, Some(PathBuf::from("results.json")));
                assert!(args.run.json);
                assert!(args.run.quiet);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_search_requires_a_query_source() {
        let args = vec!["company-news", "search", "--start", "2024-01-01", "--end", "2024-01-31"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_search_query_and_file_conflict() {
        let args = vec![
            "company-news",
            "search",
            "-q",
            "Acme",
            "-f",
            "companies.txt",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_run_and_prompt_parse() {
        let cli = Cli::try_parse_from(["company-news", "run", "batch.yaml", "--json"])
            .expect("should parse");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.batch_file, PathBuf::from("batch.yaml"));
                assert!(args.run.json);
            }
            _ => panic!("Expected Run command"),
        }

        let cli = Cli::try_parse_from([
            "company-news",
            "prompt",
            "-q",
            "Acme",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ])
        .expect("should parse");
        assert!(matches!(cli.command, Commands::Prompt(_)));
    }

    #[test]
    fn test_load_yaml_batch_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "texts: |\n  Acme Corp\n\n  Globex\nqueries:\n  - Initech\nstart: 2024-01-01\nend: 2024-01-31"
        )
        .expect("write");

        let request = load_batch_file(file.path()).expect("valid batch file");
        assert_eq!(request.start, "2024-01-01");
        assert_eq!(request.end, "2024-01-31");

        let jobs = request.into_jobs().expect("valid jobs");
        let queries: Vec<&str> = jobs.iter().map(|j| j.query()).collect();
        assert_eq!(queries, vec!["Acme Corp", "Globex", "Initech"]);
    }

    #[test]
    fn test_load_json_batch_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"{{"queries": ["Acme Corp"], "start": "2024-01-01", "end": "2024-01-31"}}"#
        )
        .expect("write");

        let request = load_batch_file(file.path()).expect("valid batch file");
        assert_eq!(request.texts, "Acme Corp");
    }

    #[test]
    fn test_load_batch_file_reports_parse_errors() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        write!(file, "not json").expect("write");

        let err = load_batch_file(file.path()).expect_err("invalid json");
        assert!(err.to_string().contains("Invalid JSON batch file"));

        let missing = load_batch_file(Path::new("/nonexistent/batch.yaml"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_search_output_status() {
        let jobs = build_jobs(
            "Acme\nGlobex",
            parse_date("2024-01-01").expect("date"),
            parse_date("2024-01-31").expect("date"),
        )
        .expect("valid");
        let ok = TaskResult::success(
            &jobs[0],
            LookupOutput {
                output: "* news".to_string(),
                model: "gpt-4o-mini".to_string(),
                runtime: Duration::from_millis(1500),
            },
        );
        let failed = TaskResult::failure(&jobs[1], "timeout");

        let output = SearchOutput::new(
            "gpt-4o-mini",
            BatchOutcome::new(vec![ok.clone(), failed.clone()]),
            Duration::from_millis(2000),
        );
        assert_eq!(output.status, "partial");
        assert_eq!(output.total, 2);
        assert_eq!(output.failed, 1);
        assert_eq!(output.total_duration_ms, 2000);

        let output = SearchOutput::new(
            "gpt-4o-mini",
            BatchOutcome::new(vec![failed]),
            Duration::ZERO,
        );
        assert_eq!(output.status, "failed");

        let output = SearchOutput::new("gpt-4o-mini", BatchOutcome::new(vec![ok]), Duration::ZERO);
        assert_eq!(output.status, "success");

        let json = serde_json::to_value(&output).expect("serializable");
        assert_eq!(json["results"][0]["query"], "Acme");
        assert_eq!(json["results"][0]["output"], "* news");
    }

    #[test]
    fn test_validate_request_reports_each_field_once() {
        let request = BatchRequest::new(["", "  "], "2024-02-01", "2024-01-31");
        let err = validate_request(&request).expect_err("invalid request");
        let message = format!("{:#}", err);

        assert_eq!(
            message,
            "invalid inputs: texts: Please specify a query to search for news.; \
             start: Must be before or equal to end date."
        );
        assert_eq!(message.matches("texts:").count(), 1);
        assert!(err.downcast_ref::<InputsError>().is_some());

        let ok = BatchRequest::new(["Acme"], "2024-01-01", "2024-01-31");
        assert!(validate_request(&ok).is_ok());
    }

    #[tokio::test]
    async fn test_execute_request_rejects_input_before_config() {
        let request = BatchRequest::new(["Acme"], "not-a-date", "2024-01-31");
        let err = execute_request(request, &RunOptions::default())
            .await
            .expect_err("invalid request");
        let inputs = err.downcast_ref::<InputsError>().expect("input error");
        assert!(inputs.get("start").is_some());
    }

    #[test]
    fn test_empty_batch_output_is_success() {
        let output = SearchOutput::new("m", BatchOutcome::default(), Duration::ZERO);
        assert_eq!(output.status, "success");
        assert_eq!(output.total, 0);
    }
}
