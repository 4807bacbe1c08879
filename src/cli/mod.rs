//! Command-line interface for company-news.
//!
//! Provides commands for searching news from flags or batch files and for
//! inspecting the rendered prompt.

mod commands;

pub use commands::{load_batch_file, parse_cli, run, run_with_cli, Cli, Commands};
