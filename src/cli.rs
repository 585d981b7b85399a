//! Command-line interface definitions for Sina Digest.
//!
//! All arguments can be provided via command-line flags; the API key can also
//! come from the environment.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Sina Digest application.
///
/// # Examples
///
/// ```sh
/// # Five finance articles, summarized and saved to ./news_reports
/// sina_digest --category 财经
///
/// # Ten tech articles, dumped as JSON without calling the model
/// sina_digest -c 科技 -l 10 --scrape-only --json-output-dir ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// News category to fetch (see --list-categories)
    #[arg(short = 'c', long, default_value = "财经")]
    pub category: String,

    /// Maximum number of articles to fetch
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=20))]
    pub limit: u16,

    /// Print the first lines of the saved report
    #[arg(short, long)]
    pub preview: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub debug: bool,

    /// Optional path to a YAML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for markdown reports (overrides output.report_dir)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also write the scraped articles as JSON into this directory
    #[arg(short, long)]
    pub json_output_dir: Option<PathBuf>,

    /// DeepSeek API key
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Scrape only; skip summarization and report writing
    #[arg(long)]
    pub scrape_only: bool,

    /// Disable the random delays between requests
    #[arg(long)]
    pub no_delay: bool,

    /// Per-request timeout in seconds (overrides fetch.timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Attempts per URL (overrides fetch.max_retries)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,

    /// List the configured categories and exit
    #[arg(long)]
    pub list_categories: bool,

    /// List saved reports and exit
    #[arg(long)]
    pub list_reports: bool,

    /// Print a saved report by id (file name) and exit
    #[arg(long, value_name = "ID")]
    pub show_report: Option<String>,
}
