//! # Sina Digest
//!
//! Fetches the latest articles of one Sina News category, extracts clean
//! article records from the heterogeneous page layouts, and asks an
//! OpenAI-compatible LLM (DeepSeek by default) for a markdown analysis report.
//!
//! ## Usage
//!
//! ```sh
//! DEEPSEEK_API_KEY=... sina_digest --category 科技 --limit 8 --preview
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: harvest article URLs from the category landing page
//! 2. **Fetching**: download each page sequentially with jittered delays,
//!    retries and rotating browser headers
//! 3. **Extraction**: parse the page and run the title, content, publish time
//!    and author selector chains
//! 4. **Summarization**: send the article set to the LLM
//! 5. **Output**: save the markdown report (and optionally a JSON dump)

use chrono::FixedOffset;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod discovery;
mod error;
mod extractor;
mod fetcher;
mod models;
mod orchestrator;
mod outputs;
mod parser;
mod utils;

use api::summarize;
use cli::Cli;
use config::Config;
use error::SummarizeError;
use fetcher::{wait::NoWait, Fetcher};
use models::now_in;
use orchestrator::Orchestrator;
use outputs::{json, report};
use utils::{ensure_writable_dir, preview_lines};

const PREVIEW_LINES: usize = 10;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("sina_digest starting up");
    debug!(?args.category, args.limit, ?args.config, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(retries) = args.retries {
        config.fetch.max_retries = retries;
    }
    config.validate()?;

    let offset = FixedOffset::east_opt(config.publisher.utc_offset_hours * 3600)
        .ok_or("publisher.utc_offset_hours is out of range")?;
    let report_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.report_dir));

    // ---- Listing modes ----
    if args.list_categories {
        for (name, url) in &config.publisher.categories {
            println!("{name}\t{url}");
        }
        return Ok(());
    }
    if args.list_reports {
        let reports = report::list_reports(&report_dir).await?;
        if reports.is_empty() {
            println!("No reports in {}", report_dir.display());
        }
        for r in reports {
            println!("{}\t{}\t{} {}\t{} bytes", r.id, r.category, r.date, r.time, r.size);
        }
        return Ok(());
    }
    if let Some(id) = &args.show_report {
        println!("{}", report::read_report(&report_dir, id).await?);
        return Ok(());
    }

    // ---- Early checks ----
    let has_key = args.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
    if !args.scrape_only {
        if !has_key {
            error!("No API key; set DEEPSEEK_API_KEY, pass --api-key or use --scrape-only");
            return Err(SummarizeError::MissingApiKey.into());
        }
        let dir = report_dir.to_string_lossy();
        if let Err(e) = ensure_writable_dir(&dir).await {
            error!(
                path = %dir,
                error = %e,
                "Report directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Scrape ----
    let mut fetcher = Fetcher::new(config.fetch.clone())?;
    if args.no_delay {
        fetcher = fetcher.with_wait_policy(Arc::new(NoWait));
    }
    let orchestrator = Orchestrator::new(fetcher, config.publisher.clone(), offset);
    let articles = orchestrator
        .run(&args.category, usize::from(args.limit))
        .await;
    if articles.is_empty() {
        error!(category = %args.category, "No articles could be extracted");
        return Err(format!("no articles could be extracted for category {}", args.category).into());
    }
    info!(count = articles.len(), category = %args.category, "Articles ready");

    let now = now_in(offset);
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_articles(&articles, &args.category, dir, now).await {
            error!(error = %e, "Failed to write article JSON");
        }
    }

    if args.scrape_only {
        for article in &articles {
            println!("{}\t{}", article.title(), article.url());
        }
        info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Done (scrape only)");
        return Ok(());
    }

    // ---- Summarize & save ----
    let markdown = summarize(&config.summarizer, args.api_key.as_deref(), &articles).await?;
    let path = report::save_report(&markdown, &args.category, &report_dir, now).await?;
    println!("Report saved to {}", path.display());

    if args.preview {
        println!("\n{}", preview_lines(&markdown, PREVIEW_LINES));
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        articles = articles.len(),
        report = %path.display(),
        "sina_digest finished"
    );
    Ok(())
}
