//! JSON dump of the scraped articles.

use super::FILE_TIMESTAMP;
use crate::models::{Article, ArticleSummary};
use chrono::{DateTime, FixedOffset};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `articles` as a JSON array of [`ArticleSummary`] records.
///
/// The file is written to `{dir}/{category}_articles_{YYYYmmdd_HHMMSS}.json`;
/// `dir` is created if missing.
#[instrument(level = "info", skip(articles, dir), fields(count = articles.len(), dir = %dir.as_ref().display()))]
pub async fn write_articles(
    articles: &[Article],
    category: &str,
    dir: impl AsRef<Path>,
    at: DateTime<FixedOffset>,
) -> Result<PathBuf, Box<dyn Error>> {
    let dir = dir.as_ref();
    let summaries: Vec<ArticleSummary> = articles.iter().map(Article::summary).collect();
    let json = serde_json::to_string_pretty(&summaries)?;

    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join(format!(
        "{}_articles_{}.json",
        category,
        at.format(FILE_TIMESTAMP)
    ));
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote article JSON");

    Ok(path)
}
