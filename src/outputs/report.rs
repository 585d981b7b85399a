//! Markdown analysis reports on disk.
//!
//! Reports are named `{category}_analysis_report_{YYYYmmdd}_{HHMMSS}.md`. A
//! report that could not be written under its primary name is retried once
//! with a `backup_` prefix.

use super::FILE_TIMESTAMP;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

const REPORT_LABEL: &str = "analysis_report";

static REPORT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:backup_)?(.+)_analysis_report_([0-9]{8})_([0-9]{6})\.md$").expect("valid regex")
});

/// A report found in the report directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// File name, also the id accepted by [`read_report`].
    pub id: String,
    pub category: String,
    /// `YYYYmmdd`
    pub date: String,
    /// `HHMMSS`
    pub time: String,
    pub size: u64,
}

pub fn report_file_name(category: &str, at: DateTime<FixedOffset>) -> String {
    format!("{category}_{REPORT_LABEL}_{}.md", at.format(FILE_TIMESTAMP))
}

/// Write `markdown` and return the path it landed at.
#[instrument(level = "info", skip(markdown, dir), fields(dir = %dir.as_ref().display(), chars = markdown.len()))]
pub async fn save_report(
    markdown: &str,
    category: &str,
    dir: impl AsRef<Path>,
    at: DateTime<FixedOffset>,
) -> Result<PathBuf, Box<dyn Error>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;

    let file_name = report_file_name(category, at);
    let path = dir.join(&file_name);
    match fs::write(&path, markdown).await {
        Ok(()) => {
            info!(path = %path.display(), "Saved report");
            Ok(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to save report; trying backup name");
            let backup = dir.join(format!("backup_{file_name}"));
            if let Err(e2) = fs::write(&backup, markdown).await {
                error!(path = %backup.display(), error = %e2, "Failed to save backup report");
                return Err(e2.into());
            }
            info!(path = %backup.display(), "Saved report under backup name");
            Ok(backup)
        }
    }
}

/// Reports in `dir`, newest first. Files not following the naming scheme are
/// skipped; a missing directory lists as empty.
#[instrument(level = "debug", skip_all, fields(dir = %dir.as_ref().display()))]
pub async fn list_reports(dir: impl AsRef<Path>) -> Result<Vec<ReportEntry>, Box<dyn Error>> {
    let dir = dir.as_ref();
    let mut entries = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reports = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(caps) = REPORT_NAME.captures(&name) else {
            continue;
        };
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        reports.push(ReportEntry {
            category: caps[1].to_string(),
            date: caps[2].to_string(),
            time: caps[3].to_string(),
            size: meta.len(),
            id: name,
        });
    }

    reports.sort_by(|a, b| (&b.date, &b.time, &b.id).cmp(&(&a.date, &a.time, &a.id)));
    Ok(reports)
}

/// Contents of the report named `id`.
///
/// Ids are bare file names; anything that could point outside `dir` is
/// rejected.
pub async fn read_report(dir: impl AsRef<Path>, id: &str) -> Result<String, Box<dyn Error>> {
    if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(format!("invalid report id: {id:?}").into());
    }
    let path = dir.as_ref().join(id);
    Ok(fs::read_to_string(&path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 8, h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("财经", at(9, 30)),
            "财经_analysis_report_20250508_093000.md"
        );
    }

    #[tokio::test]
    async fn test_save_list_read() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports");

        let first = save_report("# 早间", "财经", &dir, at(8, 0)).await.unwrap();
        let second = save_report("# 午间报告", "科技", &dir, at(12, 5)).await.unwrap();
        std::fs::write(dir.join("notes.md"), "ignored").unwrap();

        let reports = list_reports(&dir).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, second.file_name().unwrap().to_str().unwrap());
        assert_eq!(reports[0].category, "科技");
        assert_eq!(reports[0].date, "20250508");
        assert_eq!(reports[0].time, "120500");
        assert_eq!(reports[0].size, "# 午间报告".len() as u64);
        assert_eq!(reports[1].id, first.file_name().unwrap().to_str().unwrap());

        assert_eq!(read_report(&dir, &reports[1].id).await.unwrap(), "# 早间");
    }

    #[tokio::test]
    async fn test_backup_name_used_when_primary_unwritable() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory squatting on the primary name makes the write fail
        std::fs::create_dir(tmp.path().join(report_file_name("体育", at(7, 0)))).unwrap();

        let path = save_report("# 体育", "体育", tmp.path(), at(7, 0)).await.unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("backup_体育_analysis_report_"));

        let reports = list_reports(tmp.path()).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, "体育");
    }

    #[tokio::test]
    async fn test_missing_dir_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_reports(tmp.path().join("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_rejects_path_separators() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_report(tmp.path(), "../secret.md").await.is_err());
        assert!(read_report(tmp.path(), "a\\b.md").await.is_err());
        assert!(read_report(tmp.path(), "..").await.is_err());
    }
}
