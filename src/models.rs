//! Data models for extracted articles.
//!
//! This module defines the records handed from the scraping pipeline to the
//! summarizer and to the JSON output:
//! - [`Article`]: a validated, immutable article with a content-addressed id
//! - [`ArticleDraft`]: the raw fields collected by the extractor
//! - [`ArticleSummary`]: the lightweight JSON view of an article

use crate::error::ExtractionFailure;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Minimum number of characters of body text for an article to be kept.
pub const MIN_CONTENT_CHARS: usize = 50;

/// Number of hex characters of the content hash used in [`Article::id`].
const ID_HASH_CHARS: usize = 10;

/// Fields collected from one page before validation.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub url: String,
    pub content: String,
    pub source: String,
    pub category: String,
    pub published_time: Option<DateTime<FixedOffset>>,
    pub author: Option<String>,
    pub raw_markup: Option<String>,
}

/// A news article extracted from a publisher page.
///
/// Articles only exist once the title is non-empty and the body is at least
/// [`MIN_CONTENT_CHARS`] characters long. They are never mutated afterwards;
/// re-extracting changed content produces a new article with a new id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    id: String,
    title: String,
    url: String,
    content: String,
    source: String,
    category: String,
    published_time: DateTime<FixedOffset>,
    author: Option<String>,
    #[serde(skip)]
    raw_markup: Option<String>,
}

impl Article {
    /// Validate a draft and build the article.
    ///
    /// A missing publish time is replaced by `extracted_at`.
    pub fn new(
        draft: ArticleDraft,
        extracted_at: DateTime<FixedOffset>,
    ) -> Result<Self, ExtractionFailure> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(ExtractionFailure::MissingTitle);
        }
        let content = draft.content.trim().to_string();
        let chars = content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            return Err(ExtractionFailure::ContentTooShort {
                chars,
                min: MIN_CONTENT_CHARS,
            });
        }

        let id = content_id(&draft.source, &content);
        Ok(Self {
            id,
            title,
            url: draft.url,
            content,
            source: draft.source,
            category: draft.category,
            published_time: draft.published_time.unwrap_or(extracted_at),
            author: draft.author.filter(|a| !a.trim().is_empty()),
            raw_markup: draft.raw_markup,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn published_time(&self) -> DateTime<FixedOffset> {
        self.published_time
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Page snapshot kept for diagnostics only.
    pub fn raw_markup(&self) -> Option<&str> {
        self.raw_markup.as_deref()
    }

    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary::from(self)
    }
}

/// `source:` followed by the first hex characters of the SHA-256 of `content`.
pub fn content_id(source: &str, content: &str) -> String {
    let digest = hex::encode(Sha256::digest(content.as_bytes()));
    format!("{}:{}", source, &digest[..ID_HASH_CHARS])
}

/// JSON view of an article with a bounded content preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub published_time: String,
    pub author: Option<String>,
    pub content_preview: String,
}

const PREVIEW_CHARS: usize = 200;

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        let content_preview = if article.content.chars().count() > PREVIEW_CHARS {
            let head: String = article.content.chars().take(PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            article.content.clone()
        };
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            source: article.source.clone(),
            category: article.category.clone(),
            published_time: article.published_time.to_rfc3339(),
            author: article.author.clone(),
            content_preview,
        }
    }
}

/// Current time in the given offset; the default publish time.
pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn beijing() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn draft(content: &str) -> ArticleDraft {
        ArticleDraft {
            title: "央行宣布下调存款准备金率".to_string(),
            url: "https://finance.sina.com.cn/china/2025-05-08/doc-abc.shtml".to_string(),
            content: content.to_string(),
            source: "新浪新闻".to_string(),
            category: "财经".to_string(),
            ..Default::default()
        }
    }

    fn long_body() -> String {
        "中国人民银行今日宣布，自下月起下调金融机构存款准备金率0.5个百分点，释放长期流动性约一万亿元。".repeat(2)
    }

    #[test]
    fn test_id_is_stable_for_identical_content() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 0, 0).unwrap();
        let a = Article::new(draft(&long_body()), now).unwrap();
        let b = Article::new(draft(&long_body()), now).unwrap();
        assert_eq!(a.id(), b.id());
        assert!(a.id().starts_with("新浪新闻:"));
        assert_eq!(a.id().split(':').nth(1).unwrap().len(), 10);
    }

    #[test]
    fn test_id_changes_with_one_character() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 0, 0).unwrap();
        let body = long_body();
        let mut changed = body.clone();
        changed.push('!');
        let a = Article::new(draft(&body), now).unwrap();
        let b = Article::new(draft(&changed), now).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_rejects_missing_title() {
        let mut d = draft(&long_body());
        d.title = "   ".to_string();
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 0, 0).unwrap();
        assert_eq!(Article::new(d, now), Err(ExtractionFailure::MissingTitle));
    }

    #[test]
    fn test_rejects_short_content() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 0, 0).unwrap();
        let err = Article::new(draft("太短了"), now).unwrap_err();
        assert_eq!(err, ExtractionFailure::ContentTooShort { chars: 3, min: 50 });
    }

    #[test]
    fn test_content_length_counts_characters_not_bytes() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 0, 0).unwrap();
        // 49 CJK characters are 147 bytes but still too short
        let body = "字".repeat(49);
        assert!(Article::new(draft(&body), now).is_err());
        let body = "字".repeat(50);
        assert!(Article::new(draft(&body), now).is_ok());
    }

    #[test]
    fn test_missing_publish_time_defaults_to_extraction_time() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 30, 0).unwrap();
        let article = Article::new(draft(&long_body()), now).unwrap();
        assert_eq!(article.published_time(), now);
    }

    #[test]
    fn test_serialization_skips_raw_markup() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 30, 0).unwrap();
        let mut d = draft(&long_body());
        d.raw_markup = Some("<html>secret</html>".to_string());
        let article = Article::new(d, now).unwrap();
        assert_eq!(article.raw_markup(), Some("<html>secret</html>"));
        let json = serde_json::to_string(&article).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"category\":\"财经\""));
    }

    #[test]
    fn test_summary_truncates_preview() {
        let now = beijing().with_ymd_and_hms(2025, 5, 8, 9, 30, 0).unwrap();
        let body = "新".repeat(250);
        let summary = Article::new(draft(&body), now).unwrap().summary();
        assert_eq!(summary.content_preview.chars().count(), 203);
        assert!(summary.content_preview.ends_with("..."));
        assert_eq!(summary.published_time, "2025-05-08T09:30:00+08:00");
    }
}
