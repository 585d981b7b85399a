//! Field extraction from parsed article pages.
//!
//! Every field is driven by an [`ExtractionChain`]: an ordered selector list
//! plus a quality predicate. The default chains are tuned for Sina layouts but
//! are plain data, so another publisher only needs different selector lists.

pub mod author;
pub mod chain;
pub mod content;
pub mod time;
pub mod title;

use crate::models::ArticleDraft;
use chain::ExtractionChain;
use chrono::{DateTime, FixedOffset};
use scraper::Html;

/// Pulls the four article fields out of a parsed document.
///
/// All methods are pure with respect to the document: extracting twice yields
/// the same values. Empty strings mean "not found".
pub trait FieldExtractor {
    fn extract_title(&self, doc: &Html) -> String;

    fn extract_content(&self, doc: &Html) -> String;

    fn extract_publish_time(&self, doc: &Html) -> Option<DateTime<FixedOffset>>;

    fn extract_author(&self, doc: &Html) -> String;

    /// Run every field extractor and collect the results into a draft.
    fn draft(&self, doc: &Html, url: &str, source: &str, category: &str) -> ArticleDraft {
        let author = self.extract_author(doc);
        ArticleDraft {
            title: self.extract_title(doc),
            url: url.to_string(),
            content: self.extract_content(doc),
            source: source.to_string(),
            category: category.to_string(),
            published_time: self.extract_publish_time(doc),
            author: (!author.is_empty()).then_some(author),
            raw_markup: None,
        }
    }
}

/// Selector-chain extractor with publisher-local time handling.
#[derive(Debug, Clone)]
pub struct SinaExtractor {
    pub title: ExtractionChain,
    pub content: ExtractionChain,
    pub time_meta: ExtractionChain,
    pub time_text: ExtractionChain,
    pub author: ExtractionChain,
    offset: FixedOffset,
}

impl SinaExtractor {
    /// Default chains; zone-less timestamps are read in `offset`.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            title: title::TITLE_CHAIN.clone(),
            content: content::CONTENT_CHAIN.clone(),
            time_meta: time::META_CHAIN.clone(),
            time_text: time::TIME_CHAIN.clone(),
            author: author::AUTHOR_CHAIN.clone(),
            offset,
        }
    }
}

impl FieldExtractor for SinaExtractor {
    fn extract_title(&self, doc: &Html) -> String {
        title::extract_title(doc, &self.title)
    }

    fn extract_content(&self, doc: &Html) -> String {
        content::extract_content(doc, &self.content)
    }

    fn extract_publish_time(&self, doc: &Html) -> Option<DateTime<FixedOffset>> {
        time::extract_publish_time(
            doc,
            &self.time_meta,
            &self.time_text,
            self.offset,
            time::current_year_in(self.offset),
        )
    }

    fn extract_author(&self, doc: &Html) -> String {
        author::extract_author(doc, &self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head>
            <title>央行公布最新金融数据_新浪财经_新浪网</title>
            <meta property="article:published_time" content="2025-05-08T10:15:00+08:00">
        </head>
        <body>
            <h1 class="main-title">央行公布五月金融数据 社融规模稳步增长</h1>
            <div class="date-source">
                <span class="date">2025年05月08日 10:15</span>
                <span class="source">来源：证券时报</span>
            </div>
            <div id="artibody">
                <p>中国人民银行今日公布五月份金融统计数据，社会融资规模存量同比增长。</p>
                <p>分析人士认为，货币政策将继续保持稳健，为实体经济提供有力支持。</p>
                <p>责任编辑：王五</p>
            </div>
        </body>
    </html>"#;

    fn extractor() -> SinaExtractor {
        SinaExtractor::new(FixedOffset::east_opt(8 * 3600).unwrap())
    }

    #[test]
    fn test_full_page_draft() {
        let doc = Html::parse_document(PAGE);
        let draft = extractor().draft(&doc, "https://finance.sina.com.cn/a.shtml", "新浪新闻", "财经");

        assert_eq!(draft.title, "央行公布五月金融数据 社融规模稳步增长");
        assert!(draft.content.starts_with("中国人民银行今日公布"));
        assert!(!draft.content.contains("责任编辑"));
        assert_eq!(draft.author.as_deref(), Some("证券时报"));
        assert_eq!(draft.category, "财经");
        let published = draft.published_time.unwrap();
        assert_eq!(published.to_rfc3339(), "2025-05-08T10:15:00+08:00");
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let doc = Html::parse_document(PAGE);
        let ex = extractor();

        assert_eq!(ex.extract_title(&doc), ex.extract_title(&doc));
        assert_eq!(ex.extract_content(&doc), ex.extract_content(&doc));
        assert_eq!(ex.extract_publish_time(&doc), ex.extract_publish_time(&doc));
        assert_eq!(ex.extract_author(&doc), ex.extract_author(&doc));
        assert_eq!(ex.extract_author(&doc), "证券时报");
    }

    #[test]
    fn test_missing_author_becomes_none() {
        let doc = Html::parse_document("<h1>一个足够长的标题文本</h1>");
        let draft = extractor().draft(&doc, "u", "s", "c");
        assert_eq!(draft.author, None);
        assert_eq!(draft.published_time, None);
    }

    #[test]
    fn test_custom_chain_overrides_default() {
        let mut ex = extractor();
        ex.title = ExtractionChain::parse("title", &[".headline"]).unwrap();
        let doc = Html::parse_document(
            r#"<h1 class="main-title">默认链会选中的标题</h1><div class="headline">自定义链选中的标题</div>"#,
        );
        assert_eq!(ex.extract_title(&doc), "自定义链选中的标题");
    }
}
