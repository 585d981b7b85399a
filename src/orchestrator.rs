//! Per-category pipeline: discover, then fetch, parse and extract each URL.
//!
//! URLs are processed one at a time. A failure on one URL is logged and the
//! URL is skipped; the run itself never fails.

use crate::config::PublisherConfig;
use crate::discovery::UrlDiscoverer;
use crate::error::ItemError;
use crate::extractor::{FieldExtractor, SinaExtractor};
use crate::fetcher::Fetcher;
use crate::models::{now_in, Article};
use crate::parser::{self, ParserBackend};
use chrono::FixedOffset;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Turns a category label into a list of validated articles.
#[derive(Debug, Clone)]
pub struct Orchestrator<E = SinaExtractor> {
    fetcher: Fetcher,
    discoverer: UrlDiscoverer,
    extractor: E,
    publisher: PublisherConfig,
    offset: FixedOffset,
}

impl Orchestrator<SinaExtractor> {
    /// Orchestrator with the default selector chains.
    pub fn new(fetcher: Fetcher, publisher: PublisherConfig, offset: FixedOffset) -> Self {
        Self::with_extractor(fetcher, publisher, SinaExtractor::new(offset), offset)
    }
}

impl<E: FieldExtractor> Orchestrator<E> {
    pub fn with_extractor(
        fetcher: Fetcher,
        publisher: PublisherConfig,
        extractor: E,
        offset: FixedOffset,
    ) -> Self {
        Self {
            fetcher,
            discoverer: UrlDiscoverer::new(publisher.clone()),
            extractor,
            publisher,
            offset,
        }
    }

    /// Fetch up to `limit` articles for `category`.
    ///
    /// An unknown category or an empty discovery result yields an empty list.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, category: &str, limit: usize) -> Vec<Article> {
        let t0 = Instant::now();
        let Some(category_url) = self.publisher.categories.get(category) else {
            error!(
                category,
                known = ?self.publisher.categories.keys().collect::<Vec<_>>(),
                "Unknown category"
            );
            return Vec::new();
        };

        let urls = self
            .discoverer
            .discover(&self.fetcher, category_url, limit)
            .await;
        if urls.is_empty() {
            warn!(category, %category_url, "No article URLs discovered");
            return Vec::new();
        }
        info!(category, candidates = urls.len(), "Processing candidate URLs");

        let mut articles = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            match self.process(url, category).await {
                Ok(article) => {
                    info!(index = i, %url, id = article.id(), title = article.title(), "Extracted article");
                    articles.push(article);
                }
                Err(e) => warn!(index = i, %url, error = %e, "Skipping URL"),
            }
        }

        info!(
            category,
            candidates = urls.len(),
            extracted = articles.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Category run finished"
        );
        articles
    }

    /// Fetch, parse and extract a single URL.
    #[instrument(level = "debug", skip(self))]
    pub async fn process(&self, url: &str, category: &str) -> Result<Article, ItemError> {
        let outcome = self.fetcher.get(url).await;
        debug!(attempts = outcome.attempts, status = ?outcome.status, "Fetch finished");
        let body = outcome.into_result()?;
        let doc = parser::parse(&body, ParserBackend::Utf8)?;

        let mut draft = self
            .extractor
            .draft(&doc, url, &self.publisher.name, category);
        debug!(
            title = %draft.title,
            content_chars = draft.content.chars().count(),
            published = ?draft.published_time,
            author = ?draft.author,
            "Extracted fields"
        );
        if self.publisher.keep_raw_markup {
            draft.raw_markup = Some(doc.html());
        }

        Ok(Article::new(draft, now_in(self.offset))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::error::{ExtractionFailure, FetchError};
    use crate::fetcher::wait::NoWait;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GOOD_PAGE: &str = r#"<html><head><title>测试</title></head><body>
        <h1 class="main-title">国常会部署进一步稳外贸稳外资举措</h1>
        <span class="date">2025年05月08日 09:30</span>
        <span class="source">来源：新华社</span>
        <div id="artibody">
            <p>国务院总理主持召开国务院常务会议，部署进一步稳外贸稳外资举措。</p>
            <p>会议指出，要加大政策支持力度，帮助企业稳订单拓市场，保持外贸平稳运行。</p>
        </div>
    </body></html>"#;

    fn beijing() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn orchestrator(server: &MockServer) -> Orchestrator {
        let mut categories = BTreeMap::new();
        categories.insert("国际".to_string(), format!("{}/world/", server.uri()));
        let publisher = PublisherConfig {
            domains: vec!["127.0.0.1".to_string()],
            categories,
            fallback_urls: Vec::new(),
            keep_raw_markup: false,
            ..PublisherConfig::default()
        };
        let fetcher = Fetcher::new(FetchConfig {
            max_retries: 2,
            ..FetchConfig::default()
        })
        .unwrap()
        .with_wait_policy(Arc::new(NoWait));
        Orchestrator::new(fetcher, publisher, beijing())
    }

    async fn mount(server: &MockServer, at: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_failing_url_is_omitted() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/world/",
            200,
            r#"<a href="/w/doc-imissing.shtml">gone</a><a href="/w/doc-igood.shtml">ok</a>"#,
        )
        .await;
        mount(&server, "/w/doc-imissing.shtml", 404, "").await;
        mount(&server, "/w/doc-igood.shtml", 200, GOOD_PAGE).await;

        let articles = orchestrator(&server).run("国际", 5).await;
        assert_eq!(articles.len(), 1);

        let article = &articles[0];
        assert_eq!(article.title(), "国常会部署进一步稳外贸稳外资举措");
        assert_eq!(article.url(), format!("{}/w/doc-igood.shtml", server.uri()));
        assert_eq!(article.source(), "新浪新闻");
        assert_eq!(article.category(), "国际");
        assert_eq!(article.author(), Some("新华社"));
        assert_eq!(
            article.published_time().to_rfc3339(),
            "2025-05-08T09:30:00+08:00"
        );
        assert!(article.id().starts_with("新浪新闻:"));
        assert!(article.raw_markup().is_none());
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let server = MockServer::start().await;
        assert!(orchestrator(&server).run("天气", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_discovered_is_empty() {
        let server = MockServer::start().await;
        mount(&server, "/world/", 200, "<p>暂无内容</p>").await;
        assert!(orchestrator(&server).run("国际", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_process_reports_stage_of_failure() {
        let server = MockServer::start().await;
        mount(&server, "/gone", 410, "").await;
        mount(
            &server,
            "/thin",
            200,
            r#"<h1 class="main-title">只有标题没有正文的页面</h1><div id="artibody"><p>太短了的正文</p></div>"#,
        )
        .await;
        let orch = orchestrator(&server);

        let gone = orch
            .process(&format!("{}/gone", server.uri()), "国际")
            .await
            .unwrap_err();
        assert!(matches!(gone, ItemError::Fetch(FetchError::Gone(410))));

        let thin = orch
            .process(&format!("{}/thin", server.uri()), "国际")
            .await
            .unwrap_err();
        assert!(matches!(
            thin,
            ItemError::Extraction(ExtractionFailure::ContentTooShort { .. })
        ));
    }

    #[tokio::test]
    async fn test_raw_markup_kept_when_enabled() {
        let server = MockServer::start().await;
        mount(&server, "/a", 200, GOOD_PAGE).await;
        let mut orch = orchestrator(&server);
        orch.publisher.keep_raw_markup = true;

        let article = orch
            .process(&format!("{}/a", server.uri()), "国际")
            .await
            .unwrap();
        assert!(article.raw_markup().unwrap().contains("artibody"));
    }
}
