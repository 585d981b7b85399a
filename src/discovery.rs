//! Article URL discovery from category landing pages.
//!
//! Links are harvested from every anchor on the page, normalized to absolute
//! URLs and kept only when they point into the publisher's domain family and
//! look like article pages. Known list/feed containers are searched next when
//! the first pass comes up short, and a curated static list covers pages that
//! yield nothing at all.

use crate::config::PublisherConfig;
use crate::fetcher::Fetcher;
use crate::parser::{self, ParserBackend};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::{Position, Url};

/// Containers that hold article lists on Sina channel pages.
pub const LIST_CONTAINER_SELECTORS: &[&str] = &[
    ".news-item",
    ".news-card",
    ".list-a",
    ".list-mod",
    ".feed-card",
    ".main-list",
    ".article-list",
    ".news-list",
    ".seo_data_list",
    ".news-2",
];

/// Substrings of a path or query that mark an article page.
const PATH_MARKERS: &[&str] = &["/doc-i", "/article_", "/n_", "?id="];

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

static LIST_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    LIST_CONTAINER_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

/// `/2025-05-08/` style date-stamped path segments.
static YEAR_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/20[0-9]{2}-").expect("valid regex"));

/// Finds candidate article URLs for a category.
#[derive(Debug, Clone)]
pub struct UrlDiscoverer {
    publisher: PublisherConfig,
}

impl UrlDiscoverer {
    pub fn new(publisher: PublisherConfig) -> Self {
        Self { publisher }
    }

    /// Up to `limit` absolute article URLs for `category_url`.
    ///
    /// Never fails: an unreachable or unparsable category page goes straight
    /// to the static fallback list, which may itself be empty.
    #[instrument(level = "info", skip(self, fetcher), fields(%category_url, limit))]
    pub async fn discover(&self, fetcher: &Fetcher, category_url: &str, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }

        let body = match fetcher.get(category_url).await.into_result() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Category page unavailable");
                return self.fallback(category_url, limit);
            }
        };
        let doc = match parser::parse(&body, ParserBackend::Utf8) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Category page unparsable");
                return self.fallback(category_url, limit);
            }
        };

        let urls = self.harvest(&doc, category_url, limit);
        if urls.is_empty() {
            return self.fallback(category_url, limit);
        }
        info!(count = urls.len(), "Discovered article URLs");
        debug!(?urls, "Article URLs");
        urls
    }

    /// Collect article links from a parsed category page.
    pub fn harvest(&self, doc: &Html, category_url: &str, limit: usize) -> Vec<String> {
        let Ok(base) = Url::parse(category_url) else {
            warn!(%category_url, "Category URL is not absolute");
            return Vec::new();
        };

        let mut urls: Vec<String> = doc
            .select(&ANCHOR)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| normalize(href, &base))
            .filter(|url| self.in_domain(url) && looks_like_article(url))
            .map(String::from)
            .unique()
            .take(limit)
            .collect();

        if urls.len() < limit {
            let first_pass = urls.len();
            let widened = LIST_CONTAINERS
                .iter()
                .flat_map(|sel| doc.select(sel))
                .flat_map(|container| container.select(&ANCHOR))
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| normalize(href, &base))
                .filter(|url| self.in_domain(url))
                .map(String::from);
            for url in widened {
                if urls.len() >= limit {
                    break;
                }
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            debug!(first_pass, total = urls.len(), "Widened search to list containers");
        }

        urls
    }

    /// The curated list whose marker occurs in `category_url`, capped at `limit`.
    pub fn fallback(&self, category_url: &str, limit: usize) -> Vec<String> {
        let urls: Vec<String> = self
            .publisher
            .fallback_urls
            .iter()
            .find(|f| category_url.contains(&f.marker))
            .map(|f| f.urls.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        warn!(%category_url, count = urls.len(), "Using static fallback URLs");
        urls
    }

    fn in_domain(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.publisher
            .domains
            .iter()
            .any(|d| host == d || host.strip_suffix(d.as_str()).is_some_and(|h| h.ends_with('.')))
    }
}

/// Make `href` absolute against the category page.
///
/// Root-relative links resolve against the page's scheme and host;
/// anything that is neither root-relative nor an absolute http(s) URL is
/// dropped.
pub fn normalize(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.starts_with('/') {
        base.join(href).ok()
    } else if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).ok()
    } else {
        None
    }
}

fn looks_like_article(url: &Url) -> bool {
    let tail = &url[Position::BeforePath..];
    PATH_MARKERS.iter().any(|m| tail.contains(m)) || YEAR_PATH.is_match(url.path())
}
