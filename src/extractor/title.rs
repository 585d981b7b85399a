//! Headline extraction.

use super::chain::{char_len, text_of, ExtractionChain};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

pub const TITLE_SELECTORS: &[&str] = &[
    "h1.main-title",
    "h1.title",
    ".main-title",
    "h1.entry-title",
    "h1#artibodyTitle",
    ".article-header h1",
    ".title_wrapper h1",
    ".content h1",
    "h1.data-title",
    "#artibody h1",
    ".article h1",
    ".article-box h1",
    "h1",
];

/// Shorter headlines are navigation labels, not titles.
const MIN_TITLE_CHARS: usize = 5;

pub static TITLE_CHAIN: Lazy<ExtractionChain> =
    Lazy::new(|| ExtractionChain::parse("title", TITLE_SELECTORS).expect("valid title selectors"));

static DOCUMENT_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid selector"));

/// `- 新浪新闻`, `_新浪财经_新浪网` and similar trailing brand suffixes.
static SITE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[-_].*?(新浪|sina|网易|网|中国|栏目|专题).*?$").expect("valid regex")
});

pub fn extract_title(doc: &Html, chain: &ExtractionChain) -> String {
    chain
        .first(doc, |el| {
            let text = text_of(el);
            (char_len(&text) > MIN_TITLE_CHARS).then_some(text)
        })
        .unwrap_or_else(|| document_title(doc))
}

/// The `<title>` text with the site-name suffix removed.
fn document_title(doc: &Html) -> String {
    let raw = doc
        .select(&DOCUMENT_TITLE)
        .next()
        .map(text_of)
        .unwrap_or_default();
    strip_site_suffix(&raw)
}

pub fn strip_site_suffix(title: &str) -> String {
    SITE_SUFFIX.replace(title, "").trim().to_string()
}
