//! Body text extraction.
//!
//! Containers are tried in selector order. Inside a container, filtered
//! paragraphs win; a container without usable paragraphs can still supply its
//! raw text if it is long enough. A final scan over every `p`/`div` catches
//! layouts none of the selectors know about.

use super::chain::{char_len, text_of, ExtractionChain};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

pub const CONTENT_SELECTORS: &[&str] = &[
    "#artibody",
    ".article-content",
    ".article-body",
    ".article",
    "#article_content",
    ".artical-content",
    ".content",
    ".main-content",
    ".article-box",
    "#art_content",
    ".art_content",
    ".article_content",
    ".moduleParagraph",
    ".article-body-content",
];

const MIN_PARAGRAPH_CHARS: usize = 3;
const MIN_BLOCK_CHARS: usize = 100;

pub static CONTENT_CHAIN: Lazy<ExtractionChain> = Lazy::new(|| {
    ExtractionChain::parse("content", CONTENT_SELECTORS).expect("valid content selectors")
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("p, div").expect("valid selector"));

/// Bylines, credits, tag lists and leaked script text.
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(责编|编辑|记者|原标题|来源|标签|关键词|点此查看|var\s|function\s*\(|document\.|if\s*\(|for\s*\(|\)\s*;)",
    )
    .expect("valid regex")
});

static EDITOR_TRAILER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"责任编辑.*$").expect("valid regex"));

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\n\s*){3,}").expect("valid regex"));

pub fn is_boilerplate(text: &str) -> bool {
    BOILERPLATE.is_match(text)
}

pub fn extract_content(doc: &Html, chain: &ExtractionChain) -> String {
    chain
        .first(doc, from_container)
        .or_else(|| generic_scan(doc))
        .unwrap_or_default()
}

fn from_container(container: ElementRef<'_>) -> Option<String> {
    let paragraphs: Vec<String> = container
        .select(&PARAGRAPH)
        .map(text_of)
        .filter(|t| char_len(t) > MIN_PARAGRAPH_CHARS && !is_boilerplate(t))
        .collect();
    if !paragraphs.is_empty() {
        return Some(paragraphs.join("\n\n"));
    }

    let text = text_of(container);
    (char_len(&text) > MIN_BLOCK_CHARS).then(|| clean_block_text(&text))
}

/// Drop a trailing "责任编辑" line and squeeze runs of blank lines.
pub fn clean_block_text(text: &str) -> String {
    let text = EDITOR_TRAILER.replace(text, "");
    BLANK_RUN.replace_all(&text, "\n\n").into_owned()
}

fn generic_scan(doc: &Html) -> Option<String> {
    doc.select(&BLOCK)
        .map(text_of)
        .find(|t| char_len(t) > MIN_BLOCK_CHARS && !is_boilerplate(t))
}
