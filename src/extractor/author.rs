//! Byline and source extraction.

use super::chain::{char_len, text_of, ExtractionChain};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

pub const AUTHOR_SELECTORS: &[&str] = &[
    ".author",
    ".article-author",
    ".show_author",
    ".source",
    ".article-source",
    ".article_source",
    ".article-meta .source",
    ".name",
    ".editor",
];

/// A bare element text shorter than this is taken as the author itself.
const MAX_BARE_AUTHOR_CHARS: usize = 20;
const LEADING_PARAGRAPHS: usize = 3;

pub static AUTHOR_CHAIN: Lazy<ExtractionChain> = Lazy::new(|| {
    ExtractionChain::parse("author", AUTHOR_SELECTORS).expect("valid author selectors")
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

/// `来源：新华社`, `作者: 张三` and the like, tried in this order.
static LABELS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["来源", "作者", "编辑", "记者", "出品"]
        .iter()
        .map(|label| Regex::new(&format!(r"{label}[：:]\s*([^\s]+)")).expect("valid regex"))
        .collect()
});

pub fn extract_author(doc: &Html, chain: &ExtractionChain) -> String {
    chain
        .first(doc, |el| {
            let text = text_of(el);
            if text.is_empty() {
                return None;
            }
            labelled(&text).or_else(|| (char_len(&text) < MAX_BARE_AUTHOR_CHARS).then_some(text))
        })
        .or_else(|| {
            doc.select(&PARAGRAPH)
                .take(LEADING_PARAGRAPHS)
                .find_map(|p| labelled(&text_of(p)))
        })
        .unwrap_or_default()
}

/// The value after the first matching label.
pub fn labelled(text: &str) -> Option<String> {
    LABELS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}
