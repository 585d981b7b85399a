//! Publish time extraction.
//!
//! Structured metadata is trusted first. Visible date strings are matched
//! against four pattern families, each of which knows how to build a
//! timestamp from its own captures. Times without a zone are interpreted in
//! the publisher's offset.

use super::chain::{text_of, ExtractionChain};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::Html;

pub const META_SELECTORS: &[&str] = &[
    r#"meta[property="article:published_time"]"#,
    r#"meta[name="publishdate"]"#,
    r#"meta[name="publish_date"]"#,
    r#"meta[name="date"]"#,
    r#"meta[itemprop="datePublished"]"#,
];

pub const TIME_SELECTORS: &[&str] = &[
    ".date",
    ".time-source",
    ".article-info .time",
    ".publish-time",
    ".entry-date",
    ".time",
    ".article-date",
    ".source-time",
    ".article-meta span",
    ".article_info .time",
    "time",
];

pub static META_CHAIN: Lazy<ExtractionChain> = Lazy::new(|| {
    ExtractionChain::parse("publish_time_meta", META_SELECTORS).expect("valid meta selectors")
});

pub static TIME_CHAIN: Lazy<ExtractionChain> = Lazy::new(|| {
    ExtractionChain::parse("publish_time", TIME_SELECTORS).expect("valid time selectors")
});

/// How a pattern's captures become a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFamily {
    /// `2023-05-21 12:34`, `2023年05月21日 12:34`
    DateTime,
    /// `2023年05月21日`, midnight
    DateOnly,
    /// `05-21 12:34`, current year
    MonthDayTime,
    /// `2023/05/21 12:34`
    SlashDateTime,
}

#[derive(Debug)]
pub struct DatePattern {
    pub family: DateFamily,
    pub regex: Regex,
}

/// Tried in order; the first pattern that yields a valid date wins.
pub static DATE_PATTERNS: Lazy<Vec<DatePattern>> = Lazy::new(|| {
    [
        (
            DateFamily::DateTime,
            r"([0-9]{4})[-年]([0-9]{1,2})[-月]([0-9]{1,2})[日号\s]*?([0-9]{1,2}):([0-9]{1,2})",
        ),
        (
            DateFamily::DateOnly,
            r"([0-9]{4})[-年]([0-9]{1,2})[-月]([0-9]{1,2})[日号\s]*",
        ),
        (
            DateFamily::MonthDayTime,
            r"([0-9]{2})-([0-9]{2})\s+([0-9]{2}):([0-9]{2})",
        ),
        (
            DateFamily::SlashDateTime,
            r"([0-9]{4})/([0-9]{1,2})/([0-9]{1,2})\s*([0-9]{1,2}):([0-9]{1,2})",
        ),
    ]
    .into_iter()
    .map(|(family, pattern)| DatePattern {
        family,
        regex: Regex::new(pattern).expect("valid date pattern"),
    })
    .collect()
});

impl DateFamily {
    fn build(self, caps: &Captures<'_>, current_year: i32) -> Option<NaiveDateTime> {
        let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        match self {
            DateFamily::DateTime | DateFamily::SlashDateTime => {
                NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?
                    .and_hms_opt(num(4)?, num(5)?, 0)
            }
            DateFamily::DateOnly => {
                NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?.and_hms_opt(0, 0, 0)
            }
            DateFamily::MonthDayTime => NaiveDate::from_ymd_opt(current_year, num(1)?, num(2)?)?
                .and_hms_opt(num(3)?, num(4)?, 0),
        }
    }
}

/// Publish time from metadata, then from visible date text.
pub fn extract_publish_time(
    doc: &Html,
    meta_chain: &ExtractionChain,
    text_chain: &ExtractionChain,
    offset: FixedOffset,
    current_year: i32,
) -> Option<DateTime<FixedOffset>> {
    meta_chain
        .first(doc, |el| {
            el.value()
                .attr("content")
                .and_then(|value| parse_meta_value(value, offset))
        })
        .or_else(|| {
            text_chain.first(doc, |el| {
                parse_date_text(&text_of(el), current_year).and_then(|n| localize(n, offset))
            })
        })
}

/// Parse a metadata `content` attribute.
///
/// Values containing `T` are full timestamps (a trailing `Z` means UTC);
/// anything else must be a bare `YYYY-MM-DD` date.
pub fn parse_meta_value(value: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.contains('T') {
        let normalized = match value.strip_suffix('Z') {
            Some(head) => format!("{head}+00:00"),
            None => value.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Some(dt);
        }
        if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z") {
            return Some(dt);
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
            .and_then(|naive| localize(naive, offset))
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|naive| localize(naive, offset))
    }
}

/// Run the date pattern families over free text.
pub fn parse_date_text(text: &str, current_year: i32) -> Option<NaiveDateTime> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .regex
            .captures(text)
            .and_then(|caps| pattern.family.build(&caps, current_year))
    })
}

fn localize(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.from_local_datetime(&naive).single()
}

/// The calendar year "now" in the given offset.
pub fn current_year_in(offset: FixedOffset) -> i32 {
    chrono::Utc::now().with_timezone(&offset).year()
}
