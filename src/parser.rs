//! Turn fetched bytes into a traversable HTML document.
//!
//! `scraper` itself never rejects markup, so the backends differ in how they
//! decode the bytes first. They are tried in [`BACKEND_PRIORITY`] order,
//! starting from the caller's preferred one.

use crate::error::ParseFailure;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use scraper::Html;
use std::fmt;
use tracing::{debug, warn};

/// A strategy for decoding bytes before handing them to the HTML parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserBackend {
    /// Strict UTF-8; fails on any invalid sequence.
    Utf8,
    /// Decode with the charset declared in a `<meta>` tag (GBK, GB2312, ...).
    DeclaredCharset,
    /// UTF-8 with replacement characters; only fails on a blank page.
    Lossy,
}

/// Fallback order after the preferred backend.
pub const BACKEND_PRIORITY: [ParserBackend; 3] = [
    ParserBackend::Utf8,
    ParserBackend::DeclaredCharset,
    ParserBackend::Lossy,
];

impl fmt::Display for ParserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserBackend::Utf8 => "utf8",
            ParserBackend::DeclaredCharset => "declared-charset",
            ParserBackend::Lossy => "lossy",
        };
        f.write_str(name)
    }
}

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-]+)"#).expect("valid regex")
});

/// Parse `bytes` with `preferred`, then with the remaining backends in
/// priority order. Fails only when every backend fails.
pub fn parse(bytes: &[u8], preferred: ParserBackend) -> Result<Html, ParseFailure> {
    let order = std::iter::once(preferred)
        .chain(BACKEND_PRIORITY.into_iter().filter(|b| *b != preferred));

    let mut attempts = Vec::new();
    for backend in order {
        match decode(bytes, backend) {
            Ok(text) => {
                debug!(%backend, chars = text.len(), "Parsed document");
                return Ok(Html::parse_document(&text));
            }
            Err(reason) => {
                debug!(%backend, %reason, "Parser backend failed");
                attempts.push(format!("{backend}: {reason}"));
            }
        }
    }

    warn!(?attempts, "Every parser backend failed");
    Err(ParseFailure { attempts })
}

fn decode(bytes: &[u8], backend: ParserBackend) -> Result<String, String> {
    let text = match backend {
        ParserBackend::Utf8 => std::str::from_utf8(bytes)
            .map_err(|e| format!("invalid UTF-8: {e}"))?
            .to_string(),
        ParserBackend::DeclaredCharset => {
            let label = declared_charset(bytes).ok_or("no charset declared")?;
            let encoding = Encoding::for_label(label.as_bytes())
                .ok_or_else(|| format!("unknown charset {label}"))?;
            let (text, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                return Err(format!("malformed {}", encoding.name()));
            }
            text.into_owned()
        }
        ParserBackend::Lossy => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.trim().is_empty() {
        return Err("empty document".to_string());
    }
    Ok(text)
}

/// Charset label from the first `<meta ... charset=...>` in the head.
fn declared_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(4096)];
    META_CHARSET
        .captures(head)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).to_ascii_lowercase())
}
