//! Runtime configuration.
//!
//! Every section has built-in defaults tuned for Sina News, so the binary runs
//! without a config file. A YAML file passed with `--config` overrides any
//! subset of fields; command-line flags override the file.
//!
//! ```yaml
//! fetch:
//!   timeout_secs: 20
//!   request_delay: { min: 1.0, max: 3.0 }
//! publisher:
//!   categories:
//!     科技: https://tech.sina.com.cn/
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub publisher: PublisherConfig,
    pub summarizer: SummarizerConfig,
    pub output: OutputConfig,
}

/// A closed range of seconds to draw a random delay from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_secs_f64(self.min.max(0.0))
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max.max(self.min).max(0.0))
    }
}

/// HTTP fetch policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Total attempts per URL, including the first one.
    pub max_retries: u32,
    /// Jitter slept before the first attempt.
    pub request_delay: DelayRange,
    /// Backoff slept before every retry; longer than `request_delay`.
    pub retry_delay: DelayRange,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            request_delay: DelayRange::new(2.0, 5.0),
            retry_delay: DelayRange::new(5.0, 10.0),
        }
    }
}

/// Curated article URLs used when a category page yields no links.
///
/// `marker` is matched as a substring of the category URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackUrls {
    pub marker: String,
    pub urls: Vec<String>,
}

/// Everything that ties the pipeline to one publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Source label stamped on every article.
    pub name: String,
    /// Host suffixes considered part of the publisher's domain family.
    pub domains: Vec<String>,
    /// Offset used for timestamps printed without a zone.
    pub utc_offset_hours: i32,
    /// Category label to landing-page URL.
    pub categories: BTreeMap<String, String>,
    /// Checked in order; the first marker found in the category URL wins.
    pub fallback_urls: Vec<FallbackUrls>,
    /// Keep the page markup on each article for diagnostics.
    pub keep_raw_markup: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        let categories = [
            ("国际", "https://news.sina.com.cn/world/"),
            ("国内", "https://news.sina.com.cn/china/"),
            ("科技", "https://tech.sina.com.cn/"),
            ("财经", "https://finance.sina.com.cn/"),
            ("体育", "https://sports.sina.com.cn/"),
            ("娱乐", "https://ent.sina.com.cn/"),
            ("教育", "https://edu.sina.com.cn/"),
            ("健康", "https://health.sina.com.cn/"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let fallback = |marker: &str, urls: &[&str]| FallbackUrls {
            marker: marker.to_string(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
        };

        Self {
            name: "新浪新闻".to_string(),
            domains: vec!["sina.com.cn".to_string(), "sinaimg.cn".to_string()],
            utc_offset_hours: 8,
            categories,
            fallback_urls: vec![
                fallback(
                    "tech.sina",
                    &[
                        "https://tech.sina.com.cn/d/i/2025-05-08/doc-izrtvhun9753989.shtml",
                        "https://tech.sina.com.cn/d/i/2025-05-07/doc-izrsxqui0709981.shtml",
                        "https://tech.sina.com.cn/d/i/2025-05-07/doc-izrtvhum8461064.shtml",
                    ],
                ),
                fallback(
                    "finance.sina",
                    &[
                        "https://finance.sina.com.cn/china/gncj/2025-05-08/doc-izrtvcvr1702981.shtml",
                        "https://finance.sina.com.cn/money/future/fmnews/2025-05-08/doc-izrsxqui0855540.shtml",
                        "https://finance.sina.com.cn/jjxw/2025-05-07/doc-izrtvcvq8391957.shtml",
                    ],
                ),
                fallback(
                    "news.sina",
                    &[
                        "https://news.sina.com.cn/c/2025-05-08/doc-izrtvhun9607348.shtml",
                        "https://news.sina.com.cn/c/2025-05-08/doc-izrsxqui0918639.shtml",
                        "https://news.sina.com.cn/w/2025-05-08/doc-izrtvcvr1710633.shtml",
                    ],
                ),
                fallback(
                    "sports.sina",
                    &[
                        "https://sports.sina.com.cn/basketball/nba/2025-05-08/doc-izrtvhun9612345.shtml",
                        "https://sports.sina.com.cn/football/2025-05-08/doc-izrsxqui0912345.shtml",
                    ],
                ),
                fallback(
                    "ent.sina",
                    &[
                        "https://ent.sina.com.cn/s/m/2025-05-08/doc-izrtvhun9654321.shtml",
                        "https://ent.sina.com.cn/v/m/2025-05-08/doc-izrsxqui0954321.shtml",
                    ],
                ),
            ],
            keep_raw_markup: true,
        }
    }
}

/// Settings for the OpenAI-compatible summarization endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            max_tokens: 8000,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_retries: 3,
            timeout_secs: 120,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a senior news analyst. You will receive several \
news articles from one category. Write an analysis report in Markdown that explains what \
happened, what it means and what may happen next. Organise it into sections such as a quick \
overview, in-depth picks and trend insights. Cover macroeconomics, technology, international \
affairs, industry and capital markets where relevant. Prefer insight over restating the \
articles, keep the information density high, and cite the original articles in APA style.";

/// Where reports are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub report_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: "news_reports".to_string(),
        }
    }
}

impl Config {
    /// Load a YAML config file, falling back to defaults for missing fields.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw).map_err(|e| match e {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: display.clone(),
                source,
            },
            other => other,
        })?;
        info!(categories = config.publisher.categories.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fetch = &self.fetch;
        if fetch.max_retries == 0 {
            return Err(ConfigError::Invalid("fetch.max_retries must be at least 1".into()));
        }
        for (name, range) in [
            ("request_delay", fetch.request_delay),
            ("retry_delay", fetch.retry_delay),
        ] {
            if !range.min.is_finite()
                || !range.max.is_finite()
                || range.min < 0.0
                || range.max < range.min
            {
                return Err(ConfigError::Invalid(format!(
                    "fetch.{name} must satisfy 0 <= min <= max (got {}..{})",
                    range.min, range.max
                )));
            }
        }
        if !(-12..=14).contains(&self.publisher.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "publisher.utc_offset_hours out of range: {}",
                self.publisher.utc_offset_hours
            )));
        }
        if self.publisher.domains.is_empty() {
            return Err(ConfigError::Invalid("publisher.domains must not be empty".into()));
        }
        Ok(())
    }
}
