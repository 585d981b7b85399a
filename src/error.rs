//! Error types for the fetch-and-extract pipeline.
//!
//! Nothing below the orchestrator is fatal to the process: these errors are
//! logged and the affected URL is skipped.

use thiserror::Error;

/// Errors produced by a single fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a status worth retrying (403, 429, 503, ...).
    #[error("HTTP status {0}")]
    Status(u16),

    /// The resource is confirmed absent (404 / 410).
    #[error("resource gone (HTTP {0})")]
    Gone(u16),

    /// Connection, TLS, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The retry budget ran out without a successful response.
    #[error("gave up after {attempts} attempts (last error: {last})")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },
}

/// Every parser backend rejected the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("all parser backends failed: {}", .attempts.join("; "))]
pub struct ParseFailure {
    pub attempts: Vec<String>,
}

/// A required field did not pass its quality check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("no title could be extracted")]
    MissingTitle,

    #[error("content too short ({chars} chars, need {min})")]
    ContentTooShort { chars: usize, min: usize },
}

/// Why a single URL produced no article.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseFailure),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionFailure),
}

/// Failures of the summarization collaborator.
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("there are no articles to summarize")]
    NoArticles,

    #[error("no API key configured (set DEEPSEEK_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("API returned an empty completion")]
    EmptyResponse,
}

impl SummarizeError {
    /// Transport errors, throttling, server errors and empty completions.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummarizeError::Http(_) | SummarizeError::EmptyResponse => true,
            SummarizeError::Api { status, .. } => *status == 429 || *status >= 500,
            SummarizeError::NoArticles | SummarizeError::MissingApiKey => false,
        }
    }
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
