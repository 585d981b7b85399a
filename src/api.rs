//! LLM summarization with exponential backoff retry logic.
//!
//! Articles are rendered into one markdown document and sent to an
//! OpenAI-compatible `/chat/completions` endpoint (DeepSeek by default). The
//! returned markdown is not interpreted.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`ChatClient`]: `reqwest` client for the chat completions endpoint
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay
//! - Only retryable errors (transport, 429, 5xx, empty completion) are retried

use crate::config::SummarizerConfig;
use crate::error::SummarizeError;
use crate::models::Article;
use crate::utils::truncate_for_log;
use rand::{rng, Rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Trait for async LLM interaction.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, SummarizeError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, SummarizeError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !e.is_retryable() {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() giving up"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct ChatClient<'a> {
    http: Client,
    config: &'a SummarizerConfig,
    api_key: &'a str,
}

impl fmt::Debug for ChatClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl<'a> ChatClient<'a> {
    pub fn new(config: &'a SummarizerConfig, api_key: &'a str) -> Result<Self, SummarizeError> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

impl AskAsync for ChatClient<'_> {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.config.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, SummarizeError> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&body, 300),
                "API call failed"
            );
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(SummarizeError::EmptyResponse)?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = content.chars().count(),
            "Completion received"
        );
        Ok(content)
    }
}

/// Render articles as one markdown document for the model.
pub fn prepare_content(articles: &[Article]) -> String {
    let mut out = String::new();
    for (i, article) in articles.iter().enumerate() {
        let _ = writeln!(out, "## Article {}: {}\n", i + 1, article.title());
        let _ = writeln!(
            out,
            "Published: {}",
            article.published_time().format("%Y-%m-%d %H:%M")
        );
        match article.author() {
            Some(author) => {
                let _ = writeln!(out, "Source: {} - {}", article.source(), author);
            }
            None => {
                let _ = writeln!(out, "Source: {}", article.source());
            }
        }
        let _ = writeln!(out, "Category: {}", article.category());
        let _ = write!(out, "\n{}\n\n", article.content());
        let _ = write!(out, "Original link: {}\n\n", article.url());
        out.push_str("---\n\n");
    }
    out
}

/// Ask the model for an analysis report of `articles`.
///
/// # Errors
///
/// [`SummarizeError::NoArticles`] and [`SummarizeError::MissingApiKey`] are
/// returned before any request is made; otherwise the last error after the
/// retry budget is spent.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn summarize(
    config: &SummarizerConfig,
    api_key: Option<&str>,
    articles: &[Article],
) -> Result<String, SummarizeError> {
    if articles.is_empty() {
        return Err(SummarizeError::NoArticles);
    }
    let api_key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(SummarizeError::MissingApiKey)?;

    let t0 = Instant::now();
    let prompt = format!(
        "Below are several news articles. Analyse them together and write a detailed report:\n\n{}",
        prepare_content(articles)
    );
    let client = ChatClient::new(config, api_key)?;
    let api = RetryAsk::new(client, config.max_retries, StdDuration::from_secs(1));
    let res = api.ask(&prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(elapsed_ms_total = dt.as_millis() as u64, "summarize succeeded"),
        Err(e) => error!(elapsed_ms_total = dt.as_millis() as u64, error = %e, "summarize failed"),
    }
    res
}
