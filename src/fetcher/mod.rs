//! HTTP fetcher with jittered pacing, header rotation and bounded retries.
//!
//! One call to [`Fetcher::fetch`] performs at most `max_retries` GET requests
//! against a single URL and classifies every response:
//!
//! | Response | Classification | Action |
//! |---|---|---|
//! | 200 | success | return the body |
//! | 403 | retryable | rotate to a different user agent, back off |
//! | 429, 503 | retryable | back off |
//! | 404, 410 | terminal | stop, the remaining budget is discarded |
//! | other status | retryable | back off |
//! | transport error | retryable, terminal on the last attempt | back off |
//!
//! Requests are never overlapped; the sleeps are what keeps the publisher
//! from blocking us.

pub mod headers;
pub mod wait;

use crate::config::{DelayRange, FetchConfig};
use crate::error::FetchError;
use headers::{random_headers, rotate_away_from, HeaderSet};
use rand::rng;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use wait::{JitterWait, WaitPolicy};

/// How a single attempt, or a whole fetch, ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    RetryableFailure,
    TerminalFailure,
}

/// Result of a fetch; transient, never persisted.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub body: Option<Vec<u8>>,
    pub error: Option<FetchError>,
    /// Number of HTTP requests issued.
    pub attempts: u32,
}

impl FetchOutcome {
    fn success(body: Vec<u8>, attempts: u32) -> Self {
        Self {
            status: FetchStatus::Success,
            body: Some(body),
            error: None,
            attempts,
        }
    }

    fn retryable(error: FetchError, attempts: u32) -> Self {
        Self {
            status: FetchStatus::RetryableFailure,
            body: None,
            error: Some(error),
            attempts,
        }
    }

    fn terminal(error: FetchError, attempts: u32) -> Self {
        Self {
            status: FetchStatus::TerminalFailure,
            body: None,
            error: Some(error),
            attempts,
        }
    }

    /// Body on success, the recorded error otherwise.
    pub fn into_result(self) -> Result<Vec<u8>, FetchError> {
        match (self.status, self.body, self.error) {
            (FetchStatus::Success, Some(body), _) => Ok(body),
            (_, _, Some(err)) => Err(err),
            (_, _, None) => Err(FetchError::Transport("fetch produced no body".to_string())),
        }
    }
}

/// Map an HTTP status code to its retry classification.
pub fn classify_status(status: u16) -> FetchStatus {
    match status {
        200 => FetchStatus::Success,
        404 | 410 => FetchStatus::TerminalFailure,
        _ => FetchStatus::RetryableFailure,
    }
}

/// Sequential HTTP GET client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    wait: Arc<dyn WaitPolicy>,
}

impl Fetcher {
    /// Build a fetcher with random jitter between requests.
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest` error if the TLS backend cannot be
    /// initialised.
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            config,
            wait: Arc::new(JitterWait),
        })
    }

    /// Replace the delay policy (e.g. with [`wait::NoWait`] in tests).
    pub fn with_wait_policy(mut self, wait: Arc<dyn WaitPolicy>) -> Self {
        self.wait = wait;
        self
    }

    /// Fetch with the configured retry budget and timeout.
    pub async fn get(&self, url: &str) -> FetchOutcome {
        self.fetch(url, self.config.max_retries, self.config.timeout())
            .await
    }

    /// Fetch `url`, making at most `max_retries` attempts.
    ///
    /// The returned outcome is always [`FetchStatus::Success`] or
    /// [`FetchStatus::TerminalFailure`].
    #[instrument(level = "info", skip(self), fields(%url))]
    pub async fn fetch(&self, url: &str, max_retries: u32, timeout: Duration) -> FetchOutcome {
        let max_attempts = max_retries.max(1);
        let t0 = Instant::now();
        let mut header_set = random_headers(&mut rng());
        let mut blocked_agent: Option<&'static str> = None;
        let mut last_error = FetchError::Transport("no attempt made".to_string());

        self.pause(self.config.request_delay, "pre-request").await;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.pause(self.config.retry_delay, "pre-retry").await;
                header_set = match blocked_agent.take() {
                    Some(blocked) => rotate_away_from(&mut rng(), blocked),
                    None => random_headers(&mut rng()),
                };
            }

            debug!(attempt, max = max_attempts, user_agent = header_set.user_agent, "Sending GET");
            let outcome = self
                .attempt(url, &header_set, timeout, attempt, max_attempts)
                .await;

            match outcome.status {
                FetchStatus::Success => {
                    info!(
                        attempt,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        bytes = outcome.body.as_ref().map_or(0, Vec::len),
                        "Fetched"
                    );
                    return outcome;
                }
                FetchStatus::TerminalFailure => {
                    warn!(attempt, error = ?outcome.error, "Terminal fetch failure");
                    return outcome;
                }
                FetchStatus::RetryableFailure => {
                    if let Some(err) = outcome.error {
                        if err == FetchError::Status(403) {
                            blocked_agent = Some(header_set.user_agent);
                        }
                        last_error = err;
                    }
                }
            }
        }

        error!(
            attempts = max_attempts,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            error = %last_error,
            "Retries exhausted"
        );
        FetchOutcome::terminal(
            FetchError::RetriesExhausted {
                attempts: max_attempts,
                last: Box::new(last_error),
            },
            max_attempts,
        )
    }

    /// Issue one request and classify the result.
    async fn attempt(
        &self,
        url: &str,
        header_set: &HeaderSet,
        timeout: Duration,
        attempt: u32,
        max_attempts: u32,
    ) -> FetchOutcome {
        let response = self
            .client
            .get(url)
            .headers(header_set.headers.clone())
            .timeout(timeout)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(attempt, error = %e, "Request error");
                return transport_failure(e, attempt, max_attempts);
            }
        };

        let status = response.status().as_u16();
        match classify_status(status) {
            FetchStatus::Success => match response.bytes().await {
                Ok(bytes) => FetchOutcome::success(bytes.to_vec(), attempt),
                Err(e) => {
                    warn!(attempt, error = %e, "Failed reading body");
                    transport_failure(e, attempt, max_attempts)
                }
            },
            FetchStatus::TerminalFailure => {
                warn!(attempt, status, "Resource does not exist");
                FetchOutcome::terminal(FetchError::Gone(status), attempt)
            }
            FetchStatus::RetryableFailure => {
                match status {
                    403 => warn!(attempt, status, "Request refused; rotating headers"),
                    429 | 503 => warn!(attempt, status, "Rate limited or unavailable"),
                    _ => warn!(attempt, status, "Unexpected status"),
                }
                FetchOutcome::retryable(FetchError::Status(status), attempt)
            }
        }
    }

    async fn pause(&self, range: DelayRange, phase: &'static str) {
        let delay = self.wait.delay(range);
        if !delay.is_zero() {
            debug!(phase, delay_ms = delay.as_millis() as u64, "Sleeping");
            tokio::time::sleep(delay).await;
        }
    }
}

fn transport_failure(e: reqwest::Error, attempt: u32, max_attempts: u32) -> FetchOutcome {
    let err = FetchError::Transport(e.to_string());
    if attempt >= max_attempts {
        FetchOutcome::terminal(
            FetchError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(err),
            },
            attempt,
        )
    } else {
        FetchOutcome::retryable(err, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wait::NoWait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(FetchConfig::default())
            .unwrap()
            .with_wait_policy(Arc::new(NoWait))
    }

    /// Records every range it is asked for and never sleeps.
    #[derive(Debug, Default)]
    struct RecordingWait {
        calls: std::sync::Mutex<Vec<DelayRange>>,
    }

    impl WaitPolicy for RecordingWait {
        fn delay(&self, range: DelayRange) -> Duration {
            self.calls.lock().unwrap().push(range);
            Duration::ZERO
        }
    }

    fn recording_fetcher() -> (Fetcher, Arc<RecordingWait>) {
        let wait = Arc::new(RecordingWait::default());
        let fetcher = Fetcher::new(FetchConfig::default())
            .unwrap()
            .with_wait_policy(wait.clone());
        (fetcher, wait)
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200), FetchStatus::Success);
        assert_eq!(classify_status(404), FetchStatus::TerminalFailure);
        assert_eq!(classify_status(410), FetchStatus::TerminalFailure);
        assert_eq!(classify_status(403), FetchStatus::RetryableFailure);
        assert_eq!(classify_status(429), FetchStatus::RetryableFailure);
        assert_eq!(classify_status(503), FetchStatus::RetryableFailure);
        assert_eq!(classify_status(500), FetchStatus::RetryableFailure);
        assert_eq!(classify_status(204), FetchStatus::RetryableFailure);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>新闻</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher()
            .fetch(&format!("{}/doc", server.uri()), 3, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status, FetchStatus::Success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.into_result().unwrap(), "<p>新闻</p>".as_bytes());
    }

    #[tokio::test]
    async fn test_404_makes_exactly_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher()
            .fetch(&format!("{}/missing", server.uri()), 5, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status, FetchStatus::TerminalFailure);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.error, Some(FetchError::Gone(404)));
    }

    #[tokio::test]
    async fn test_410_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(410))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher().fetch(&server.uri(), 3, Duration::from_secs(5)).await;
        assert_eq!(outcome.error, Some(FetchError::Gone(410)));
    }

    #[tokio::test]
    async fn test_two_429_then_200_succeeds_on_third_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher()
            .fetch(&format!("{}/busy", server.uri()), 5, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status, FetchStatus::Success);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let outcome = fetcher().fetch(&server.uri(), 3, Duration::from_secs(5)).await;
        assert_eq!(outcome.status, FetchStatus::TerminalFailure);
        assert_eq!(outcome.attempts, 3);
        match outcome.error {
            Some(FetchError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(*last, FetchError::Status(503));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_403_rotates_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let outcome = fetcher().fetch(&server.uri(), 3, Duration::from_secs(5)).await;
        assert_eq!(outcome.status, FetchStatus::Success);
        assert_eq!(outcome.attempts, 2);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let ua = |i: usize| {
            requests[i]
                .headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        assert!(ua(0).is_some());
        assert_ne!(ua(0), ua(1));
    }

    #[tokio::test]
    async fn test_transport_error_becomes_terminal_on_last_attempt() {
        // Nothing listens on port 9 on loopback
        let outcome = fetcher()
            .fetch("http://127.0.0.1:9/", 2, Duration::from_secs(2))
            .await;
        assert_eq!(outcome.status, FetchStatus::TerminalFailure);
        assert_eq!(outcome.attempts, 2);
        assert!(matches!(
            outcome.error,
            Some(FetchError::RetriesExhausted { ref last, .. }) if matches!(**last, FetchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_retries_still_makes_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher().fetch(&server.uri(), 0, Duration::from_secs(5)).await;
        assert_eq!(outcome.status, FetchStatus::Success);
    }

    #[tokio::test]
    async fn test_pacing_sleeps_before_request_and_before_each_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let (fetcher, wait) = recording_fetcher();
        fetcher.fetch(&server.uri(), 3, Duration::from_secs(5)).await;

        let request = FetchConfig::default().request_delay;
        let retry = FetchConfig::default().retry_delay;
        assert_eq!(*wait.calls.lock().unwrap(), vec![request, retry, retry]);
    }

    #[tokio::test]
    async fn test_404_only_waits_before_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (fetcher, wait) = recording_fetcher();
        fetcher.fetch(&server.uri(), 3, Duration::from_secs(5)).await;

        assert_eq!(
            *wait.calls.lock().unwrap(),
            vec![FetchConfig::default().request_delay]
        );
    }
}
