//! Single-call execution with jittered exponential backoff.

use crate::config::RetryPolicy;
use crate::error::{is_retriable_status, SyncError, SyncResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lower-cased fragments of backend messages that signal a transient condition,
/// even when the status code alone would not be retried.
pub const TRANSIENT_MESSAGE_PATTERNS: &[&str] = &[
    "conflict occurred while saving",
    "rate limited",
    "temporarily unavailable",
    "service unavailable",
    "unsaved transactions",
    "timed out",
    "please try again",
];

/// Returns true if `message` matches a known transient backend condition.
pub fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Executes requests, retrying transient failures.
///
/// Outcomes per call:
/// - 2xx: returned immediately.
/// - Non-retriable status: returned as-is for the caller to inspect.
/// - Retriable status (429, 409, 5xx, or a transient message) with attempts
///   left: sleep `base * 2^attempt + jitter`, then retry. When attempts run
///   out the last response is returned.
/// - No response at all: retried the same way; the last error is returned
///   once attempts run out.
pub struct RetryingTransport<C: HttpClient> {
    client: C,
    cancel: CancellationToken,
}

impl<C: HttpClient> RetryingTransport<C> {
    /// Creates a transport around `client`.
    pub fn new(client: C) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to abort retry loops and backoff sleeps.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the cancellation token observed by this transport.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Sends `request` under `policy`.
    pub async fn execute(
        &self,
        request: HttpRequest,
        policy: &RetryPolicy,
    ) -> SyncResult<HttpResponse> {
        let max_attempts = policy.max_attempts();
        let mut last: Option<SyncResult<HttpResponse>> = None;
        let mut attempt = 0u32;

        while attempt < max_attempts {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match self.client.send(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let transient_message = response
                        .error_message()
                        .is_some_and(|m| is_transient_message(&m));
                    if !is_retriable_status(response.status) && !transient_message {
                        return Ok(response);
                    }
                    debug!(
                        method = %request.method,
                        status = response.status,
                        attempt,
                        "retriable response"
                    );
                    last = Some(Ok(response));
                }
                Err(message) => {
                    warn!(method = %request.method, attempt, error = %message, "request failed");
                    last = Some(Err(SyncError::transport_retryable(message)));
                }
            }

            if attempt + 1 >= max_attempts {
                break;
            }

            let delay = policy.delay_for_attempt(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
            self.sleep(delay).await?;
            attempt += 1;
        }

        match last {
            Some(result) => {
                warn!(method = %request.method, attempts = attempt + 1, "retries exhausted");
                result
            }
            None => Err(SyncError::Internal(
                "retry loop ended without a response or error".into(),
            )),
        }
    }

    async fn sleep(&self, delay: Duration) -> SyncResult<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::test_support::{status, MockClient};
    use proptest::prelude::*;
    use serde_json::json;
    use tokio::time::Instant;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "https://api.example.com/v1/pages/p1".into(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_immediately() {
        let transport = RetryingTransport::new(MockClient::scripted(vec![status(200)]));
        let response = transport.execute(request(), &policy(3)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.client().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_statuses_with_backoff() {
        let client = MockClient::scripted(vec![status(503), status(429), status(200)]);
        let transport = RetryingTransport::new(client);

        let start = Instant::now();
        let response = transport.execute(request(), &policy(3)).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(response.status, 200);
        assert_eq!(transport.client().calls(), 3);
        // 100ms + 200ms of backoff, plus two jitters below 200ms each.
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_returned_without_retry() {
        let transport = RetryingTransport::new(MockClient::scripted(vec![status(400)]));
        let response = transport.execute(request(), &policy(3)).await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(transport.client().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_message_makes_4xx_retriable() {
        let busy = HttpResponse::json_body(
            400,
            &json!({ "message": "Conflict occurred while saving. Please try again." }),
        );
        let client = MockClient::scripted(vec![Ok(busy), status(200)]);
        let transport = RetryingTransport::new(client);

        let response = transport.execute(request(), &policy(2)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.client().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_return_last_response() {
        let client = MockClient::scripted(vec![status(500), status(502), status(504)]);
        let transport = RetryingTransport::new(client);

        let response = transport.execute(request(), &policy(2)).await.unwrap();
        assert_eq!(response.status, 504);
        assert_eq!(transport.client().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transport_errors_are_returned() {
        let client = MockClient::scripted(vec![
            Err("connection reset".into()),
            Err("connection refused".into()),
        ]);
        let transport = RetryingTransport::new(client);

        let err = transport.execute(request(), &policy(1)).await.unwrap_err();
        match err {
            SyncError::Transport { message, retryable } => {
                assert_eq!(message, "connection refused");
                assert!(retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.client().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_then_success() {
        let client = MockClient::scripted(vec![Err("dns failure".into()), status(201)]);
        let transport = RetryingTransport::new(client);
        let response = transport.execute(request(), &policy(1)).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_one_attempt() {
        let transport = RetryingTransport::new(MockClient::scripted(vec![status(503)]));
        let response = transport
            .execute(request(), &RetryPolicy::no_retry())
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(transport.client().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let client = MockClient::scripted(vec![status(503), status(503), status(503)]);
        let transport = RetryingTransport::new(client).with_cancellation(cancel.clone());

        let policy = policy(5);
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };
        let (result, _) = tokio::join!(transport.execute(request(), &policy), trigger);

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert_eq!(transport.client().calls(), 1);
    }

    #[test]
    fn transient_patterns_are_case_insensitive() {
        assert!(is_transient_message("Service Unavailable"));
        assert!(is_transient_message("request TIMED OUT upstream"));
        assert!(!is_transient_message("body failed validation"));
    }

    proptest! {
        #[test]
        fn at_most_n_plus_one_attempts(max_retries in 0u32..5, code in 500u16..600) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let script = (0..10).map(|_| status(code)).collect();
            let transport = RetryingTransport::new(MockClient::scripted(script));

            let response = runtime
                .block_on(transport.execute(request(), &policy(max_retries)))
                .unwrap();

            prop_assert_eq!(response.status, code);
            prop_assert_eq!(transport.client().calls(), max_retries as usize + 1);
        }

        #[test]
        fn retriable_status_classification(code in 400u16..600) {
            let expected = code == 409 || code == 429 || code >= 500;
            prop_assert_eq!(is_retriable_status(code), expected);
        }
    }
}
