//! Authenticated request execution.

use crate::config::{ApiToken, EngineConfig, RetryPolicy};
use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::request::{QueryParams, RequestBuilder};
use crate::sanitize::{DefaultSanitizer, ErrorSanitizer};
use crate::transport::RetryingTransport;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-call options.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Verb.
    pub method: HttpMethod,
    /// JSON body; omitted from the request when `None`.
    pub body: Option<Value>,
    /// Query parameters.
    pub query: QueryParams,
    /// Retry policy; the executor default when `None`.
    pub retry: Option<RetryPolicy>,
}

impl CallOptions {
    fn new(method: HttpMethod, body: Option<Value>) -> Self {
        Self {
            method,
            body,
            query: QueryParams::new(),
            retry: None,
        }
    }

    /// A bodiless GET.
    pub fn get() -> Self {
        Self::new(HttpMethod::Get, None)
    }

    /// A POST with a JSON body.
    pub fn post(body: Value) -> Self {
        Self::new(HttpMethod::Post, Some(body))
    }

    /// A PATCH with a JSON body.
    pub fn patch(body: Value) -> Self {
        Self::new(HttpMethod::Patch, Some(body))
    }

    /// A bodiless DELETE.
    pub fn delete() -> Self {
        Self::new(HttpMethod::Delete, None)
    }

    /// Sets the query parameters.
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Combines URL building, the auth check and retrying execution.
///
/// One executor is one execution context: the credential it holds is used
/// for every call it makes. Callers serving several tenants create one
/// executor per credential.
pub struct RequestExecutor<C: HttpClient> {
    builder: RequestBuilder,
    transport: RetryingTransport<C>,
    token: RwLock<Option<ApiToken>>,
    default_retry: RetryPolicy,
    sanitizer: Arc<dyn ErrorSanitizer>,
}

impl<C: HttpClient> RequestExecutor<C> {
    /// Creates an executor from the engine configuration.
    pub fn new(config: &EngineConfig, client: C) -> Self {
        Self {
            builder: RequestBuilder::new(&config.base_url, &config.api_version),
            transport: RetryingTransport::new(client),
            token: RwLock::new(config.token.clone()),
            default_retry: config.write_retry,
            sanitizer: Arc::new(DefaultSanitizer),
        }
    }

    /// Replaces the error sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn ErrorSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Uses `cancel` to abort in-flight retry loops.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.transport = self.transport.with_cancellation(cancel);
        self
    }

    /// Swaps the credential used by subsequent calls.
    pub fn set_token(&self, token: Option<ApiToken>) {
        *self.token.write() = token;
    }

    /// Returns true if a usable credential is configured.
    pub fn has_token(&self) -> bool {
        self.token.read().as_ref().is_some_and(|t| !t.is_blank())
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &C {
        self.transport.client()
    }

    /// Returns the cancellation token observed by retry loops.
    pub fn cancellation(&self) -> &CancellationToken {
        self.transport.cancellation()
    }

    /// Runs `raw` through the configured sanitizer.
    pub fn sanitize(&self, raw: &str, context: &str) -> String {
        self.sanitizer.sanitize(raw, context)
    }

    /// Converts a non-success response into a sanitized [`SyncError::Api`].
    pub fn api_error(&self, response: &HttpResponse, context: &str) -> SyncError {
        let raw = response
            .error_message()
            .unwrap_or_else(|| format!("HTTP {}", response.status));
        SyncError::Api {
            status: response.status,
            message: self.sanitize(&raw, context),
        }
    }

    /// Sanitized display string for any engine error.
    pub fn describe(&self, error: &SyncError, context: &str) -> String {
        match error {
            // Already sanitized when it was created.
            SyncError::Api { message, .. } => message.clone(),
            other => self.sanitize(&other.to_string(), context),
        }
    }

    /// Issues one authenticated call.
    ///
    /// Fails with [`SyncError::MissingCredential`] before touching the network
    /// when no credential is configured. Non-success responses are returned
    /// as `Ok`; use [`RequestExecutor::api_error`] to turn them into errors.
    pub async fn call(&self, path: &str, options: CallOptions) -> SyncResult<HttpResponse> {
        let token = self
            .token
            .read()
            .clone()
            .filter(|t| !t.is_blank())
            .ok_or(SyncError::MissingCredential)?;

        let url = self.builder.url(path, &options.query)?;
        let body = options
            .body
            .map(|value| serde_json::to_vec(&value))
            .transpose()
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))?;

        let request = HttpRequest {
            method: options.method,
            url,
            headers: self.builder.headers(&token),
            body,
        };

        let retry = options.retry.unwrap_or(self.default_retry);
        self.transport.execute(request, &retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingClient {
        requests: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.requests.lock().push(request);
            Ok(HttpResponse::json_body(400, &json!({ "message": "bad secret_ABCDEFGH1234" })))
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::new("https://api.example.com/v1").with_token("secret_abc")
    }

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let executor = RequestExecutor::new(&EngineConfig::new("https://x/v1"), RecordingClient::default());
        let err = executor.call("/pages/p1", CallOptions::get()).await.unwrap_err();

        assert!(matches!(err, SyncError::MissingCredential));
        assert!(executor.client().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let executor = RequestExecutor::new(&config(), RecordingClient::default());
        executor.set_token(Some(ApiToken::new("  ")));
        assert!(!executor.has_token());
        let err = executor.call("/pages/p1", CallOptions::get()).await.unwrap_err();
        assert!(matches!(err, SyncError::MissingCredential));
    }

    #[tokio::test]
    async fn bodiless_calls_send_no_body() {
        let executor = RequestExecutor::new(&config(), RecordingClient::default());
        executor
            .call(
                "/blocks/b1/children",
                CallOptions::get().with_query(QueryParams::new().with("page_size", 100)),
            )
            .await
            .unwrap();

        let requests = executor.client().requests.lock();
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert!(requests[0].body.is_none());
        assert_eq!(
            requests[0].url,
            "https://api.example.com/v1/blocks/b1/children?page_size=100"
        );
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret_abc"));
    }

    #[tokio::test]
    async fn json_body_is_serialized() {
        let executor = RequestExecutor::new(&config(), RecordingClient::default());
        executor
            .call("/pages", CallOptions::post(json!({ "a": 1 })))
            .await
            .unwrap();

        let requests = executor.client().requests.lock();
        let body: Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn token_swap_applies_to_next_call() {
        let executor = RequestExecutor::new(&config(), RecordingClient::default());
        executor.set_token(Some(ApiToken::new("secret_other")));
        executor.call("/pages/p1", CallOptions::get()).await.unwrap();

        let requests = executor.client().requests.lock();
        assert_eq!(requests[0].header("Authorization"), Some("Bearer secret_other"));
    }

    #[tokio::test]
    async fn api_errors_are_sanitized() {
        let executor = RequestExecutor::new(&config(), RecordingClient::default());
        let response = executor.call("/pages/p1", CallOptions::get()).await.unwrap();
        let err = executor.api_error(&response, "fetch page");

        match &err {
            SyncError::Api { status, message } => {
                assert_eq!(*status, 400);
                assert!(message.starts_with("fetch page: "));
                assert!(!message.contains("secret_ABCDEFGH1234"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.describe(&err, "ignored"), err_message(&err));
    }

    fn err_message(err: &SyncError) -> String {
        match err {
            SyncError::Api { message, .. } => message.clone(),
            _ => String::new(),
        }
    }
}
