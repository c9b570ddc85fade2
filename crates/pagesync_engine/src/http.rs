//! HTTP client abstraction.
//!
//! The engine talks to the remote through the [`HttpClient`] trait so the
//! actual HTTP stack can be swapped: [`ReqwestClient`] for real traffic,
//! [`LoopbackClient`] to route requests into an in-process server.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use pagesync_protocol::ApiErrorBody;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// HTTP verbs used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Returns the verb in upper case.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request.
#[derive(Clone)]
pub struct HttpRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Fully-qualified URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body, absent for bodiless calls.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for HttpRequest {
    // Header values are left out: one of them is the bearer token.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field(
                "headers",
                &self.headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish()
    }
}

/// A response as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> SyncResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode response: {e}")))
    }

    /// Returns the `message` field of a JSON error body.
    ///
    /// Bodies that are not JSON, or carry no message, yield `None`.
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_slice::<ApiErrorBody>(&self.body)
            .ok()
            .and_then(|body| body.message)
    }
}

/// HTTP client abstraction.
///
/// `Err` means no response was obtained at all (connection refused, DNS,
/// timeout). Any response, including 4xx/5xx, is `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends one request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport_fatal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| e.without_url().to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.without_url().to_string())?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles one request and returns the response.
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing without network overhead. An optional latency is
/// awaited before each request is handed over, and the client records how
/// many requests were in flight at once.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: AtomicUsize,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        }
    }

    /// Sets the simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the wrapped server.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Highest number of requests observed in flight simultaneously.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Total requests sent.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.server.handle(&request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoServer;

    impl LoopbackServer for EchoServer {
        fn handle(&self, request: &HttpRequest) -> HttpResponse {
            HttpResponse::json_body(200, &json!({ "url": request.url }))
        }
    }

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![("Authorization".into(), "Bearer secret_xyz".into())],
            body: None,
        }
    }

    #[test]
    fn response_status_classes() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
    }

    #[test]
    fn error_message_parsing() {
        let response = HttpResponse::json_body(400, &json!({ "message": "bad block" }));
        assert_eq!(response.error_message().as_deref(), Some("bad block"));

        assert!(HttpResponse::new(502, "<html>gateway</html>").error_message().is_none());
        assert!(HttpResponse::json_body(500, &json!({})).error_message().is_none());
    }

    #[test]
    fn request_debug_hides_header_values() {
        let printed = format!("{:?}", get("https://api.example.com/v1/pages"));
        assert!(printed.contains("Authorization"));
        assert!(!printed.contains("secret_xyz"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = get("https://x");
        assert_eq!(request.header("authorization"), Some("Bearer secret_xyz"));
        assert_eq!(request.header("content-type"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn loopback_tracks_concurrency() {
        let client = LoopbackClient::new(EchoServer).with_latency(Duration::from_millis(50));

        let (a, b, c) = tokio::join!(
            client.send(get("https://x/a")),
            client.send(get("https://x/b")),
            client.send(get("https://x/c")),
        );

        assert_eq!(a.unwrap().status, 200);
        assert!(b.is_ok() && c.is_ok());
        assert_eq!(client.peak_in_flight(), 3);
        assert_eq!(client.request_count(), 3);

        client.send(get("https://x/d")).await.unwrap();
        assert_eq!(client.peak_in_flight(), 3);
    }
}
