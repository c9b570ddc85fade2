//! Shared helpers for unit tests.

use crate::config::{EngineConfig, RetryPolicy};
use crate::executor::RequestExecutor;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use pagesync_protocol::Block;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = Box<dyn Fn(&HttpRequest, usize) -> Result<HttpResponse, String> + Send + Sync>;

/// Programmable HTTP client that records every request.
pub(crate) struct MockClient {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockClient {
    /// Answers each request with `responder(request, call_index)`.
    pub(crate) fn new(
        responder: impl Fn(&HttpRequest, usize) -> Result<HttpResponse, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answers requests from `script` in order, then with `200 {}`.
    pub(crate) fn scripted(script: Vec<Result<HttpResponse, String>>) -> Self {
        let script = Mutex::new(VecDeque::from(script));
        Self::new(move |_, _| {
            script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "{}")))
        })
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = (self.responder)(&request, index);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Shorthand for a bare status response.
pub(crate) fn status(code: u16) -> Result<HttpResponse, String> {
    Ok(HttpResponse::new(code, ""))
}

/// A `BlockList` page response.
pub(crate) fn page_of(blocks: &[Block], next_cursor: Option<&str>) -> Result<HttpResponse, String> {
    Ok(HttpResponse::json_body(
        200,
        &json!({
            "object": "list",
            "results": blocks,
            "has_more": next_cursor.is_some(),
            "next_cursor": next_cursor,
        }),
    ))
}

/// Executor with a token and retry policies that keep tests fast.
pub(crate) fn executor(client: MockClient) -> RequestExecutor<MockClient> {
    RequestExecutor::new(&fast_config(), client)
}

/// Configuration with a token and millisecond-scale delays.
pub(crate) fn fast_config() -> EngineConfig {
    let quick = RetryPolicy::new(1, Duration::from_millis(10));
    EngineConfig::new("https://api.example.com/v1")
        .with_token("secret_test_token")
        .with_retry(quick, quick, quick)
        .with_delete_wave_delay(Duration::from_millis(1000))
        .with_append_batch_delay(Duration::from_millis(350))
}

/// Persisted paragraph with the given id.
pub(crate) fn stored(id: &str) -> Block {
    Block::paragraph(id).with_id(id)
}
