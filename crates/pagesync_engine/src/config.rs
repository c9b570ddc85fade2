//! Configuration for the sync engine.

use pagesync_protocol::endpoints::DEFAULT_API_VERSION;
use pagesync_protocol::{MAX_BLOCKS_PER_REQUEST, MAX_PAGE_SIZE};
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default API base URL, including the version segment.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// Upper bound (exclusive) of the random jitter added to retry delays, in milliseconds.
pub const MAX_JITTER_MS: u64 = 200;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "PAGESYNC_TOKEN";
/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "PAGESYNC_BASE_URL";
/// Environment variable overriding the API version.
pub const API_VERSION_ENV: &str = "PAGESYNC_API_VERSION";

/// Bearer credential for the remote API.
///
/// The secret is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Retry behavior for one class of request.
///
/// A policy allows `max_retries + 1` attempts. The delay after a failed
/// attempt `n` (0-indexed) is `base_delay * 2^n` plus a jitter below
/// [`MAX_JITTER_MS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, without jitter.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Policy for idempotent reads: retried quickly.
    pub fn read() -> Self {
        Self::new(2, Duration::from_millis(500))
    }

    /// Policy for creates and appends.
    pub fn write() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }

    /// Policy for single-block deletes.
    pub fn delete() -> Self {
        Self::new(2, Duration::from_millis(500))
    }

    /// Creates a policy with no retries.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::from_millis(1))
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Exponential part of the delay after failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor)
    }

    /// Full delay after failed attempt `attempt`, including jitter.
    ///
    /// Jitter is drawn from the operating system RNG so that many clients
    /// retrying at once do not line up.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter = OsRng.gen_range(0..MAX_JITTER_MS);
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::write()
    }
}

/// Property names used when a document is created inside a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    /// Title property name.
    pub title_property: String,
    /// URL property name, if the collection has one.
    pub url_property: Option<String>,
}

impl Default for CollectionSchema {
    fn default() -> Self {
        Self {
            title_property: "Name".into(),
            url_property: Some("URL".into()),
        }
    }
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Versioned base URL (e.g., "https://api.notion.com/v1").
    pub base_url: String,
    /// Value of the API version header.
    pub api_version: String,
    /// Bearer credential.
    pub token: Option<ApiToken>,
    /// `page_size` used when listing children.
    pub page_size: usize,
    /// Maximum children per write call.
    pub max_batch_size: usize,
    /// Deletes in flight at once.
    pub delete_concurrency: usize,
    /// Pause between delete waves.
    pub delete_wave_delay: Duration,
    /// Pause between append batches.
    pub append_batch_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Heading text that opens the highlight section.
    pub section_marker: String,
    /// Property names for collection parents.
    pub collection_schema: CollectionSchema,
    /// Retry policy for list and fetch calls.
    pub read_retry: RetryPolicy,
    /// Retry policy for create, update and append calls.
    pub write_retry: RetryPolicy,
    /// Retry policy for deletes.
    pub delete_retry: RetryPolicy,
}

impl EngineConfig {
    /// Creates a configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.into(),
            token: None,
            page_size: MAX_PAGE_SIZE,
            max_batch_size: MAX_BLOCKS_PER_REQUEST,
            delete_concurrency: 3,
            delete_wave_delay: Duration::from_millis(1000),
            append_batch_delay: Duration::from_millis(350),
            timeout: Duration::from_secs(30),
            section_marker: "Highlights".into(),
            collection_schema: CollectionSchema::default(),
            read_retry: RetryPolicy::read(),
            write_retry: RetryPolicy::write(),
            delete_retry: RetryPolicy::delete(),
        }
    }

    /// Builds a configuration from `PAGESYNC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.base_url = url;
        }
        if let Ok(version) = std::env::var(API_VERSION_ENV) {
            config.api_version = version;
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.token = Some(ApiToken::new(token));
        }
        config
    }

    /// Sets the bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(ApiToken::new(token));
        self
    }

    /// Sets the API version header value.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the list page size (clamped to the API maximum).
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Sets the write batch size (clamped to the API maximum).
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.clamp(1, MAX_BLOCKS_PER_REQUEST);
        self
    }

    /// Sets the delete concurrency cap.
    pub fn with_delete_concurrency(mut self, limit: usize) -> Self {
        self.delete_concurrency = limit.max(1);
        self
    }

    /// Sets the pause between delete waves.
    pub fn with_delete_wave_delay(mut self, delay: Duration) -> Self {
        self.delete_wave_delay = delay;
        self
    }

    /// Sets the pause between append batches.
    pub fn with_append_batch_delay(mut self, delay: Duration) -> Self {
        self.append_batch_delay = delay;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the highlight section marker.
    pub fn with_section_marker(mut self, marker: impl Into<String>) -> Self {
        self.section_marker = marker.into();
        self
    }

    /// Sets the collection property names.
    pub fn with_collection_schema(mut self, schema: CollectionSchema) -> Self {
        self.collection_schema = schema;
        self
    }

    /// Sets all three retry policies at once.
    pub fn with_retry(mut self, read: RetryPolicy, write: RetryPolicy, delete: RetryPolicy) -> Self {
        self.read_retry = read;
        self.write_retry = write;
        self.delete_retry = delete;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
