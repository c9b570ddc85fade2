//! Server configuration.

use pagesync_protocol::{MAX_BLOCKS_PER_REQUEST, MAX_PAGE_SIZE};

/// Configuration for the reference server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest `page_size` honored when listing children.
    pub max_page_size: usize,
    /// Most children accepted by one create or append call.
    pub max_children_per_request: usize,
    /// Whether to require a bearer token.
    pub require_auth: bool,
    /// Accepted bearer tokens (if auth enabled).
    pub tokens: Vec<String>,
    /// Required API version header value, if any.
    pub api_version: Option<String>,
    /// Host used to build page URLs.
    pub public_host: String,
}

impl ServerConfig {
    /// Creates a configuration with the API's documented limits.
    pub fn new() -> Self {
        Self {
            max_page_size: MAX_PAGE_SIZE,
            max_children_per_request: MAX_BLOCKS_PER_REQUEST,
            require_auth: false,
            tokens: Vec::new(),
            api_version: None,
            public_host: "https://pagesync.local".into(),
        }
    }

    /// Sets the largest list page.
    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size.max(1);
        self
    }

    /// Sets the per-call children limit.
    pub fn with_max_children(mut self, limit: usize) -> Self {
        self.max_children_per_request = limit.max(1);
        self
    }

    /// Enables authentication and accepts `token`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.require_auth = true;
        self.tokens.push(token.into());
        self
    }

    /// Requires the API version header to equal `version`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
