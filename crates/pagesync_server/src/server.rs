//! Reference block-store server.

use crate::config::ServerConfig;
use crate::handler::{ApiRequest, Fault, HandlerContext, RequestHandler, RequestRecord, Route};
use crate::store::BlockStore;
use pagesync_protocol::{Block, ParentReference};
use std::sync::Arc;

/// Status and JSON body of a handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// HTTP status.
    pub status: u16,
    /// Encoded JSON body.
    pub body: Vec<u8>,
}

/// In-process server for the block-document API.
///
/// Holds pages and blocks in memory and answers the same requests as the
/// remote service: page create/fetch/update, cursor-paginated child
/// listing, batched appends and block deletes. Faults can be scripted per
/// route (and per target ID) to exercise retry and partial-failure paths.
///
/// # Example
///
/// ```
/// use pagesync_server::{ApiRequest, BlockStoreServer, ServerConfig};
///
/// let server = BlockStoreServer::new(ServerConfig::default());
/// let response = server.handle(ApiRequest {
///     method: "GET",
///     url: "https://api.example.com/v1/pages/missing",
///     authorization: None,
///     api_version: None,
///     body: None,
/// });
/// assert_eq!(response.status, 404);
/// ```
pub struct BlockStoreServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl BlockStoreServer {
    /// Creates a server with an empty store.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(BlockStore::new(config.public_host.clone()));
        Self::with_store(config, store)
    }

    /// Creates a server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<BlockStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Handles one request.
    pub fn handle(&self, request: ApiRequest<'_>) -> ServerResponse {
        let (status, body) = self.handler.handle(request);
        ServerResponse {
            status,
            body: serde_json::to_vec(&body).unwrap_or_default(),
        }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<BlockStore> {
        &self.context.store
    }

    /// Creates a page under a known ID with the given children.
    pub fn seed_page(&self, id: &str, title: &str, children: Vec<Block>) {
        let store = &self.context.store;
        store.insert_titled_page(id, ParentReference::page("workspace"), title);
        if !children.is_empty() {
            // The page was just inserted, so the parent always exists.
            let _ = store.append_children(id, children);
        }
    }

    /// Queues a fault.
    pub fn inject(&self, fault: Fault) {
        self.context.inject(fault);
    }

    /// Fails the next request to `route` with `status` and `message`.
    pub fn fail_next(&self, route: Route, status: u16, message: impl Into<String>) {
        self.inject(Fault::new(route, status, message));
    }

    /// Removes every pending fault.
    pub fn clear_faults(&self) {
        self.context.clear_faults();
    }

    /// Every request handled so far.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.context.requests()
    }

    /// Number of handled requests matching `method` (case-insensitive).
    pub fn count(&self, method: &str) -> usize {
        self.context
            .requests()
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case(method))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn get<'a>(url: &'a str) -> ApiRequest<'a> {
        ApiRequest {
            method: "GET",
            url,
            authorization: None,
            api_version: None,
            body: None,
        }
    }

    fn json(response: &ServerResponse) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn server_lifecycle() {
        let server = BlockStoreServer::new(ServerConfig::default());
        assert_eq!(server.store().page_count(), 0);

        server.seed_page("p1", "Notes", vec![Block::paragraph("a")]);
        assert_eq!(server.store().page_count(), 1);

        let response = server.handle(get("https://api.example.com/v1/pages/p1"));
        assert_eq!(response.status, 200);
        assert_eq!(json(&response)["id"], "p1");
    }

    #[test]
    fn scripted_failure_then_recovery() {
        let server = BlockStoreServer::new(ServerConfig::default());
        server.seed_page("p1", "Notes", Vec::new());
        server.fail_next(Route::ListChildren, 429, "rate limited");

        let url = "https://api.example.com/v1/blocks/p1/children";
        assert_eq!(server.handle(get(url)).status, 429);
        assert_eq!(server.handle(get(url)).status, 200);
        assert_eq!(server.count("get"), 2);
    }

    #[test]
    fn shared_store() {
        let store = Arc::new(BlockStore::default());
        let server = BlockStoreServer::with_store(ServerConfig::default(), Arc::clone(&store));

        server.seed_page("p1", "Notes", vec![Block::divider(), Block::divider()]);
        assert_eq!(store.children_of("p1").len(), 2);
    }
}
