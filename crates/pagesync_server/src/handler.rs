//! Request routing and endpoint handlers.

use crate::auth::BearerAuth;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::BlockStore;
use pagesync_protocol::endpoints::{PAGE_SIZE_PARAM, START_CURSOR_PARAM};
use pagesync_protocol::{AppendChildrenRequest, CreatePageRequest, UpdatePageRequest};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Endpoints the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `POST /pages`
    CreatePage,
    /// `GET /pages/{id}`
    GetPage,
    /// `PATCH /pages/{id}`
    UpdatePage,
    /// `GET /blocks/{id}/children`
    ListChildren,
    /// `PATCH /blocks/{id}/children`
    AppendChildren,
    /// `DELETE /blocks/{id}`
    DeleteBlock,
}

/// A parsed request: route, target ID and query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Matched route.
    pub route: Route,
    /// Page or block ID from the path (empty for `POST /pages`).
    pub target: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
}

/// One incoming request.
#[derive(Debug, Clone, Copy)]
pub struct ApiRequest<'a> {
    /// HTTP verb (`GET`, `POST`, `PATCH`, `DELETE`).
    pub method: &'a str,
    /// Full URL or path with query.
    pub url: &'a str,
    /// `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// API version header value.
    pub api_version: Option<&'a str>,
    /// JSON body.
    pub body: Option<&'a [u8]>,
}

/// A scripted failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Route the fault applies to.
    pub route: Route,
    /// Only requests for this page or block ID, if set.
    pub target: Option<String>,
    /// Status to answer with.
    pub status: u16,
    /// Error message to answer with.
    pub message: String,
    /// Requests left to fail.
    pub remaining: usize,
}

impl Fault {
    /// Fails the next request to `route` once.
    pub fn new(route: Route, status: u16, message: impl Into<String>) -> Self {
        Self {
            route,
            target: None,
            status,
            message: message.into(),
            remaining: 1,
        }
    }

    /// Restricts the fault to requests for `target`.
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Fails `count` matching requests.
    pub fn times(mut self, count: usize) -> Self {
        self.remaining = count;
        self
    }

    fn matches(&self, resolved: &Resolved) -> bool {
        self.remaining > 0
            && self.route == resolved.route
            && self.target.as_deref().map_or(true, |t| t == resolved.target)
    }
}

/// A request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// HTTP verb.
    pub method: String,
    /// Path without host or query.
    pub path: String,
    /// Status answered.
    pub status: u16,
}

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Page and block storage.
    pub store: Arc<BlockStore>,
    auth: BearerAuth,
    faults: Mutex<Vec<Fault>>,
    log: Mutex<Vec<RequestRecord>>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<BlockStore>) -> Self {
        let auth = BearerAuth::new(config.tokens.iter().cloned());
        Self {
            config,
            store,
            auth,
            faults: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Queues a fault.
    pub fn inject(&self, fault: Fault) {
        self.faults.lock().push(fault);
    }

    /// Removes every pending fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    fn take_fault(&self, resolved: &Resolved) -> Option<Fault> {
        let mut faults = self.faults.lock();
        let index = faults.iter().position(|f| f.matches(resolved))?;
        let fault = &mut faults[index];
        fault.remaining -= 1;
        let hit = fault.clone();
        if fault.remaining == 0 {
            faults.remove(index);
        }
        Some(hit)
    }

    fn record(&self, method: &str, path: &str, status: u16) {
        self.log.lock().push(RequestRecord {
            method: method.to_string(),
            path: path.to_string(),
            status,
        });
    }

    /// Every request handled so far.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.log.lock().clone()
    }
}

/// Parses an absolute URL, or a path resolved against a placeholder host.
fn parse_url(raw: &str) -> ServerResult<Url> {
    let base = Url::parse("http://localhost/")
        .map_err(|e| ServerError::Internal(format!("invalid base url: {e}")))?;
    base.join(raw)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid request url {raw}: {e}")))
}

/// Matches `method` and `url` against the known routes.
///
/// Leading path segments before `pages` or `blocks` (such as a version
/// prefix) are ignored. The target is the raw path segment.
pub fn resolve(method: &str, url: &str) -> ServerResult<Resolved> {
    let parsed = parse_url(url)?;
    let path = parsed.path();
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let start = segments
        .iter()
        .position(|s| *s == "pages" || *s == "blocks")
        .ok_or_else(|| ServerError::NotFound(format!("invalid request url {path}")))?;

    let route = match (method.to_ascii_uppercase().as_str(), &segments[start..]) {
        ("POST", ["pages"]) => (Route::CreatePage, ""),
        ("GET", ["pages", id]) => (Route::GetPage, *id),
        ("PATCH", ["pages", id]) => (Route::UpdatePage, *id),
        ("GET", ["blocks", id, "children"]) => (Route::ListChildren, *id),
        ("PATCH", ["blocks", id, "children"]) => (Route::AppendChildren, *id),
        ("DELETE", ["blocks", id]) => (Route::DeleteBlock, *id),
        _ => {
            return Err(ServerError::NotFound(format!(
                "invalid request url {method} {path}"
            )))
        }
    };

    Ok(Resolved {
        route: route.0,
        target: route.1.to_string(),
        query: parsed.query_pairs().into_owned().collect(),
    })
}

fn parse_body<T: DeserializeOwned>(body: Option<&[u8]>) -> ServerResult<T> {
    let body = body.ok_or_else(|| ServerError::InvalidRequest("body is required".into()))?;
    serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidRequest(format!("body failed validation: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> ServerResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ServerError::Internal(format!("failed to encode response: {e}")))
}

/// Handler for API requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles one request, returning status and JSON body.
    pub fn handle(&self, request: ApiRequest<'_>) -> (u16, Value) {
        let path = parse_url(request.url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| request.url.to_string());
        let path = path.as_str();
        let result = self.dispatch(&request);
        let (status, body) = match result {
            Ok(value) => (200, value),
            Err(err) => {
                debug!(method = request.method, path, error = %err, "request rejected");
                let body = to_json(&err.to_body()).unwrap_or(Value::Null);
                (err.status(), body)
            }
        };
        self.context.record(request.method, path, status);
        (status, body)
    }

    fn dispatch(&self, request: &ApiRequest<'_>) -> ServerResult<Value> {
        let config = &self.context.config;
        if config.require_auth {
            self.context.auth.validate(request.authorization)?;
        }
        if let Some(expected) = config.api_version.as_deref() {
            if request.api_version != Some(expected) {
                return Err(ServerError::InvalidRequest(format!(
                    "API version header must be {expected}"
                )));
            }
        }

        let resolved = resolve(request.method, request.url)?;
        if let Some(fault) = self.context.take_fault(&resolved) {
            debug!(route = ?resolved.route, status = fault.status, "injected fault");
            return Err(ServerError::Injected {
                status: fault.status,
                message: fault.message,
            });
        }

        let store = &self.context.store;
        match resolved.route {
            Route::CreatePage => {
                let body: CreatePageRequest = parse_body(request.body)?;
                self.check_batch(body.children.len())?;
                to_json(&store.create_page(body)?)
            }
            Route::GetPage => to_json(&store.get_page(&resolved.target)?),
            Route::UpdatePage => {
                let body: UpdatePageRequest = parse_body(request.body)?;
                to_json(&store.update_page(&resolved.target, body)?)
            }
            Route::ListChildren => {
                let page_size = match resolved.query.get(PAGE_SIZE_PARAM) {
                    Some(raw) => raw.parse::<usize>().map_err(|_| {
                        ServerError::InvalidRequest(format!("page_size must be a number, got {raw}"))
                    })?,
                    None => config.max_page_size,
                };
                let cursor = resolved.query.get(START_CURSOR_PARAM).map(String::as_str);
                let list = store.list_children(
                    &resolved.target,
                    cursor,
                    page_size.min(config.max_page_size),
                )?;
                to_json(&list)
            }
            Route::AppendChildren => {
                let body: AppendChildrenRequest = parse_body(request.body)?;
                self.check_batch(body.children.len())?;
                to_json(&store.append_children(&resolved.target, body.children)?)
            }
            Route::DeleteBlock => to_json(&store.delete_block(&resolved.target)?),
        }
    }

    fn check_batch(&self, count: usize) -> ServerResult<()> {
        let limit = self.context.config.max_children_per_request;
        if count > limit {
            return Err(ServerError::InvalidRequest(format!(
                "body.children.length should be ≤ {limit}, instead was {count}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_handler(config: ServerConfig) -> (RequestHandler, Arc<HandlerContext>) {
        let store = Arc::new(BlockStore::default());
        let context = Arc::new(HandlerContext::new(config, store));
        (RequestHandler::new(Arc::clone(&context)), context)
    }

    fn request<'a>(method: &'a str, url: &'a str, body: Option<&'a [u8]>) -> ApiRequest<'a> {
        ApiRequest {
            method,
            url,
            authorization: Some("Bearer secret_test"),
            api_version: Some("2022-06-28"),
            body,
        }
    }

    #[test]
    fn resolves_routes_behind_version_prefix() {
        let resolved = resolve(
            "GET",
            "https://api.example.com/v1/blocks/b1/children?page_size=2&start_cursor=c%2D1",
        )
        .unwrap();
        assert_eq!(resolved.route, Route::ListChildren);
        assert_eq!(resolved.target, "b1");
        assert_eq!(resolved.query.get("page_size").map(String::as_str), Some("2"));
        assert_eq!(resolved.query.get("start_cursor").map(String::as_str), Some("c-1"));

        assert_eq!(resolve("POST", "/pages").unwrap().route, Route::CreatePage);
        assert_eq!(resolve("delete", "/v1/blocks/x").unwrap().route, Route::DeleteBlock);
        assert!(resolve("PUT", "/v1/pages/x").is_err());
        assert!(resolve("GET", "/v1/users").is_err());
    }

    #[test]
    fn query_values_are_decoded() {
        let resolved = resolve(
            "GET",
            "https://api.example.com/v1/blocks/b1/children?start_cursor=a%20b+c&page_size=5&flag",
        )
        .unwrap();
        assert_eq!(resolved.query.get("start_cursor").map(String::as_str), Some("a b c"));
        assert_eq!(resolved.query.get("page_size").map(String::as_str), Some("5"));
        assert_eq!(resolved.query.get("flag").map(String::as_str), Some(""));

        // Scheme and host are case-insensitive; the path is not.
        let resolved = resolve("GET", "HTTPS://API.EXAMPLE.COM/v1/pages/p1").unwrap();
        assert_eq!(resolved.route, Route::GetPage);
        assert!(resolve("GET", "https://api.example.com/v1/PAGES/p1").is_err());
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let err = resolve("GET", "http://[::1/pages/p1").unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn create_then_list() {
        let (handler, _) = create_handler(ServerConfig::default());
        let body = json!({
            "parent": { "type": "page_id", "page_id": "root" },
            "properties": {},
            "children": [
                { "object": "block", "type": "paragraph", "paragraph": { "rich_text": [] } }
            ]
        })
        .to_string();

        let (status, page) = handler.handle(request("POST", "/v1/pages", Some(body.as_bytes())));
        assert_eq!(status, 200);
        let id = page["id"].as_str().unwrap().to_string();

        let url = format!("/v1/blocks/{id}/children?page_size=10");
        let (status, list) = handler.handle(request("GET", &url, None));
        assert_eq!(status, 200);
        assert_eq!(list["results"].as_array().unwrap().len(), 1);
        assert_eq!(list["has_more"], json!(false));
    }

    #[test]
    fn oversized_append_is_rejected() {
        let (handler, context) = create_handler(ServerConfig::default().with_max_children(2));
        context.store.insert_titled_page("p1", pagesync_protocol::ParentReference::page("root"), "T");
        let children: Vec<_> = (0..3)
            .map(|_| json!({ "type": "divider", "divider": {} }))
            .collect();
        let body = json!({ "children": children }).to_string();

        let (status, error) = handler.handle(request(
            "PATCH",
            "/v1/blocks/p1/children",
            Some(body.as_bytes()),
        ));
        assert_eq!(status, 400);
        assert_eq!(error["code"], json!("validation_error"));
    }

    #[test]
    fn auth_and_version_are_enforced() {
        let config = ServerConfig::default()
            .with_token("secret_test")
            .with_api_version("2022-06-28");
        let (handler, _) = create_handler(config);

        let mut unauthenticated = request("GET", "/v1/pages/p1", None);
        unauthenticated.authorization = None;
        assert_eq!(handler.handle(unauthenticated).0, 401);

        let mut unversioned = request("GET", "/v1/pages/p1", None);
        unversioned.api_version = None;
        assert_eq!(handler.handle(unversioned).0, 400);

        assert_eq!(handler.handle(request("GET", "/v1/pages/p1", None)).0, 404);
    }

    #[test]
    fn faults_fire_then_clear() {
        let (handler, context) = create_handler(ServerConfig::default());
        context.store.insert_titled_page("p1", pagesync_protocol::ParentReference::page("root"), "T");
        context.inject(Fault::new(Route::GetPage, 503, "service unavailable").times(2));

        assert_eq!(handler.handle(request("GET", "/v1/pages/p1", None)).0, 503);
        assert_eq!(handler.handle(request("GET", "/v1/pages/p1", None)).0, 503);
        assert_eq!(handler.handle(request("GET", "/v1/pages/p1", None)).0, 200);

        let log = context.requests();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].path, "/v1/pages/p1");
    }

    #[test]
    fn targeted_fault_only_hits_its_block() {
        let (handler, context) = create_handler(ServerConfig::default());
        context.inject(Fault::new(Route::DeleteBlock, 400, "locked").for_target("b2"));

        assert_eq!(handler.handle(request("DELETE", "/v1/blocks/b1", None)).0, 404);
        let (status, body) = handler.handle(request("DELETE", "/v1/blocks/b2", None));
        assert_eq!(status, 400);
        assert_eq!(body["message"], json!("locked"));
    }
}
