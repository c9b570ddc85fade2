//! URL and header construction.

use crate::config::ApiToken;
use crate::error::{SyncError, SyncResult};
use pagesync_protocol::endpoints::API_VERSION_HEADER;
use url::Url;
use tracing::error;

/// Ordered query parameters; `None` values are dropped when the URL is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, Option<String>)>);

impl QueryParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), Some(value.to_string())));
        self
    }

    /// Adds a parameter that is skipped when `value` is `None`.
    pub fn with_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.0.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}

/// Builds URLs and headers against a versioned base path.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    api_version: String,
}

impl RequestBuilder {
    /// Creates a builder for `base_url` (which may include a version segment).
    pub fn new(base_url: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: api_version.into(),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL and appends the present query parameters.
    ///
    /// The base and path are concatenated as strings before parsing, so a
    /// version prefix such as `/v1` in the base is never discarded.
    pub fn url(&self, path: &str, query: &QueryParams) -> SyncResult<String> {
        build_url(&self.base_url, path, query)
    }

    /// Returns the authorization, content type and version headers.
    pub fn headers(&self, token: &ApiToken) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", token.expose()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
            (API_VERSION_HEADER.to_string(), self.api_version.clone()),
        ]
    }
}

/// Builds one fully-qualified URL.
pub fn build_url(base_url: &str, path: &str, query: &QueryParams) -> SyncResult<String> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );

    let mut url = Url::parse(&joined).map_err(|e| {
        error!(base_url, path, error = %e, "failed to build request URL");
        SyncError::UrlConstruction {
            path: path.to_string(),
            message: e.to_string(),
        }
    })?;

    let mut present = query.present().peekable();
    if present.peek().is_some() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in present {
            pairs.append_pair(key, value);
        }
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_base_path_and_drops_null_params() {
        let query = QueryParams::new().with("a", 1).with_opt::<u32>("b", None);
        let url = build_url("https://api.example.com/v1/", "/pages", &query).unwrap();
        assert!(url.ends_with("/v1/pages?a=1"), "{url}");
    }

    #[test]
    fn adds_missing_leading_slash() {
        let url = build_url("https://api.example.com/v1", "blocks/x/children", &QueryParams::new())
            .unwrap();
        assert_eq!(url, "https://api.example.com/v1/blocks/x/children");
    }

    #[test]
    fn no_query_string_without_params() {
        let query = QueryParams::new().with_opt::<String>("start_cursor", None);
        let url = build_url("https://api.example.com/v1", "/pages", &query).unwrap();
        assert!(!url.contains('?'));
    }

    #[test]
    fn query_values_are_encoded() {
        let query = QueryParams::new()
            .with("page_size", 100)
            .with_opt("start_cursor", Some("a b&c"));
        let url = build_url("https://api.example.com/v1", "/blocks/x/children", &query).unwrap();
        assert!(url.ends_with("?page_size=100&start_cursor=a+b%26c"), "{url}");
    }

    #[test]
    fn invalid_base_fails() {
        let err = build_url("not a url", "/pages", &QueryParams::new()).unwrap_err();
        assert!(matches!(err, SyncError::UrlConstruction { .. }));
    }

    #[test]
    fn headers_carry_token_and_version() {
        let builder = RequestBuilder::new("https://api.example.com/v1", "2022-06-28");
        let headers = builder.headers(&ApiToken::new("secret_abc"));
        assert!(headers.contains(&("Authorization".into(), "Bearer secret_abc".into())));
        assert!(headers.contains(&("Content-Type".into(), "application/json".into())));
        assert!(headers.contains(&(API_VERSION_HEADER.into(), "2022-06-28".into())));
    }
}
