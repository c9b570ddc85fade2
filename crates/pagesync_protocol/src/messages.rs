//! Request and response bodies.

use crate::block::{rich_text, Block};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Where a document lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParentReference {
    /// Nested under another page.
    #[serde(rename = "page_id")]
    Page {
        /// Parent page ID.
        page_id: String,
    },
    /// A row of a collection (database).
    #[serde(rename = "database_id")]
    Collection {
        /// Parent collection ID.
        database_id: String,
    },
}

impl ParentReference {
    /// Creates a page parent.
    pub fn page(page_id: impl Into<String>) -> Self {
        Self::Page {
            page_id: page_id.into(),
        }
    }

    /// Creates a collection parent.
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self::Collection {
            database_id: collection_id.into(),
        }
    }

    /// Returns true for collection parents.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection { .. })
    }
}

/// Body of `POST /pages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePageRequest {
    /// Parent reference.
    pub parent: ParentReference,
    /// Page properties (title, url, ...).
    pub properties: Map<String, Value>,
    /// Initial children (at most one batch).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

/// Body of `PATCH /pages/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePageRequest {
    /// Properties to overwrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Archive or restore the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl UpdatePageRequest {
    /// Creates a request that renames a page via its `title` property.
    pub fn title(property: &str, title: &str) -> Self {
        let mut properties = Map::new();
        properties.insert(property.to_string(), title_property(title));
        Self {
            properties: Some(properties),
            archived: None,
        }
    }
}

/// A remote document as returned by `GET /pages/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageObject {
    /// Page ID.
    pub id: String,
    /// External URL of the page.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether the page is archived.
    #[serde(default)]
    pub archived: bool,
    /// Whether the page is in the trash.
    #[serde(default)]
    pub in_trash: bool,
    /// Raw parent object.
    #[serde(default)]
    pub parent: Value,
    /// Raw property map.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl PageObject {
    /// Returns true when the page no longer counts as live.
    pub fn is_archived(&self) -> bool {
        self.archived || self.in_trash
    }

    /// Returns the plain text of the first `title`-typed property.
    pub fn title(&self) -> Option<String> {
        self.properties.values().find_map(|prop| {
            let segments = prop.get("title")?.as_array()?;
            Some(
                segments
                    .iter()
                    .filter_map(|s| {
                        s.get("plain_text")
                            .or_else(|| s.get("text").and_then(|t| t.get("content")))
                            .and_then(Value::as_str)
                    })
                    .collect(),
            )
        })
    }
}

/// One page of `GET /blocks/{id}/children`, also the shape returned by appends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockList {
    /// Blocks on this page.
    #[serde(default)]
    pub results: Vec<Block>,
    /// Whether another page follows.
    #[serde(default)]
    pub has_more: bool,
    /// Cursor for the next page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Body of `PATCH /blocks/{id}/children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendChildrenRequest {
    /// Blocks to append, in order.
    pub children: Vec<Block>,
    /// Insert after this sibling instead of at the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl AppendChildrenRequest {
    /// Creates an append-at-end request.
    pub fn new(children: Vec<Block>) -> Self {
        Self {
            children,
            after: None,
        }
    }
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Always `"error"` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// HTTP status echoed in the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Creates an error body.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object: Some("error".into()),
            status: Some(status),
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }
}

/// A `title` property value.
pub fn title_property(title: &str) -> Value {
    json!({ "title": rich_text(title) })
}

/// A `url` property value.
pub fn url_property(url: &str) -> Value {
    json!({ "url": url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_reference_shapes() {
        let page = serde_json::to_value(ParentReference::page("p1")).unwrap();
        assert_eq!(page, json!({ "type": "page_id", "page_id": "p1" }));

        let collection = serde_json::to_value(ParentReference::collection("c1")).unwrap();
        assert_eq!(collection, json!({ "type": "database_id", "database_id": "c1" }));
        assert!(ParentReference::collection("c1").is_collection());
    }

    #[test]
    fn create_request_omits_empty_children() {
        let request = CreatePageRequest {
            parent: ParentReference::page("p1"),
            properties: Map::new(),
            children: Vec::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("children").is_none());
    }

    #[test]
    fn update_title_request() {
        let request = UpdatePageRequest::title("title", "New");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["properties"]["title"]["title"][0]["text"]["content"], "New");
        assert!(value.get("archived").is_none());
    }

    #[test]
    fn page_object_archived_and_title() {
        let page: PageObject = serde_json::from_value(json!({
            "object": "page",
            "id": "p1",
            "in_trash": true,
            "properties": { "Name": { "id": "title", "type": "title", "title": [ { "plain_text": "Doc" } ] } }
        }))
        .unwrap();

        assert!(page.is_archived());
        assert_eq!(page.title().as_deref(), Some("Doc"));
        assert!(page.url.is_none());
    }

    #[test]
    fn block_list_defaults() {
        let list: BlockList = serde_json::from_value(json!({ "object": "list", "results": [] })).unwrap();
        assert!(!list.has_more);
        assert!(list.next_cursor.is_none());
    }

    #[test]
    fn error_body_tolerates_missing_fields() {
        let body: ApiErrorBody = serde_json::from_value(json!({ "message": "boom" })).unwrap();
        assert_eq!(body.message.as_deref(), Some("boom"));
        assert!(body.status.is_none());
    }
}
