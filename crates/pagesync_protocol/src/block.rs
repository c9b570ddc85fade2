//! Content blocks.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Type tag of a level 1 heading.
pub const HEADING_1: &str = "heading_1";
/// Type tag of a level 2 heading.
pub const HEADING_2: &str = "heading_2";
/// Type tag of a level 3 heading.
pub const HEADING_3: &str = "heading_3";
/// Type tag of a paragraph.
pub const PARAGRAPH: &str = "paragraph";
/// Type tag of a quote.
pub const QUOTE: &str = "quote";
/// Type tag of an image.
pub const IMAGE: &str = "image";
/// Type tag of a divider.
pub const DIVIDER: &str = "divider";

const MEDIA_KINDS: &[&str] = &[IMAGE, "video", "audio", "file", "pdf", "embed"];

/// An ordered content unit.
///
/// A block is a type tag plus an opaque, type-keyed payload. On the wire the
/// payload lives under a key equal to the type tag:
///
/// ```json
/// { "object": "block", "type": "paragraph", "paragraph": { "rich_text": [] } }
/// ```
///
/// Blocks built locally have no `id`; the remote store assigns one when the
/// block is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Block {
    /// Remote identifier, present once persisted.
    pub id: Option<String>,
    /// Discriminant tag (`paragraph`, `heading_2`, `image`, ...).
    pub kind: String,
    /// Type-keyed payload.
    pub payload: Value,
    /// Whether the block has nested children.
    pub has_children: bool,
    /// Whether the block has been archived remotely.
    pub archived: bool,
}

impl Block {
    /// Creates an unpersisted block.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            payload,
            has_children: false,
            archived: false,
        }
    }

    /// Creates a heading block of the given level (clamped to 1..=3).
    pub fn heading(level: u8, text: &str) -> Self {
        let kind = match level {
            0 | 1 => HEADING_1,
            2 => HEADING_2,
            _ => HEADING_3,
        };
        Self::new(kind, json!({ "rich_text": rich_text(text) }))
    }

    /// Creates a paragraph block.
    pub fn paragraph(text: &str) -> Self {
        Self::new(PARAGRAPH, json!({ "rich_text": rich_text(text) }))
    }

    /// Creates a quote block.
    pub fn quote(text: &str) -> Self {
        Self::new(QUOTE, json!({ "rich_text": rich_text(text) }))
    }

    /// Creates an image block referencing an external URL.
    pub fn image(url: &str) -> Self {
        Self::new(
            IMAGE,
            json!({ "type": "external", "external": { "url": url } }),
        )
    }

    /// Creates a divider block.
    pub fn divider() -> Self {
        Self::new(DIVIDER, json!({}))
    }

    /// Sets the remote identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the heading level if this is a heading block.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind.as_str() {
            HEADING_1 => Some(1),
            HEADING_2 => Some(2),
            HEADING_3 => Some(3),
            _ => None,
        }
    }

    /// Returns true for headings of any level.
    pub fn is_heading(&self) -> bool {
        self.heading_level().is_some()
    }

    /// Returns true for image, video, audio, file, pdf and embed blocks.
    pub fn is_media(&self) -> bool {
        MEDIA_KINDS.contains(&self.kind.as_str())
    }

    /// Concatenated plain text of the payload's rich text.
    ///
    /// Remote responses carry `plain_text` on every segment; locally built
    /// blocks only carry `text.content`, which is used as a fallback.
    pub fn plain_text(&self) -> String {
        let Some(segments) = self.payload.get("rich_text").and_then(Value::as_array) else {
            return String::new();
        };

        segments
            .iter()
            .filter_map(|segment| {
                segment
                    .get("plain_text")
                    .and_then(Value::as_str)
                    .or_else(|| {
                        segment
                            .get("text")
                            .and_then(|t| t.get("content"))
                            .and_then(Value::as_str)
                    })
            })
            .collect()
    }

    /// Returns the media URL for external or hosted file payloads.
    pub fn media_url(&self) -> Option<&str> {
        if !self.is_media() {
            return None;
        }
        ["external", "file"]
            .iter()
            .find_map(|key| self.payload.get(*key)?.get("url")?.as_str())
            .or_else(|| self.payload.get("url").and_then(Value::as_str))
    }
}

impl TryFrom<Map<String, Value>> for Block {
    type Error = ProtocolError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let kind = match map.remove("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind,
            Some(_) => return Err(ProtocolError::InvalidBlock("type must be a string".into())),
            None => return Err(ProtocolError::MissingType),
        };

        let payload = map
            .remove(&kind)
            .unwrap_or_else(|| Value::Object(Map::new()));

        let id = match map.remove("id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };

        let flag = |map: &Map<String, Value>, key: &str| {
            map.get(key).and_then(Value::as_bool).unwrap_or(false)
        };

        Ok(Self {
            id,
            has_children: flag(&map, "has_children"),
            archived: flag(&map, "archived") || flag(&map, "in_trash"),
            kind,
            payload,
        })
    }
}

impl From<Block> for Map<String, Value> {
    fn from(block: Block) -> Self {
        let mut map = Map::new();
        map.insert("object".into(), Value::String("block".into()));
        if let Some(id) = block.id {
            map.insert("id".into(), Value::String(id));
            map.insert("has_children".into(), Value::Bool(block.has_children));
            map.insert("archived".into(), Value::Bool(block.archived));
        }
        map.insert("type".into(), Value::String(block.kind.clone()));
        map.insert(block.kind, block.payload);
        map
    }
}

/// Builds a single-segment rich text array.
pub fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}
