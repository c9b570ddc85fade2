//! In-memory page and block storage.

use crate::error::{ServerError, ServerResult};
use pagesync_protocol::{
    title_property, Block, BlockList, CreatePageRequest, PageObject, ParentReference,
    UpdatePageRequest,
};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct PageRecord {
    parent: ParentReference,
    properties: Map<String, Value>,
    archived: bool,
}

#[derive(Debug, Clone)]
struct BlockRecord {
    block: Block,
    archived: bool,
}

/// Pages, blocks and the ordered child list of every parent.
///
/// Pages and blocks share one ID space: a page is a valid parent for
/// `list_children` and `append_children`, just like a block.
pub struct BlockStore {
    pages: RwLock<HashMap<String, PageRecord>>,
    blocks: RwLock<HashMap<String, BlockRecord>>,
    /// parent id -> child block ids, in document order.
    children: RwLock<HashMap<String, Vec<String>>>,
    public_host: String,
}

impl BlockStore {
    /// Creates an empty store whose page URLs live under `public_host`.
    pub fn new(public_host: impl Into<String>) -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            blocks: RwLock::new(HashMap::new()),
            children: RwLock::new(HashMap::new()),
            public_host: public_host.into(),
        }
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn page_object(&self, id: &str, record: &PageRecord) -> ServerResult<PageObject> {
        let parent = serde_json::to_value(&record.parent)
            .map_err(|e| ServerError::Internal(format!("failed to encode parent: {e}")))?;
        Ok(PageObject {
            id: id.to_string(),
            url: Some(format!("{}/{}", self.public_host, id.replace('-', ""))),
            archived: record.archived,
            in_trash: false,
            parent,
            properties: record.properties.clone(),
        })
    }

    /// Creates a page with its initial children.
    pub fn create_page(&self, request: CreatePageRequest) -> ServerResult<PageObject> {
        let id = Self::new_id();
        self.insert_page(&id, request.parent, request.properties);
        self.append_children(&id, request.children)?;
        self.get_page(&id)
    }

    /// Inserts an empty page under a known ID, replacing any previous one.
    pub fn insert_page(&self, id: &str, parent: ParentReference, properties: Map<String, Value>) {
        let record = PageRecord {
            parent,
            properties,
            archived: false,
        };
        self.pages.write().insert(id.to_string(), record);
        self.children.write().entry(id.to_string()).or_default();
    }

    /// Inserts an empty page titled `title` under a known ID.
    pub fn insert_titled_page(&self, id: &str, parent: ParentReference, title: &str) {
        let mut properties = Map::new();
        properties.insert("title".into(), title_property(title));
        self.insert_page(id, parent, properties);
    }

    /// Returns a page, archived or not.
    pub fn get_page(&self, id: &str) -> ServerResult<PageObject> {
        let pages = self.pages.read();
        let record = pages
            .get(id)
            .ok_or_else(|| ServerError::NotFound(format!("page {id}")))?;
        self.page_object(id, record)
    }

    /// Updates properties and/or the archived flag of a page.
    pub fn update_page(&self, id: &str, request: UpdatePageRequest) -> ServerResult<PageObject> {
        let mut pages = self.pages.write();
        let record = pages
            .get_mut(id)
            .ok_or_else(|| ServerError::NotFound(format!("page {id}")))?;

        if let Some(properties) = request.properties {
            for (name, value) in properties {
                record.properties.insert(name, value);
            }
        }
        if let Some(archived) = request.archived {
            record.archived = archived;
        }
        self.page_object(id, record)
    }

    fn ensure_parent(&self, parent_id: &str) -> ServerResult<()> {
        let is_page = self.pages.read().contains_key(parent_id);
        let is_block = self
            .blocks
            .read()
            .get(parent_id)
            .is_some_and(|r| !r.archived);
        if is_page || is_block {
            Ok(())
        } else {
            Err(ServerError::NotFound(format!("block {parent_id}")))
        }
    }

    /// Lists live children of `parent_id` starting at `start_cursor`.
    ///
    /// The cursor is the ID of the first block of the requested page.
    pub fn list_children(
        &self,
        parent_id: &str,
        start_cursor: Option<&str>,
        page_size: usize,
    ) -> ServerResult<BlockList> {
        self.ensure_parent(parent_id)?;

        let children = self.children.read();
        let ids = children.get(parent_id).map(Vec::as_slice).unwrap_or_default();
        let start = match start_cursor {
            Some(cursor) => ids
                .iter()
                .position(|id| id == cursor)
                .ok_or_else(|| ServerError::InvalidRequest(format!("invalid start_cursor {cursor}")))?,
            None => 0,
        };

        let blocks = self.blocks.read();
        let page_size = page_size.max(1);
        let window = &ids[start..];
        let results = window
            .iter()
            .take(page_size)
            .filter_map(|id| blocks.get(id).map(|r| r.block.clone()))
            .collect();
        let next_cursor = window.get(page_size).cloned();

        Ok(BlockList {
            results,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }

    /// Appends `children` to the end of `parent_id`'s child list.
    pub fn append_children(&self, parent_id: &str, children: Vec<Block>) -> ServerResult<BlockList> {
        self.ensure_parent(parent_id)?;

        let mut stored = Vec::with_capacity(children.len());
        {
            let mut blocks = self.blocks.write();
            for mut block in children {
                let id = Self::new_id();
                block.id = Some(id.clone());
                block.archived = false;
                block.has_children = false;
                blocks.insert(
                    id,
                    BlockRecord {
                        block: block.clone(),
                        archived: false,
                    },
                );
                stored.push(block);
            }
        }

        let mut index = self.children.write();
        let list = index.entry(parent_id.to_string()).or_default();
        list.extend(stored.iter().filter_map(|b| b.id.clone()));
        if let Some(parent) = self.blocks.write().get_mut(parent_id) {
            parent.block.has_children = !list.is_empty();
        }

        Ok(BlockList {
            results: stored,
            has_more: false,
            next_cursor: None,
        })
    }

    /// Archives a block and removes it from its parent's child list.
    pub fn delete_block(&self, id: &str) -> ServerResult<Block> {
        let mut blocks = self.blocks.write();
        let record = blocks
            .get_mut(id)
            .ok_or_else(|| ServerError::NotFound(format!("block {id}")))?;
        if record.archived {
            return Err(ServerError::InvalidRequest(
                "Can't edit block that is archived.".into(),
            ));
        }
        record.archived = true;
        record.block.archived = true;
        let archived = record.block.clone();
        drop(blocks);

        for list in self.children.write().values_mut() {
            list.retain(|child| child != id);
        }
        Ok(archived)
    }

    /// Live children of `parent_id`, in order.
    pub fn children_of(&self, parent_id: &str) -> Vec<Block> {
        let children = self.children.read();
        let blocks = self.blocks.read();
        children
            .get(parent_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| blocks.get(id).map(|r| r.block.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of pages, archived ones included.
    pub fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    /// Number of blocks ever archived.
    pub fn archived_block_count(&self) -> usize {
        self.blocks.read().values().filter(|r| r.archived).count()
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new("https://pagesync.local")
    }
}
