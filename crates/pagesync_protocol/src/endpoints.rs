//! Endpoint paths and API limits.

/// Maximum number of children accepted by one append or create call.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Maximum `page_size` accepted by list endpoints.
pub const MAX_PAGE_SIZE: usize = 100;

/// API version pinned by default.
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// Header carrying the API version.
pub const API_VERSION_HEADER: &str = "Notion-Version";

/// Query parameter carrying the page size.
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Query parameter carrying the pagination cursor.
pub const START_CURSOR_PARAM: &str = "start_cursor";

/// `POST` creates a page.
pub const PAGES: &str = "/pages";

/// `GET` fetches a page, `PATCH` updates it.
pub fn page(page_id: &str) -> String {
    format!("/pages/{page_id}")
}

/// `GET` lists children, `PATCH` appends children.
pub fn block_children(block_id: &str) -> String {
    format!("/blocks/{block_id}/children")
}

/// `DELETE` archives a block.
pub fn block(block_id: &str) -> String {
    format!("/blocks/{block_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(page("abc"), "/pages/abc");
        assert_eq!(block_children("abc"), "/blocks/abc/children");
        assert_eq!(block("abc"), "/blocks/abc");
    }
}
