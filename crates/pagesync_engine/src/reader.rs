//! Cursor-paginated listing of block children.

use crate::config::RetryPolicy;
use crate::error::{SyncError, SyncResult};
use crate::executor::{CallOptions, RequestExecutor};
use crate::http::HttpClient;
use crate::request::QueryParams;
use pagesync_protocol::endpoints::{self, PAGE_SIZE_PARAM, START_CURSOR_PARAM};
use pagesync_protocol::{Block, BlockList};
use tracing::debug;

/// Walks `GET /blocks/{id}/children` until the remote reports no more pages.
pub struct PaginatedReader<'a, C: HttpClient> {
    executor: &'a RequestExecutor<C>,
    page_size: usize,
    retry: RetryPolicy,
}

impl<'a, C: HttpClient> PaginatedReader<'a, C> {
    /// Creates a reader.
    pub fn new(executor: &'a RequestExecutor<C>, page_size: usize, retry: RetryPolicy) -> Self {
        Self {
            executor,
            page_size,
            retry,
        }
    }

    /// Fetches every child of `parent_id`, in order.
    ///
    /// Pages are requested one at a time. A failed page fails the whole
    /// listing; a partial result is never returned.
    pub async fn list_all(&self, parent_id: &str) -> SyncResult<Vec<Block>> {
        let path = endpoints::block_children(parent_id);
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let query = QueryParams::new()
                .with(PAGE_SIZE_PARAM, self.page_size)
                .with_opt(START_CURSOR_PARAM, cursor.as_deref());
            let response = self
                .executor
                .call(&path, CallOptions::get().with_query(query).with_retry(self.retry))
                .await?;

            if !response.is_success() {
                return Err(self.executor.api_error(&response, "list block children"));
            }

            let page: BlockList = response.json()?;
            pages += 1;
            blocks.extend(page.results);

            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(SyncError::Protocol(
                        "list response has more pages but no cursor".into(),
                    ))
                }
            }
        }

        debug!(parent_id, pages, blocks = blocks.len(), "listed children");
        Ok(blocks)
    }
}
