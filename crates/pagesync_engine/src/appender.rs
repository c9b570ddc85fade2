//! Sequential batched writes of new children.

use crate::config::RetryPolicy;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::executor::{CallOptions, RequestExecutor};
use crate::http::HttpClient;
use crate::outcome::AppendOutcome;
use pagesync_protocol::{endpoints, AppendChildrenRequest, Block};
use std::time::Duration;
use tracing::{debug, warn};

/// Appends blocks to a parent in order, in batches of at most
/// `max_batch_size`.
///
/// Batches are written one after another with a fixed pause between them.
/// The first failed batch stops the run, and so does cancellation of the
/// executor's token, which also cuts a pending pause short. Batches already
/// written stay on the remote and are reported through
/// [`AppendOutcome::added_count`].
pub struct BatchAppender<'a, C: HttpClient> {
    executor: &'a RequestExecutor<C>,
    max_batch_size: usize,
    batch_delay: Duration,
    retry: RetryPolicy,
}

impl<'a, C: HttpClient> BatchAppender<'a, C> {
    /// Creates an appender; a zero batch size is treated as one.
    pub fn new(
        executor: &'a RequestExecutor<C>,
        max_batch_size: usize,
        batch_delay: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            executor,
            max_batch_size: max_batch_size.max(1),
            batch_delay,
            retry,
        }
    }

    /// Writes `blocks[start_index..]` under `parent_id`.
    ///
    /// `start_index` lets a caller skip blocks that were already written,
    /// for example the first batch sent inline with a create. Counts in the
    /// outcome cover only the blocks from `start_index` on.
    pub async fn append_all(
        &self,
        parent_id: &str,
        blocks: &[Block],
        start_index: usize,
    ) -> SyncResult<AppendOutcome> {
        let pending = blocks.get(start_index..).unwrap_or_default();
        if pending.is_empty() {
            return Ok(AppendOutcome::empty());
        }
        if !self.executor.has_token() {
            return Err(SyncError::MissingCredential);
        }

        let path = endpoints::block_children(parent_id);
        let total_count = pending.len();
        let batches = pending.chunks(self.max_batch_size);
        let batch_count = batches.len();
        let mut added_count = 0usize;

        let cancel = self.executor.cancellation();

        for (index, batch) in batches.enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.batch_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                warn!(parent_id, added_count, total_count, "append cancelled");
                return Ok(AppendOutcome {
                    success: false,
                    added_count,
                    total_count,
                    error: Some(self.executor.describe(&SyncError::Cancelled, "append children")),
                    error_type: Some(ErrorKind::Cancelled),
                });
            }

            if let Err(error) = self.append_batch(&path, batch).await {
                if matches!(error, SyncError::MissingCredential) {
                    return Err(error);
                }
                let message = self.executor.describe(&error, "append children");
                warn!(
                    parent_id,
                    batch = index + 1,
                    of = batch_count,
                    added_count,
                    error = %message,
                    "append stopped"
                );
                return Ok(AppendOutcome {
                    success: false,
                    added_count,
                    total_count,
                    error: Some(message),
                    error_type: Some(error.kind()),
                });
            }

            added_count += batch.len();
            debug!(parent_id, batch = index + 1, of = batch_count, added_count, "appended batch");
        }

        Ok(AppendOutcome::complete(added_count))
    }

    async fn append_batch(&self, path: &str, batch: &[Block]) -> SyncResult<()> {
        let body = serde_json::to_value(AppendChildrenRequest::new(batch.to_vec()))
            .map_err(|e| SyncError::Protocol(format!("failed to encode children: {e}")))?;
        let response = self
            .executor
            .call(path, CallOptions::patch(body).with_retry(self.retry))
            .await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(self.executor.api_error(&response, "append children"))
        }
    }
}
