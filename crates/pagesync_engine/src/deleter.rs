//! Bulk deletion under a concurrency cap.

use crate::config::RetryPolicy;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::executor::{CallOptions, RequestExecutor};
use crate::http::HttpClient;
use crate::outcome::BatchOutcome;
use futures::future::join_all;
use pagesync_protocol::endpoints;
use std::time::Duration;
use tracing::{debug, warn};

/// Deletes blocks in fixed-size waves.
///
/// Every delete in a wave is issued at once and awaited together; one
/// failing delete does not cancel its siblings. Waves are separated by a
/// fixed pause, so at most `concurrency_limit` deletes are ever in flight.
pub struct BoundedConcurrencyDeleter<'a, C: HttpClient> {
    executor: &'a RequestExecutor<C>,
    concurrency_limit: usize,
    wave_delay: Duration,
    retry: RetryPolicy,
}

impl<'a, C: HttpClient> BoundedConcurrencyDeleter<'a, C> {
    /// Creates a deleter; a zero limit is treated as one.
    pub fn new(
        executor: &'a RequestExecutor<C>,
        concurrency_limit: usize,
        wave_delay: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            executor,
            concurrency_limit: concurrency_limit.max(1),
            wave_delay,
            retry,
        }
    }

    /// Deletes every item, recording per-item failures.
    ///
    /// Fails only for a missing credential, before any request. When the
    /// executor's cancellation token fires, no further wave is started and
    /// the counts gathered so far are returned with `cancelled` set.
    pub async fn delete_many(&self, item_ids: &[String]) -> SyncResult<BatchOutcome> {
        if !self.executor.has_token() {
            return Err(SyncError::MissingCredential);
        }

        let cancel = self.executor.cancellation();
        let mut outcome = BatchOutcome::default();
        let waves = item_ids.chunks(self.concurrency_limit);
        let wave_count = waves.len();

        for (index, wave) in waves.enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.wave_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let results = join_all(wave.iter().map(|id| self.delete_one(id))).await;
            for (id, result) in wave.iter().zip(results) {
                outcome.record(id, result);
            }
            debug!(wave = index + 1, of = wave_count, size = wave.len(), "delete wave done");
        }

        if outcome.cancelled {
            warn!(
                deleted = outcome.success_count,
                failed = outcome.failure_count,
                remaining = item_ids.len() - outcome.success_count - outcome.failure_count,
                "delete cancelled"
            );
        } else if outcome.failure_count > 0 {
            warn!(
                deleted = outcome.success_count,
                failed = outcome.failure_count,
                "some deletes failed"
            );
        }
        Ok(outcome)
    }

    async fn delete_one(&self, item_id: &str) -> Result<(), (String, ErrorKind)> {
        let context = "delete block";
        let options = CallOptions::delete().with_retry(self.retry);
        let error = match self.executor.call(&endpoints::block(item_id), options).await {
            Ok(response) if response.is_success() => return Ok(()),
            Ok(response) => self.executor.api_error(&response, context),
            Err(err) => err,
        };
        Err((self.executor.describe(&error, context), error.kind()))
    }
}
