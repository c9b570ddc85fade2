//! Document lifecycle operations.

use crate::appender::BatchAppender;
use crate::config::{ApiToken, EngineConfig};
use crate::deleter::BoundedConcurrencyDeleter;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::executor::{CallOptions, RequestExecutor};
use crate::filter::{BasicContentFilter, ContentFilter, FilterOutcome};
use crate::http::{HttpClient, ReqwestClient};
use crate::outcome::{
    AppendOutcome, BatchOutcome, ClearOutcome, CreateOutcome, Existence, FetchOutcome,
    RefreshOutcome, SectionRefreshOutcome, StepOutcome, SyncPhase,
};
use crate::reader::PaginatedReader;
use crate::sanitize::ErrorSanitizer;
use crate::section::SectionLocator;
use pagesync_protocol::{
    endpoints, title_property, url_property, Block, CreatePageRequest, PageObject,
    ParentReference, UpdatePageRequest,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A document to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    /// Where the document lives.
    pub parent: ParentReference,
    /// Document title.
    pub title: String,
    /// Link back to the source, stored on collection rows.
    pub source_url: Option<String>,
    /// Initial children, in order.
    pub children: Vec<Block>,
}

impl NewDocument {
    /// Creates an empty document under `parent`.
    pub fn new(parent: ParentReference, title: impl Into<String>) -> Self {
        Self {
            parent,
            title: title.into(),
            source_url: None,
            children: Vec::new(),
        }
    }

    /// Sets the source URL.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Sets the initial children.
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }
}

/// A new title, tagged with the kind of document it belongs to.
///
/// Plain pages keep their title under `title`; collection rows keep it under
/// the configured schema's title property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewTitle<'a> {
    /// A page nested under another page.
    Page(&'a str),
    /// A row of a collection.
    Row(&'a str),
}

impl NewTitle<'_> {
    fn text(&self) -> &str {
        match self {
            NewTitle::Page(text) | NewTitle::Row(text) => text,
        }
    }
}

/// Runs create, refresh and existence operations against the remote store.
///
/// Every operation returns an outcome object describing what happened,
/// including partial progress. The only error returned is
/// [`SyncError::MissingCredential`], raised before any request is made.
///
/// Operations on the same document must not run concurrently; the remote
/// offers no locking and nothing here serializes them.
pub struct SyncOrchestrator<C: HttpClient> {
    config: EngineConfig,
    executor: RequestExecutor<C>,
    filter: Arc<dyn ContentFilter>,
    exclude_media: bool,
    locator: SectionLocator,
}

impl SyncOrchestrator<ReqwestClient> {
    /// Creates an orchestrator speaking HTTPS to `config.base_url`.
    pub fn connect(config: EngineConfig) -> SyncResult<Self> {
        let client = ReqwestClient::new(config.timeout)?;
        Ok(Self::new(config, client))
    }
}

impl<C: HttpClient> SyncOrchestrator<C> {
    /// Creates an orchestrator over `client`.
    pub fn new(config: EngineConfig, client: C) -> Self {
        let executor = RequestExecutor::new(&config, client);
        let locator = SectionLocator::new(config.section_marker.clone());
        Self {
            config,
            executor,
            filter: Arc::new(BasicContentFilter),
            exclude_media: false,
            locator,
        }
    }

    /// Replaces the content filter.
    pub fn with_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Drops media blocks before every write.
    pub fn with_exclude_media(mut self, exclude: bool) -> Self {
        self.exclude_media = exclude;
        self
    }

    /// Replaces the error sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn ErrorSanitizer>) -> Self {
        self.executor = self.executor.with_sanitizer(sanitizer);
        self
    }

    /// Uses `cancel` to stop retry loops, delete waves and append batches.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(cancel);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the request executor.
    pub fn executor(&self) -> &RequestExecutor<C> {
        &self.executor
    }

    /// Swaps the credential used by subsequent operations.
    pub fn set_token(&self, token: Option<ApiToken>) {
        self.executor.set_token(token);
    }

    /// Cancels in-flight and future operations.
    ///
    /// Cancellation is permanent for this orchestrator's token.
    pub fn cancel(&self) {
        self.executor.cancellation().cancel();
    }

    fn require_token(&self) -> SyncResult<()> {
        if self.executor.has_token() {
            Ok(())
        } else {
            Err(SyncError::MissingCredential)
        }
    }

    fn reader(&self) -> PaginatedReader<'_, C> {
        PaginatedReader::new(&self.executor, self.config.page_size, self.config.read_retry)
    }

    fn deleter(&self) -> BoundedConcurrencyDeleter<'_, C> {
        BoundedConcurrencyDeleter::new(
            &self.executor,
            self.config.delete_concurrency,
            self.config.delete_wave_delay,
            self.config.delete_retry,
        )
    }

    fn appender(&self) -> BatchAppender<'_, C> {
        BatchAppender::new(
            &self.executor,
            self.config.max_batch_size,
            self.config.append_batch_delay,
            self.config.write_retry,
        )
    }

    fn filter(&self, blocks: Vec<Block>, operation: &str) -> FilterOutcome {
        let outcome = self.filter.filter_blocks(blocks, self.exclude_media);
        outcome.log_rejections(operation);
        outcome
    }

    /// Reports whether `page_id` is live.
    ///
    /// A 404 or an archived page is [`Existence::Missing`]. Any other
    /// failure, including a transport error or an undecodable body, is
    /// [`Existence::Unknown`] and must not be read as "does not exist".
    pub async fn check_exists(&self, page_id: &str) -> SyncResult<Existence> {
        self.require_token()?;

        let options = CallOptions::get().with_retry(self.config.read_retry);
        let response = match self.executor.call(&endpoints::page(page_id), options).await {
            Ok(response) => response,
            Err(err) => {
                let err = escalate(err)?;
                warn!(page_id, error = %self.executor.describe(&err, "check page"), "existence unknown");
                return Ok(Existence::Unknown);
            }
        };

        if response.status == 404 {
            debug!(page_id, "page not found");
            return Ok(Existence::Missing);
        }
        if !response.is_success() {
            let err = self.executor.api_error(&response, "check page");
            warn!(page_id, status = response.status, error = %err, "existence unknown");
            return Ok(Existence::Unknown);
        }

        match response.json::<PageObject>() {
            Ok(page) if page.is_archived() => {
                debug!(page_id, "page is archived");
                Ok(Existence::Missing)
            }
            Ok(_) => Ok(Existence::Exists),
            Err(err) => {
                warn!(page_id, error = %err, "existence unknown");
                Ok(Existence::Unknown)
            }
        }
    }

    /// Creates a document with its children.
    ///
    /// The first batch of children is sent with the create call; the rest
    /// are appended afterwards. A failed follow-up append does not undo the
    /// create: the outcome carries the new `page_id` together with
    /// `append_result.success == false`.
    pub async fn create(&self, document: NewDocument) -> SyncResult<CreateOutcome> {
        self.require_token()?;

        let NewDocument {
            parent,
            title,
            source_url,
            children,
        } = document;
        let filtered = self.filter(children, "create");
        let skipped_count = filtered.skipped_count;
        let blocks = filtered.valid_blocks;
        let inline = blocks.len().min(self.config.max_batch_size);

        let request = CreatePageRequest {
            properties: self.page_properties(&parent, &title, source_url.as_deref()),
            parent,
            children: blocks[..inline].to_vec(),
        };
        let failed = |error: String, kind: ErrorKind| CreateOutcome {
            success: false,
            page_id: None,
            url: None,
            append_result: None,
            skipped_count,
            error: Some(error),
            error_type: Some(kind),
        };

        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => {
                let err = SyncError::Protocol(format!("failed to encode page: {e}"));
                return Ok(failed(err.to_string(), err.kind()));
            }
        };
        let options = CallOptions::post(body).with_retry(self.config.write_retry);
        let page = match self.executor.call(endpoints::PAGES, options).await {
            Ok(response) if response.is_success() => response.json::<PageObject>(),
            Ok(response) => Err(self.executor.api_error(&response, "create page")),
            Err(err) => Err(err),
        };
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                let err = escalate(err)?;
                let message = self.executor.describe(&err, "create page");
                warn!(title = %title, error = %message, "create failed");
                return Ok(failed(message, err.kind()));
            }
        };
        info!(page_id = %page.id, children = inline, "page created");

        let append_result = if blocks.len() > inline {
            Some(self.appender().append_all(&page.id, &blocks, inline).await?)
        } else {
            None
        };
        if let Some(result) = append_result.as_ref().filter(|r| !r.success) {
            warn!(
                page_id = %page.id,
                added = result.added_count,
                total = result.total_count,
                "page created but remaining children were not all written"
            );
        }

        Ok(CreateOutcome {
            success: true,
            page_id: Some(page.id),
            url: page.url,
            append_result,
            skipped_count,
            error: None,
            error_type: None,
        })
    }

    fn page_properties(
        &self,
        parent: &ParentReference,
        title: &str,
        source_url: Option<&str>,
    ) -> Map<String, Value> {
        let mut properties = Map::new();
        match parent {
            ParentReference::Page { .. } => {
                properties.insert("title".into(), title_property(title));
            }
            ParentReference::Collection { .. } => {
                let schema = &self.config.collection_schema;
                properties.insert(schema.title_property.clone(), title_property(title));
                if let (Some(name), Some(url)) = (schema.url_property.as_ref(), source_url) {
                    properties.insert(name.clone(), url_property(url));
                }
            }
        }
        properties
    }

    /// Lists every child of `page_id`.
    pub async fn fetch_blocks(&self, page_id: &str) -> SyncResult<FetchOutcome> {
        self.require_token()?;
        match self.reader().list_all(page_id).await {
            Ok(blocks) => Ok(FetchOutcome {
                success: true,
                blocks,
                error: None,
                error_type: None,
            }),
            Err(err) => {
                let err = escalate(err)?;
                Ok(FetchOutcome {
                    success: false,
                    blocks: Vec::new(),
                    error: Some(self.executor.describe(&err, "fetch blocks")),
                    error_type: Some(err.kind()),
                })
            }
        }
    }

    /// Renames `page_id`, writing the property that matches its kind.
    pub async fn update_title(
        &self,
        page_id: &str,
        title: NewTitle<'_>,
    ) -> SyncResult<StepOutcome> {
        self.require_token()?;

        let property = match title {
            NewTitle::Page(_) => "title",
            NewTitle::Row(_) => self.config.collection_schema.title_property.as_str(),
        };
        let body = match serde_json::to_value(UpdatePageRequest::title(property, title.text())) {
            Ok(body) => body,
            Err(e) => {
                let err = SyncError::Protocol(format!("failed to encode title: {e}"));
                return Ok(StepOutcome::failed(err.to_string(), err.kind()));
            }
        };

        let options = CallOptions::patch(body).with_retry(self.config.write_retry);
        let result = match self.executor.call(&endpoints::page(page_id), options).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(self.executor.api_error(&response, "update title")),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                debug!(page_id, "title updated");
                Ok(StepOutcome::ok())
            }
            Err(err) => {
                let err = escalate(err)?;
                let message = self.executor.describe(&err, "update title");
                Ok(StepOutcome::failed(message, err.kind()))
            }
        }
    }

    /// Removes every child of `page_id`.
    ///
    /// Fails outright when the listing fails, when the run is cancelled, or
    /// when children exist and none of them could be removed. A partial
    /// removal is reported as success with the failures listed in `deletes`.
    /// On cancellation `deletes` keeps the counts reached before it.
    pub async fn delete_all_blocks(&self, page_id: &str) -> SyncResult<ClearOutcome> {
        self.require_token()?;

        let existing = match self.reader().list_all(page_id).await {
            Ok(blocks) => blocks,
            Err(err) => {
                let err = escalate(err)?;
                return Ok(ClearOutcome {
                    success: false,
                    found_count: 0,
                    deletes: BatchOutcome::default(),
                    error: Some(self.executor.describe(&err, "list existing blocks")),
                    error_type: Some(err.kind()),
                });
            }
        };
        let ids: Vec<String> = existing.into_iter().filter_map(|b| b.id).collect();
        let found_count = ids.len();

        let deletes = match self.deleter().delete_many(&ids).await {
            Ok(deletes) => deletes,
            Err(err) => {
                let err = escalate(err)?;
                return Ok(ClearOutcome {
                    success: false,
                    found_count,
                    deletes: BatchOutcome::default(),
                    error: Some(self.executor.describe(&err, "delete blocks")),
                    error_type: Some(err.kind()),
                });
            }
        };
        debug!(
            page_id,
            found_count,
            deleted = deletes.success_count,
            failed = deletes.failure_count,
            "cleared page"
        );

        if deletes.cancelled {
            return Ok(ClearOutcome {
                success: false,
                found_count,
                deletes,
                error: Some(self.executor.describe(&SyncError::Cancelled, "delete blocks")),
                error_type: Some(ErrorKind::Cancelled),
            });
        }
        if deletes.is_total_failure() {
            let error = deletes
                .errors
                .first()
                .map(|e| e.error.clone())
                .unwrap_or_else(|| "no block could be deleted".into());
            let error_type = deletes.first_error_type();
            return Ok(ClearOutcome {
                success: false,
                found_count,
                deletes,
                error: Some(error),
                error_type,
            });
        }

        Ok(ClearOutcome {
            success: true,
            found_count,
            deletes,
            error: None,
            error_type: None,
        })
    }

    /// Appends `blocks` to `page_id` as given, in batches.
    pub async fn append_blocks(&self, page_id: &str, blocks: &[Block]) -> SyncResult<AppendOutcome> {
        self.require_token()?;
        self.appender().append_all(page_id, blocks, 0).await
    }

    /// Replaces every child of `page_id` with `children`.
    ///
    /// Steps: rename (when `title` is given; a failure is logged and the
    /// refresh continues), remove all existing children, append the new
    /// ones. If no existing child could be removed the refresh stops before
    /// writing. Partial removal does not stop it.
    ///
    /// The document is empty between the delete and append steps. When the
    /// append fails `added_count` tells how many new children were written.
    pub async fn refresh_all(
        &self,
        page_id: &str,
        title: Option<NewTitle<'_>>,
        children: Vec<Block>,
    ) -> SyncResult<RefreshOutcome> {
        self.require_token()?;
        info!(page_id, "refreshing page");

        let filtered = self.filter(children, "refresh");
        let blocks = filtered.valid_blocks;
        let mut outcome = RefreshOutcome {
            success: false,
            title_updated: None,
            deleted_count: 0,
            delete_failures: 0,
            added_count: 0,
            total_count: blocks.len(),
            skipped_count: filtered.skipped_count,
            phase: None,
            error: None,
            error_type: None,
        };

        if let Some(title) = title {
            let renamed = self.update_title(page_id, title).await?;
            if let Some(error) = renamed.error.as_deref() {
                warn!(page_id, error, "title update failed, continuing");
            }
            outcome.title_updated = Some(renamed.success);
        }

        let cleared = self.delete_all_blocks(page_id).await?;
        outcome.deleted_count = cleared.deletes.success_count;
        outcome.delete_failures = cleared.deletes.failure_count;
        if !cleared.success {
            warn!(page_id, "could not clear page, not writing new content");
            outcome.phase = Some(SyncPhase::DeleteExisting);
            outcome.error = cleared.error;
            outcome.error_type = cleared.error_type;
            return Ok(outcome);
        }
        if outcome.delete_failures > 0 {
            warn!(page_id, failures = outcome.delete_failures, "some old blocks survived");
        }

        let appended = self.appender().append_all(page_id, &blocks, 0).await?;
        outcome.added_count = appended.added_count;
        outcome.success = appended.success;
        if !appended.success {
            outcome.phase = Some(SyncPhase::AppendNew);
            outcome.error = appended.error;
            outcome.error_type = appended.error_type;
        }

        info!(
            page_id,
            deleted = outcome.deleted_count,
            added = outcome.added_count,
            success = outcome.success,
            "refresh finished"
        );
        Ok(outcome)
    }

    /// Replaces the labeled section of `page_id` with `section`.
    ///
    /// Re-lists the document, removes the blocks of the section opened by the
    /// configured marker heading, then appends `section` at the end of the
    /// document. Blocks outside the section are never deleted.
    pub async fn refresh_section(
        &self,
        page_id: &str,
        section: Vec<Block>,
    ) -> SyncResult<SectionRefreshOutcome> {
        self.require_token()?;
        info!(page_id, marker = %self.locator.marker(), "refreshing section");

        let filtered = self.filter(section, "refresh section");
        let blocks = filtered.valid_blocks;
        let mut outcome = SectionRefreshOutcome {
            success: false,
            section_found: false,
            removed_count: 0,
            removal_failures: 0,
            added_count: 0,
            total_count: blocks.len(),
            skipped_count: filtered.skipped_count,
            phase: None,
            error: None,
            error_type: None,
        };

        let existing = match self.reader().list_all(page_id).await {
            Ok(existing) => existing,
            Err(err) => {
                let err = escalate(err)?;
                outcome.phase = Some(SyncPhase::ListExisting);
                outcome.error = Some(self.executor.describe(&err, "list existing blocks"));
                outcome.error_type = Some(err.kind());
                return Ok(outcome);
            }
        };

        let ids = self.locator.locate(&existing);
        outcome.section_found = !ids.is_empty();
        debug!(page_id, found = ids.len(), total = existing.len(), "located section");

        let removed = match self.deleter().delete_many(&ids).await {
            Ok(removed) => removed,
            Err(err) => {
                let err = escalate(err)?;
                outcome.phase = Some(SyncPhase::DeleteExisting);
                outcome.error = Some(self.executor.describe(&err, "delete section"));
                outcome.error_type = Some(err.kind());
                return Ok(outcome);
            }
        };
        outcome.removed_count = removed.success_count;
        outcome.removal_failures = removed.failure_count;
        if removed.cancelled {
            outcome.phase = Some(SyncPhase::DeleteExisting);
            outcome.error = Some(self.executor.describe(&SyncError::Cancelled, "delete section"));
            outcome.error_type = Some(ErrorKind::Cancelled);
            return Ok(outcome);
        }
        if removed.is_total_failure() {
            warn!(page_id, "could not remove old section, not writing new one");
            outcome.phase = Some(SyncPhase::DeleteExisting);
            outcome.error = removed.errors.first().map(|e| e.error.clone());
            outcome.error_type = removed.first_error_type();
            return Ok(outcome);
        }

        let appended = self.appender().append_all(page_id, &blocks, 0).await?;
        outcome.added_count = appended.added_count;
        outcome.success = appended.success;
        if !appended.success {
            outcome.phase = Some(SyncPhase::AppendNew);
            outcome.error = appended.error;
            outcome.error_type = appended.error_type;
        }

        info!(
            page_id,
            removed = outcome.removed_count,
            added = outcome.added_count,
            success = outcome.success,
            "section refresh finished"
        );
        Ok(outcome)
    }
}

/// Lets a missing credential through as an error and hands back anything else.
fn escalate(err: SyncError) -> SyncResult<SyncError> {
    match err {
        SyncError::MissingCredential => Err(err),
        other => Ok(other),
    }
}
