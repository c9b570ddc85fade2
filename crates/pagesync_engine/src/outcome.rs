//! Result objects returned to callers.
//!
//! The remote store has no transactions, so multi-step and multi-item
//! operations report what happened instead of succeeding or failing as a
//! whole. Every outcome serializes to a flat JSON object suitable for
//! relaying to a UI.

use crate::error::ErrorKind;
use pagesync_protocol::Block;
use serde::Serialize;

/// Failure of a single item inside a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// Remote ID of the item.
    pub item_id: String,
    /// Sanitized reason.
    pub error: String,
    /// Category of the failure.
    pub error_type: ErrorKind,
}

/// Per-item tally of a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Items that succeeded.
    pub success_count: usize,
    /// Items that failed.
    pub failure_count: usize,
    /// One entry per failed item.
    pub errors: Vec<ItemError>,
    /// Set when the run stopped early on cancellation; items that were
    /// never attempted are in neither count.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Returns true when no item failed.
    pub fn is_complete(&self) -> bool {
        self.failure_count == 0
    }

    /// Returns true when items were attempted and none succeeded.
    pub fn is_total_failure(&self) -> bool {
        self.success_count == 0 && self.failure_count > 0
    }

    /// Category of the first failure, if any item failed.
    pub fn first_error_type(&self) -> Option<ErrorKind> {
        self.errors.first().map(|e| e.error_type)
    }

    pub(crate) fn record(&mut self, item_id: &str, result: Result<(), (String, ErrorKind)>) {
        match result {
            Ok(()) => self.success_count += 1,
            Err((error, error_type)) => {
                if error_type == ErrorKind::Cancelled {
                    self.cancelled = true;
                }
                self.failure_count += 1;
                self.errors.push(ItemError {
                    item_id: item_id.to_string(),
                    error,
                    error_type,
                });
            }
        }
    }
}

/// Result of writing a block list in batches.
///
/// `added_count < total_count` with `success == false` is a partial write:
/// the first `added_count` blocks are on the remote and a retry should
/// resume from that index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// Whether every batch was written.
    pub success: bool,
    /// Blocks written by this call.
    pub added_count: usize,
    /// Blocks this call was asked to write.
    pub total_count: usize,
    /// Sanitized reason for the failed batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Category of the failed batch's error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

impl AppendOutcome {
    /// Outcome of a call that had nothing to write.
    pub fn empty() -> Self {
        Self::complete(0)
    }

    /// Every one of `count` blocks was written.
    pub fn complete(count: usize) -> Self {
        Self {
            success: true,
            added_count: count,
            total_count: count,
            error: None,
            error_type: None,
        }
    }
}

/// Result of a single-call operation such as a title update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Whether the call succeeded.
    pub success: bool,
    /// Sanitized reason for failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

impl StepOutcome {
    /// A successful step.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            error_type: None,
        }
    }

    /// A failed step.
    pub fn failed(error: String, kind: ErrorKind) -> Self {
        Self {
            success: false,
            error: Some(error),
            error_type: Some(kind),
        }
    }
}

/// Result of listing a document's children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    /// Whether every page was read.
    pub success: bool,
    /// Children in document order; empty on failure.
    pub blocks: Vec<Block>,
    /// Sanitized reason for failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

/// Result of removing every child of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    /// False when the listing failed or no existing child could be removed.
    pub success: bool,
    /// Children found by the listing.
    pub found_count: usize,
    /// Per-item delete tally.
    pub deletes: BatchOutcome,
    /// Sanitized reason for failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

/// Whether a remote document is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Existence {
    /// Present and not archived.
    Exists,
    /// 404, or present but archived.
    Missing,
    /// The check itself failed; nothing is known.
    Unknown,
}

impl Existence {
    /// `Some(true)`, `Some(false)`, or `None` when indeterminate.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Existence::Exists => Some(true),
            Existence::Missing => Some(false),
            Existence::Unknown => None,
        }
    }
}

/// Step of a multi-step operation at which it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Filtering or validating input.
    Prepare,
    /// Creating the document.
    CreatePage,
    /// Listing existing children.
    ListExisting,
    /// Removing existing children.
    DeleteExisting,
    /// Writing new children.
    AppendNew,
}

/// Result of creating a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOutcome {
    /// Whether the document was created.
    pub success: bool,
    /// ID of the created document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    /// External URL of the created document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Result of writing children beyond the first batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_result: Option<AppendOutcome>,
    /// Blocks dropped by the content filter.
    pub skipped_count: usize,
    /// Sanitized reason for failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

/// Result of replacing every child of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    /// Whether the new content was fully written.
    pub success: bool,
    /// Whether the title update succeeded (`None` if not requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_updated: Option<bool>,
    /// Existing children removed.
    pub deleted_count: usize,
    /// Existing children that could not be removed.
    pub delete_failures: usize,
    /// New children written.
    pub added_count: usize,
    /// New children to write.
    pub total_count: usize,
    /// Blocks dropped by the content filter.
    pub skipped_count: usize,
    /// Step that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<SyncPhase>,
    /// Sanitized reason for failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

/// Result of replacing the labeled section of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRefreshOutcome {
    /// Whether the new section was fully written.
    pub success: bool,
    /// Whether a previous section was found.
    pub section_found: bool,
    /// Blocks of the previous section removed.
    pub removed_count: usize,
    /// Blocks of the previous section that could not be removed.
    pub removal_failures: usize,
    /// New section blocks written.
    pub added_count: usize,
    /// New section blocks to write.
    pub total_count: usize,
    /// Blocks dropped by the content filter.
    pub skipped_count: usize,
    /// Step that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<SyncPhase>,
    /// Sanitized reason for failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_outcome_records_items() {
        let mut outcome = BatchOutcome::default();
        outcome.record("a", Ok(()));
        outcome.record("b", Err(("gone".into(), ErrorKind::NotFound)));

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.failure_count, 1);
        assert!(!outcome.is_complete());
        assert!(!outcome.is_total_failure());
        assert!(!outcome.cancelled);
        assert_eq!(outcome.errors[0].item_id, "b");
        assert_eq!(outcome.first_error_type(), Some(ErrorKind::NotFound));

        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("cancelled").is_none());
        assert_eq!(value["errors"][0]["error_type"], json!("not_found"));
    }

    #[test]
    fn cancelled_item_marks_the_batch() {
        let mut outcome = BatchOutcome::default();
        outcome.record("a", Err(("sync cancelled".into(), ErrorKind::Cancelled)));
        assert!(outcome.cancelled);
        assert_eq!(serde_json::to_value(&outcome).unwrap()["cancelled"], json!(true));
    }

    #[test]
    fn existence_tri_state() {
        assert_eq!(Existence::Exists.as_option(), Some(true));
        assert_eq!(Existence::Missing.as_option(), Some(false));
        assert_eq!(Existence::Unknown.as_option(), None);
    }

    #[test]
    fn refresh_outcome_serializes_flat() {
        let outcome = RefreshOutcome {
            success: false,
            title_updated: None,
            deleted_count: 0,
            delete_failures: 0,
            added_count: 0,
            total_count: 3,
            skipped_count: 0,
            phase: Some(SyncPhase::DeleteExisting),
            error: Some("list block children: HTTP 500".into()),
            error_type: Some(ErrorKind::Server),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["phase"], json!("delete_existing"));
        assert_eq!(value["error_type"], json!("server"));
        assert!(value.get("title_updated").is_none());
    }
}
