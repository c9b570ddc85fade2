//! Pre-write classification of content blocks.

use pagesync_protocol::Block;
use serde::Serialize;
use tracing::warn;
use url::Url;

/// Longest media URL the remote accepts.
pub const MAX_MEDIA_URL_LEN: usize = 2000;

const MEDIA_URL_SCHEMES: &[&str] = &["http", "https"];

/// How many rejections are logged per operation.
pub const MAX_LOGGED_INVALID_REASONS: usize = 5;

/// Why a block was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidReason {
    /// Short explanation.
    pub reason: String,
    /// Offending URL, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Result of filtering a block list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Blocks that may be written.
    pub valid_blocks: Vec<Block>,
    /// Number of blocks dropped.
    pub skipped_count: usize,
    /// One entry per dropped block.
    pub invalid_reasons: Vec<InvalidReason>,
}

impl FilterOutcome {
    /// Logs at most [`MAX_LOGGED_INVALID_REASONS`] rejections.
    pub fn log_rejections(&self, operation: &str) {
        if self.skipped_count == 0 {
            return;
        }
        warn!(
            operation,
            skipped = self.skipped_count,
            "dropped blocks before write"
        );
        for reason in self.invalid_reasons.iter().take(MAX_LOGGED_INVALID_REASONS) {
            warn!(operation, reason = %reason.reason, url = ?reason.url, "rejected block");
        }
    }
}

/// Decides which blocks are safe to send to the remote.
///
/// Implementations must be pure: same input, same output, no I/O.
pub trait ContentFilter: Send + Sync {
    /// Splits `blocks` into writable blocks and rejections.
    fn filter_blocks(&self, blocks: Vec<Block>, exclude_media: bool) -> FilterOutcome;
}

/// Default filter: drops media on request and rejects unusable media URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicContentFilter;

impl BasicContentFilter {
    fn check(block: &Block, exclude_media: bool) -> Option<InvalidReason> {
        if !block.is_media() {
            return None;
        }
        if exclude_media {
            return Some(InvalidReason {
                reason: "media excluded".into(),
                url: block.media_url().map(str::to_string),
            });
        }

        let Some(url) = block.media_url() else {
            return Some(InvalidReason {
                reason: format!("{} block has no url", block.kind),
                url: None,
            });
        };

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Some(InvalidReason {
                    reason: format!("invalid url: {e}"),
                    url: Some(url.chars().take(100).collect()),
                })
            }
        };
        if !MEDIA_URL_SCHEMES.contains(&parsed.scheme()) {
            return Some(InvalidReason {
                reason: "unsupported url scheme".into(),
                url: Some(url.chars().take(100).collect()),
            });
        }

        if url.len() > MAX_MEDIA_URL_LEN {
            return Some(InvalidReason {
                reason: format!("url longer than {MAX_MEDIA_URL_LEN} characters"),
                url: Some(url.chars().take(100).collect()),
            });
        }

        None
    }
}

impl ContentFilter for BasicContentFilter {
    fn filter_blocks(&self, blocks: Vec<Block>, exclude_media: bool) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for block in blocks {
            match Self::check(&block, exclude_media) {
                Some(reason) => {
                    outcome.skipped_count += 1;
                    outcome.invalid_reasons.push(reason);
                }
                None => outcome.valid_blocks.push(block),
            }
        }
        outcome
    }
}
