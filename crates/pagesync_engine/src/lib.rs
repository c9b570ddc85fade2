//! # pagesync Engine
//!
//! Keeps remote block documents in sync with locally generated content.
//!
//! This crate provides:
//! - URL building and authenticated request execution
//! - Retry with jittered exponential backoff
//! - Cursor-paginated listing of block children
//! - Bounded-concurrency bulk deletes and batched appends
//! - Location of a labeled section inside a document
//! - Document operations: create, full refresh, section refresh, existence check
//!
//! ## Architecture
//!
//! Every network call flows through one path:
//!
//! ```text
//! SyncOrchestrator
//!   -> PaginatedReader / BoundedConcurrencyDeleter / BatchAppender
//!     -> RequestExecutor (credential, headers, body)
//!       -> RequestBuilder (URL) + RetryingTransport (backoff)
//!         -> HttpClient (reqwest, or an in-process loopback)
//! ```
//!
//! ## Key Invariants
//!
//! - No request is made without a credential
//! - A write never carries more than the API's batch limit of children
//! - Listing only stops when the remote reports no further page
//! - At most `delete_concurrency` deletes are in flight at once
//! - A section refresh never deletes blocks outside the section
//! - Expected remote failures are reported in outcome objects, not errors

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod appender;
mod config;
mod deleter;
mod error;
mod executor;
mod filter;
mod http;
mod orchestrator;
mod outcome;
mod reader;
mod request;
mod sanitize;
mod section;
#[cfg(test)]
mod test_support;
mod transport;

pub use appender::BatchAppender;
pub use config::{
    ApiToken, CollectionSchema, EngineConfig, RetryPolicy, API_VERSION_ENV, BASE_URL_ENV,
    DEFAULT_BASE_URL, MAX_JITTER_MS, TOKEN_ENV,
};
pub use deleter::BoundedConcurrencyDeleter;
pub use error::{is_retriable_status, ErrorKind, SyncError, SyncResult};
pub use executor::{CallOptions, RequestExecutor};
pub use filter::{
    BasicContentFilter, ContentFilter, FilterOutcome, InvalidReason, MAX_LOGGED_INVALID_REASONS,
    MAX_MEDIA_URL_LEN,
};
pub use http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer,
    ReqwestClient,
};
pub use orchestrator::{NewDocument, NewTitle, SyncOrchestrator};
pub use outcome::{
    AppendOutcome, BatchOutcome, ClearOutcome, CreateOutcome, Existence, FetchOutcome, ItemError,
    RefreshOutcome, SectionRefreshOutcome, StepOutcome, SyncPhase,
};
pub use reader::PaginatedReader;
pub use request::{build_url, QueryParams, RequestBuilder};
pub use sanitize::{DefaultSanitizer, ErrorSanitizer, MAX_ERROR_LEN};
pub use section::{find_section, SectionLocator};
pub use tokio_util::sync::CancellationToken;
pub use transport::{is_transient_message, RetryingTransport, TRANSIENT_MESSAGE_PATTERNS};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
