//! # pagesync Protocol
//!
//! Wire types for the remote block-store API.
//!
//! This crate provides:
//! - `Block`, an ordered content unit (type tag + opaque payload)
//! - `ParentReference` and page create/update bodies
//! - Paginated `BlockList` responses and append requests
//! - Endpoint paths and the API's batch and page-size limits
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod block;
pub mod endpoints;
mod error;
mod messages;

pub use block::{
    rich_text, Block, DIVIDER, HEADING_1, HEADING_2, HEADING_3, IMAGE, PARAGRAPH, QUOTE,
};
pub use endpoints::{MAX_BLOCKS_PER_REQUEST, MAX_PAGE_SIZE};
pub use error::ProtocolError;
pub use messages::{
    title_property, url_property, AppendChildrenRequest, ApiErrorBody, BlockList,
    CreatePageRequest, PageObject, ParentReference, UpdatePageRequest,
};
