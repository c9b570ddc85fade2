//! # pagesync Server
//!
//! In-memory reference server for the block-document API.
//!
//! This crate provides:
//! - Page endpoints (create, fetch, title/archive update)
//! - Block child endpoints (cursor-paginated list, batched append, delete)
//! - Bearer-token authentication and API version checks
//! - Scripted fault injection and a request log
//!
//! # Architecture
//!
//! The server has no network listener. Requests are handed to
//! [`BlockStoreServer::handle`] directly, which makes it usable as the far
//! end of an in-process HTTP client in tests and dry runs. State lives in a
//! [`BlockStore`] that can be shared between servers.
//!
//! # Limits
//!
//! The server enforces the same limits as the remote service: at most 100
//! children per create or append call, and at most 100 blocks per list page.
//! Oversized writes are rejected with 400.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod store;

pub use auth::BearerAuth;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{
    resolve, ApiRequest, Fault, HandlerContext, RequestHandler, RequestRecord, Resolved, Route,
};
pub use server::{BlockStoreServer, ServerResponse};
pub use store::BlockStore;
