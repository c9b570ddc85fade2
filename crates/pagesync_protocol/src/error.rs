//! Error types for wire decoding.

use thiserror::Error;

/// Errors raised while decoding protocol objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A block object had no `type` discriminant.
    #[error("block is missing its type tag")]
    MissingType,

    /// A block object was structurally invalid.
    #[error("invalid block: {0}")]
    InvalidBlock(String),
}
