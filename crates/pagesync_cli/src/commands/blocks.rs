//! Block file loading.
//!
//! A block file is JSON holding either an array of blocks or an object with
//! a `children` array, in the wire shape the API uses:
//!
//! ```json
//! [{ "type": "paragraph", "paragraph": { "rich_text": [] } }]
//! ```

use pagesync_protocol::Block;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading a block file.
#[derive(Error, Debug)]
pub enum BlockFileError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid block list.
    #[error("invalid block file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlockFile {
    List(Vec<Block>),
    Wrapped { children: Vec<Block> },
}

/// Reads the blocks stored at `path`.
pub fn load(path: &Path) -> Result<Vec<Block>, BlockFileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| BlockFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: BlockFile = serde_json::from_str(&raw).map_err(|source| BlockFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(match file {
        BlockFile::List(blocks) => blocks,
        BlockFile::Wrapped { children } => children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_plain_list() {
        let file = file_with(
            r#"[
                { "type": "heading_2", "heading_2": { "rich_text": [{ "type": "text", "text": { "content": "Highlights" } }] } },
                { "type": "divider", "divider": {} }
            ]"#,
        );

        let blocks = load(file.path()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].is_heading());
        assert_eq!(blocks[0].plain_text(), "Highlights");
        assert_eq!(blocks[1].kind, "divider");
    }

    #[test]
    fn loads_wrapped_children() {
        let file = file_with(r#"{ "children": [{ "type": "paragraph", "paragraph": { "rich_text": [] } }] }"#);
        let blocks = load(file.path()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, "paragraph");
    }

    #[test]
    fn rejects_blocks_without_type() {
        let file = file_with(r#"[{ "paragraph": {} }]"#);
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, BlockFileError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BlockFileError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}
