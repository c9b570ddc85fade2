//! Locating the labeled section of a document.

use pagesync_protocol::Block;

/// Finds the section opened by a heading whose text is `marker`.
///
/// The section is that heading plus every following non-heading block, up
/// to the next heading of any level or the end of the list. Only the first
/// matching heading opens a section. Returns the IDs of the section's
/// blocks in document order, or an empty list when no heading matches.
/// Blocks without a remote ID are skipped.
pub fn find_section(blocks: &[Block], marker: &str) -> Vec<String> {
    let Some(start) = blocks
        .iter()
        .position(|b| b.is_heading() && b.plain_text() == marker)
    else {
        return Vec::new();
    };

    let end = blocks[start + 1..]
        .iter()
        .position(Block::is_heading)
        .map_or(blocks.len(), |offset| start + 1 + offset);

    blocks[start..end]
        .iter()
        .filter_map(|b| b.id.clone())
        .collect()
}

/// [`find_section`] bound to a configured marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLocator {
    marker: String,
}

impl SectionLocator {
    /// Creates a locator for `marker`.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Returns the marker text.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// IDs of the section's blocks within `blocks`.
    pub fn locate(&self, blocks: &[Block]) -> Vec<String> {
        find_section(blocks, &self.marker)
    }
}
