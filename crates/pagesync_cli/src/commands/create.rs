//! Create command implementation.

use super::blocks;
use pagesync_engine::{HttpClient, NewDocument, SyncOrchestrator};
use pagesync_protocol::ParentReference;
use std::path::Path;

/// Where and how to create the page.
#[derive(Debug, Clone)]
pub struct Target {
    /// Parent page or collection ID.
    pub parent: String,
    /// Whether `parent` is a collection.
    pub collection: bool,
    /// Page title.
    pub title: String,
    /// Source URL for collection rows.
    pub source_url: Option<String>,
}

impl Target {
    fn into_document(self) -> NewDocument {
        let parent = if self.collection {
            ParentReference::collection(self.parent)
        } else {
            ParentReference::page(self.parent)
        };
        let document = NewDocument::new(parent, self.title);
        match self.source_url {
            Some(url) => document.with_source_url(url),
            None => document,
        }
    }
}

/// Runs the create command.
pub async fn run<C: HttpClient>(
    orchestrator: &SyncOrchestrator<C>,
    target: Target,
    blocks_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let children = match blocks_path {
        Some(path) => blocks::load(path)?,
        None => Vec::new(),
    };

    let document = target.into_document().with_children(children);
    let outcome = orchestrator.create(document).await?;
    super::print_json(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_target() {
        let target = Target {
            parent: "db1".into(),
            collection: true,
            title: "Row".into(),
            source_url: Some("https://example.com/book".into()),
        };
        let document = target.into_document();
        assert!(document.parent.is_collection());
        assert_eq!(document.source_url.as_deref(), Some("https://example.com/book"));
    }

    #[test]
    fn page_target() {
        let target = Target {
            parent: "p1".into(),
            collection: false,
            title: "Child".into(),
            source_url: None,
        };
        let document = target.into_document();
        assert!(!document.parent.is_collection());
        assert_eq!(document.title, "Child");
    }
}
