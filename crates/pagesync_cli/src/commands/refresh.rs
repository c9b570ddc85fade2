//! Refresh and refresh-section command implementations.

use super::blocks;
use pagesync_engine::{HttpClient, NewTitle, SyncOrchestrator};
use std::path::Path;

/// Runs the refresh command.
pub async fn run<C: HttpClient>(
    orchestrator: &SyncOrchestrator<C>,
    page_id: &str,
    title: Option<NewTitle<'_>>,
    blocks_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let children = blocks::load(blocks_path)?;
    let outcome = orchestrator.refresh_all(page_id, title, children).await?;
    super::print_json(&outcome)
}

/// Runs the refresh-section command.
pub async fn run_section<C: HttpClient>(
    orchestrator: &SyncOrchestrator<C>,
    page_id: &str,
    blocks_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let section = blocks::load(blocks_path)?;
    let outcome = orchestrator.refresh_section(page_id, section).await?;
    super::print_json(&outcome)
}
