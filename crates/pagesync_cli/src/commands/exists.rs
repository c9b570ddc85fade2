//! Exists command implementation.

use pagesync_engine::{Existence, HttpClient, SyncOrchestrator};
use serde::Serialize;

/// Existence check result.
#[derive(Debug, Serialize)]
pub struct ExistsResult<'a> {
    /// Page ID.
    pub page_id: &'a str,
    /// Tri-state answer.
    pub state: Existence,
    /// `true`/`false`, or absent when the answer is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// Runs the exists command.
pub async fn run<C: HttpClient>(
    orchestrator: &SyncOrchestrator<C>,
    page_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = orchestrator.check_exists(page_id).await?;
    super::print_json(&ExistsResult {
        page_id,
        state,
        exists: state.as_option(),
    })
}
