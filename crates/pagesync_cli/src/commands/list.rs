//! List command implementation.

use pagesync_engine::{HttpClient, SyncOrchestrator};
use pagesync_protocol::Block;

/// Runs the list command.
pub async fn run<C: HttpClient>(
    orchestrator: &SyncOrchestrator<C>,
    page_id: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let fetched = orchestrator.fetch_blocks(page_id).await?;
    if format == "json" || !fetched.success {
        return super::print_json(&fetched);
    }

    println!("{} blocks in {page_id}", fetched.blocks.len());
    for block in &fetched.blocks {
        println!("{}", describe(block));
    }
    Ok(())
}

fn describe(block: &Block) -> String {
    let id = block.id.as_deref().unwrap_or("-");
    let text = block.plain_text();
    if text.is_empty() {
        format!("{id}  [{}]", block.kind)
    } else {
        format!("{id}  [{}] {text}", block.kind)
    }
}
