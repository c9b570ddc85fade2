//! In-process dry-run mode.
//!
//! Commands run against a [`BlockStoreServer`] seeded with every page the
//! command names. Nothing leaves the process.

use pagesync_engine::{
    EngineConfig, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer, SyncOrchestrator,
};
use pagesync_protocol::endpoints::API_VERSION_HEADER;
use pagesync_protocol::Block;
use pagesync_server::{ApiRequest, BlockStoreServer, ServerConfig};
use std::sync::Arc;
use tracing::info;

const LOOPBACK_TOKEN: &str = "secret_loopback";

/// Routes engine requests into an in-process server.
pub struct ServerAdapter(Arc<BlockStoreServer>);

impl LoopbackServer for ServerAdapter {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let response = self.0.handle(ApiRequest {
            method: request.method.as_str(),
            url: &request.url,
            authorization: request.header("Authorization"),
            api_version: request.header(API_VERSION_HEADER),
            body: request.body.as_deref(),
        });
        HttpResponse::new(response.status, response.body)
    }
}

/// Sample content for a seeded page.
fn sample_children(marker: &str) -> Vec<Block> {
    vec![
        Block::heading(1, "Loopback page"),
        Block::paragraph("Seeded content outside the section."),
        Block::heading(2, marker),
        Block::paragraph("Previous section content."),
    ]
}

/// Builds an orchestrator over a fresh reference server holding `pages`.
pub fn connect(
    mut config: EngineConfig,
    pages: &[&str],
) -> SyncOrchestrator<LoopbackClient<ServerAdapter>> {
    if config.token.is_none() {
        config = config.with_token(LOOPBACK_TOKEN);
    }

    let server = Arc::new(BlockStoreServer::new(ServerConfig::default()));
    for page_id in pages {
        server.seed_page(page_id, "Loopback page", sample_children(&config.section_marker));
    }
    info!(pages = pages.len(), "running against loopback server");

    let client = LoopbackClient::new(ServerAdapter(server));
    SyncOrchestrator::new(config, client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesync_engine::Existence;

    #[tokio::test]
    async fn seeded_pages_exist() {
        let orchestrator = connect(EngineConfig::default(), &["p1"]);

        assert_eq!(orchestrator.check_exists("p1").await.unwrap(), Existence::Exists);
        assert_eq!(orchestrator.check_exists("p2").await.unwrap(), Existence::Missing);
    }

    #[tokio::test]
    async fn section_refresh_keeps_other_content() {
        let config = EngineConfig::default().with_section_marker("Notes");
        let orchestrator = connect(config, &["p1"]);

        let outcome = orchestrator
            .refresh_section("p1", vec![Block::paragraph("fresh")])
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.removed_count, 2);

        let fetched = orchestrator.fetch_blocks("p1").await.unwrap();
        let texts: Vec<String> = fetched.blocks.iter().map(Block::plain_text).collect();
        assert_eq!(
            texts,
            vec!["Loopback page", "Seeded content outside the section.", "fresh"]
        );
    }
}
