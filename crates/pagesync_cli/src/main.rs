//! pagesync CLI
//!
//! Command-line client for keeping remote block documents in sync.
//!
//! # Commands
//!
//! - `exists` - Report whether a page exists, is missing, or is unknown
//! - `list` - Print every child block of a page
//! - `create` - Create a page with children read from a JSON file
//! - `refresh` - Replace all children of a page
//! - `refresh-section` - Replace the marker section of a page
//!
//! Outcomes are printed as JSON. With `--loopback` every command runs
//! against an in-process reference server instead of the remote API.

mod commands;

use clap::{Parser, Subcommand};
use pagesync_engine::{EngineConfig, HttpClient, NewTitle, SyncOrchestrator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sync client for rate-limited block-document APIs.
#[derive(Parser)]
#[command(name = "pagesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API bearer token
    #[arg(global = true, long, env = "PAGESYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API base URL
    #[arg(global = true, long, env = "PAGESYNC_BASE_URL")]
    base_url: Option<String>,

    /// API version header value
    #[arg(global = true, long, env = "PAGESYNC_API_VERSION")]
    api_version: Option<String>,

    /// Heading text that opens the refreshable section
    #[arg(global = true, long)]
    section_marker: Option<String>,

    /// Drop image, video, audio, file, pdf and embed blocks before writing
    #[arg(global = true, long)]
    exclude_media: bool,

    /// Run against an in-process reference server
    #[arg(global = true, long)]
    loopback: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether a page exists
    Exists {
        /// Page ID
        page_id: String,
    },

    /// Print every child block of a page
    List {
        /// Page ID
        page_id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a page
    Create {
        /// Parent page or collection ID
        #[arg(long)]
        parent: String,

        /// Treat the parent as a collection
        #[arg(long)]
        collection: bool,

        /// Page title
        #[arg(long)]
        title: String,

        /// Source URL stored on collection rows
        #[arg(long)]
        source_url: Option<String>,

        /// JSON file with the initial children
        #[arg(long)]
        blocks: Option<PathBuf>,
    },

    /// Replace every child of a page
    Refresh {
        /// Page ID
        page_id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// The page is a collection row
        #[arg(long)]
        row: bool,

        /// JSON file with the new children
        #[arg(long)]
        blocks: PathBuf,
    },

    /// Replace the marker section of a page
    RefreshSection {
        /// Page ID
        page_id: String,

        /// JSON file with the new section
        #[arg(long)]
        blocks: PathBuf,
    },

    /// Show version information
    Version,
}

impl Commands {
    /// Page IDs the command reads or writes.
    fn targets(&self) -> Vec<&str> {
        match self {
            Commands::Exists { page_id }
            | Commands::List { page_id, .. }
            | Commands::Refresh { page_id, .. }
            | Commands::RefreshSection { page_id, .. } => vec![page_id.as_str()],
            Commands::Create { parent, .. } => vec![parent.as_str()],
            Commands::Version => Vec::new(),
        }
    }
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(version) = &cli.api_version {
        config = config.with_api_version(version.clone());
    }
    if let Some(token) = &cli.token {
        config = config.with_token(token.clone());
    }
    if let Some(marker) = &cli.section_marker {
        config = config.with_section_marker(marker.clone());
    }
    config
}

async fn dispatch<C: HttpClient>(
    orchestrator: SyncOrchestrator<C>,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Exists { page_id } => commands::exists::run(&orchestrator, &page_id).await?,
        Commands::List { page_id, format } => {
            commands::list::run(&orchestrator, &page_id, &format).await?
        }
        Commands::Create {
            parent,
            collection,
            title,
            source_url,
            blocks,
        } => {
            let target = commands::create::Target {
                parent,
                collection,
                title,
                source_url,
            };
            commands::create::run(&orchestrator, target, blocks.as_deref()).await?
        }
        Commands::Refresh {
            page_id,
            title,
            row,
            blocks,
        } => {
            let title = title.as_deref().map(|text| {
                if row {
                    NewTitle::Row(text)
                } else {
                    NewTitle::Page(text)
                }
            });
            commands::refresh::run(&orchestrator, &page_id, title, &blocks).await?
        }
        Commands::RefreshSection { page_id, blocks } => {
            commands::refresh::run_section(&orchestrator, &page_id, &blocks).await?
        }
        Commands::Version => commands::version::run(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if matches!(cli.command, Commands::Version) {
        commands::version::run();
        return Ok(());
    }

    let config = engine_config(&cli);
    if cli.loopback {
        let orchestrator = commands::loopback::connect(config, &cli.command.targets())
            .with_exclude_media(cli.exclude_media);
        dispatch(orchestrator, cli.command).await
    } else {
        let orchestrator = SyncOrchestrator::connect(config)?.with_exclude_media(cli.exclude_media);
        dispatch(orchestrator, cli.command).await
    }
}
