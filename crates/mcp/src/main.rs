//! Draftdesk MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: ./draftdesk.toml if present, sqlite://draftdesk.db, hashing embedder
//! draftdesk-mcp
//!
//! # Explicit config file and database
//! draftdesk-mcp --config config/draftdesk.toml --database-url sqlite://draftdesk.db
//!
//! # Ollama embeddings
//! DRAFTDESK_EMBEDDING_PROVIDER=ollama DRAFTDESK_EMBEDDING_BASE_URL=http://localhost:11434 \
//!     DRAFTDESK_EMBEDDING_MODEL=nomic-embed-text DRAFTDESK_EMBEDDING_DIMENSIONS=768 draftdesk-mcp
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use draftdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use draftdesk_mcp::logging::init_logging;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "draftdesk-mcp", about = "Draftdesk MCP server over stdio", version)]
struct Args {
    /// Config file path (defaults to draftdesk.toml or config/draftdesk.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override database.url
    #[arg(long)]
    database_url: Option<String>,
    /// Override logging.level
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                database_url: self.database_url,
                log_level: self.log_level,
                ..ConfigOverrides::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config and logging come before anything that might log.
    let config = AppConfig::load(args.load_options())?;
    init_logging(&config.logging);
    info!(event_name = "mcp.process.start", "starting Draftdesk MCP server");

    let app = draftdesk_mcp::bootstrap_with_config(config).await?;
    app.into_server().run_stdio().await
}
