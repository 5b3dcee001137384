use std::sync::Arc;

use draftdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use draftdesk_core::embedding::{Embedder, EmbeddingError};
use draftdesk_core::extraction::EmailExtractor;
use draftdesk_db::{
    connect_from_config, migrations, DbPool, DirectoryService, SqlChunkRepository,
    SqlContactRepository,
};
use thiserror::Error;
use tracing::info;

use crate::embedder::build_embedder;
use crate::index::DocumentIndex;
use crate::server::DraftdeskMcpServer;

/// Everything a process needs after startup: validated config, a migrated
/// pool and the configured embedder.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("embedding provider setup failed: {0}")]
    Embedder(#[from] EmbeddingError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        embedding_provider = ?config.embedding.provider,
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let embedder = build_embedder(&config.embedding)?;

    Ok(Application { config, db_pool, embedder })
}

impl Application {
    pub fn directory(&self) -> DirectoryService {
        DirectoryService::new(Arc::new(SqlContactRepository::new(self.db_pool.clone())))
    }

    pub fn document_index(&self) -> DocumentIndex {
        DocumentIndex::new(
            Arc::new(SqlChunkRepository::new(self.db_pool.clone())),
            self.embedder.clone(),
            &self.config.retrieval,
        )
    }

    pub fn extractor(&self) -> EmailExtractor {
        EmailExtractor::new(self.config.extraction.max_input_bytes)
    }

    pub fn into_server(self) -> DraftdeskMcpServer {
        DraftdeskMcpServer::new(
            self.db_pool.clone(),
            self.directory(),
            self.document_index(),
            self.extractor(),
        )
    }
}
