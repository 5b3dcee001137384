use async_trait::async_trait;
use thiserror::Error;

use draftdesk_core::domain::chunk::StoredChunk;
use draftdesk_core::domain::contact::Contact;
use draftdesk_core::errors::ApplicationError;

pub mod chunk;
pub mod contact;
pub mod memory;

pub use chunk::{SourceSummary, SqlChunkRepository};
pub use contact::SqlContactRepository;
pub use memory::{InMemoryChunkRepository, InMemoryContactRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        Self::Persistence(error.to_string())
    }
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Contacts whose name or address contains `fragment`, ignoring case.
    /// Candidates come back unranked.
    async fn find_candidates(&self, fragment: &str) -> Result<Vec<Contact>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Contact>, RepositoryError>;
    /// Inserts or replaces the address of the contact with the same name.
    async fn save(&self, contact: Contact) -> Result<(), RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Atomically swaps every chunk stored for `source` with `chunks`.
    async fn replace_source(
        &self,
        source: &str,
        chunks: Vec<StoredChunk>,
    ) -> Result<u64, RepositoryError>;

    /// Chunks embedded by `model` at `dimensions`; vectors from any other
    /// model are not comparable and are skipped.
    async fn list_for_model(
        &self,
        model: &str,
        dimensions: usize,
    ) -> Result<Vec<StoredChunk>, RepositoryError>;

    /// One summary per indexed source, ordered by source name.
    async fn list_sources(&self) -> Result<Vec<SourceSummary>, RepositoryError>;
    async fn delete_source(&self, source: &str) -> Result<u64, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
    async fn count_sources(&self) -> Result<u64, RepositoryError>;
}
