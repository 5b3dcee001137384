pub mod connection;
pub mod directory;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, ping, DbPool};
pub use directory::DirectoryService;
pub use fixtures::{SampleDirectory, SeedResult, VerificationResult};
pub use repositories::{
    ChunkRepository, ContactRepository, RepositoryError, SourceSummary, SqlChunkRepository,
    SqlContactRepository,
};
