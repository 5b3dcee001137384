pub mod chunking;
pub mod config;
pub mod directory;
pub mod domain;
pub mod embedding;
pub mod errors;
pub mod extraction;
pub mod retrieval;

pub use chunking::TextSplitter;
pub use directory::{best_match, ContactMatch, Directory, LookupOutcome, MatchKind};
pub use domain::chunk::{ChunkId, DocumentChunk, SearchHit, StoredChunk};
pub use domain::contact::Contact;
pub use domain::draft::EmailDraft;
pub use embedding::{Embedder, EmbeddingError, EmbeddingModelInfo, HashingEmbedder};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use extraction::{
    extract_email_fields, EmailExtractor, EmailField, ExtractedEmail, ExtractionError,
};
pub use retrieval::rank_chunks;
