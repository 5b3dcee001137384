use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub String);

impl ChunkId {
    pub fn for_position(source: &str, position: u32) -> Self {
        Self(format!("{source}#{position}"))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bounded segment of document text prepared for embedding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub source: String,
    pub position: u32,
    pub text: String,
}

impl DocumentChunk {
    pub fn new(
        source: impl Into<String>,
        position: u32,
        text: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let source = source.into();
        let text = text.into();

        if source.trim().is_empty() {
            return Err(DomainError::Validation("chunk source must not be empty".to_string()));
        }
        if text.trim().is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "chunk {position} of `{source}` has empty text"
            )));
        }

        Ok(Self { id: ChunkId::for_position(&source, position), source, position, text })
    }
}

/// A chunk together with the vector produced for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    pub source: String,
    pub text: String,
    pub dense_score: f32,
    pub lexical_score: f32,
    pub fused_score: f64,
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::{ChunkId, DocumentChunk};
    use crate::errors::DomainError;

    #[test]
    fn chunk_id_combines_source_and_position() {
        let chunk = DocumentChunk::new("policies/hr.txt", 3, "Leave is accrued monthly.")
            .expect("valid chunk");
        assert_eq!(chunk.id, ChunkId("policies/hr.txt#3".to_string()));
        assert_eq!(chunk.id.to_string(), "policies/hr.txt#3");
    }

    #[test]
    fn chunk_rejects_blank_text() {
        let result = DocumentChunk::new("policies/hr.txt", 0, "   \n ");
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }
}
