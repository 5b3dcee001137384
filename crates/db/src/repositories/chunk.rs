use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};

use draftdesk_core::domain::chunk::{ChunkId, DocumentChunk, StoredChunk};
use draftdesk_core::embedding::{blob_to_embedding, embedding_to_blob};

use super::{ChunkRepository, RepositoryError};
use crate::DbPool;

/// Per-source view of the chunk store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub chunks: u64,
    pub model: String,
    pub indexed_at: DateTime<Utc>,
}

pub struct SqlChunkRepository {
    pool: DbPool,
}

impl SqlChunkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkRepository for SqlChunkRepository {
    async fn replace_source(
        &self,
        source: &str,
        chunks: Vec<StoredChunk>,
    ) -> Result<u64, RepositoryError> {
        if let Some(foreign) = chunks.iter().find(|stored| stored.chunk.source != source) {
            return Err(RepositoryError::Decode(format!(
                "chunk `{}` does not belong to source `{source}`",
                foreign.chunk.id
            )));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_chunks WHERE source = ?1")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0u64;
        for stored in &chunks {
            let dimensions = i64::try_from(stored.embedding.len()).map_err(|_| {
                RepositoryError::Decode(format!("chunk `{}` is too large", stored.chunk.id))
            })?;

            sqlx::query(
                "INSERT INTO document_chunks
                     (id, source, position, text, embedding, model, dimensions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&stored.chunk.id.0)
            .bind(&stored.chunk.source)
            .bind(i64::from(stored.chunk.position))
            .bind(&stored.chunk.text)
            .bind(embedding_to_blob(&stored.embedding))
            .bind(&stored.model)
            .bind(dimensions)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_for_model(
        &self,
        model: &str,
        dimensions: usize,
    ) -> Result<Vec<StoredChunk>, RepositoryError> {
        let dimensions_param = i64::try_from(dimensions)
            .map_err(|_| RepositoryError::Decode(format!("invalid dimensions {dimensions}")))?;

        let rows = sqlx::query(
            "SELECT id, source, position, text, embedding, model
             FROM document_chunks
             WHERE model = ?1 AND dimensions = ?2
             ORDER BY source, position",
        )
        .bind(model)
        .bind(dimensions_param)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<StoredChunk, RepositoryError> {
                let chunk = chunk_from_row(row)?;
                let blob: Vec<u8> = row.try_get("embedding")?;
                let embedding = blob_to_embedding(&blob)
                    .map_err(|error| RepositoryError::Decode(error.to_string()))?;
                if embedding.len() != dimensions {
                    return Err(RepositoryError::Decode(format!(
                        "chunk `{}` stores {} dimensions, expected {dimensions}",
                        chunk.id,
                        embedding.len()
                    )));
                }
                Ok(StoredChunk { chunk, embedding, model: row.try_get("model")? })
            })
            .collect()
    }

    async fn list_sources(&self) -> Result<Vec<SourceSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS chunks, MAX(model) AS model, MAX(created_at) AS indexed_at
             FROM document_chunks
             GROUP BY source
             ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SourceSummary, RepositoryError> {
                let chunks: i64 = row.try_get("chunks")?;
                let indexed_at: String = row.try_get("indexed_at")?;
                Ok(SourceSummary {
                    source: row.try_get("source")?,
                    chunks: non_negative(chunks)?,
                    model: row.try_get("model")?,
                    indexed_at: parse_timestamp(&indexed_at)?,
                })
            })
            .collect()
    }

    async fn delete_source(&self, source: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM document_chunks WHERE source = ?1")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks")
            .fetch_one(&self.pool)
            .await?;
        non_negative(count)
    }

    async fn count_sources(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source) FROM document_chunks")
            .fetch_one(&self.pool)
            .await?;
        non_negative(count)
    }
}

fn chunk_from_row(row: &SqliteRow) -> Result<DocumentChunk, RepositoryError> {
    let position: i64 = row.try_get("position")?;
    let position = u32::try_from(position)
        .map_err(|_| RepositoryError::Decode(format!("invalid chunk position {position}")))?;

    Ok(DocumentChunk {
        id: ChunkId(row.try_get("id")?),
        source: row.try_get("source")?,
        position,
        text: row.try_get("text")?,
    })
}

fn non_negative(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count).map_err(|_| RepositoryError::Decode(format!("negative count {count}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{value}`: {error}")))
}

#[cfg(test)]
mod tests {
    use draftdesk_core::domain::chunk::{DocumentChunk, StoredChunk};

    use super::SqlChunkRepository;
    use crate::repositories::{ChunkRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlChunkRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlChunkRepository::new(pool)
    }

    fn stored(source: &str, position: u32, text: &str, model: &str, dims: usize) -> StoredChunk {
        let mut embedding = vec![0.0_f32; dims];
        embedding[position as usize % dims] = 1.0;
        StoredChunk {
            chunk: DocumentChunk::new(source, position, text).expect("chunk"),
            embedding,
            model: model.to_string(),
        }
    }

    #[tokio::test]
    async fn replace_source_swaps_previous_chunks() {
        let repo = repository().await;
        let first = vec![
            stored("hr.txt", 0, "Leave accrues monthly.", "feature-hash-v1", 4),
            stored("hr.txt", 1, "Expenses need receipts.", "feature-hash-v1", 4),
        ];
        assert_eq!(repo.replace_source("hr.txt", first).await.expect("index"), 2);

        let second = vec![stored("hr.txt", 0, "Policy rewritten.", "feature-hash-v1", 4)];
        assert_eq!(repo.replace_source("hr.txt", second).await.expect("reindex"), 1);

        let chunks = repo.list_for_model("feature-hash-v1", 4).await.expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk.text, "Policy rewritten.");
        assert_eq!(repo.count().await.expect("count"), 1);

        let sources = repo.list_sources().await.expect("summaries");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunks, 1);
    }

    #[tokio::test]
    async fn list_for_model_filters_and_decodes_vectors() {
        let repo = repository().await;
        repo.replace_source("a.txt", vec![stored("a.txt", 0, "alpha", "feature-hash-v1", 4)])
            .await
            .expect("index a");
        repo.replace_source("b.txt", vec![stored("b.txt", 1, "beta", "nomic-embed-text", 8)])
            .await
            .expect("index b");

        let hashed = repo.list_for_model("feature-hash-v1", 4).await.expect("list");
        assert_eq!(hashed.len(), 1);
        assert_eq!(hashed[0].chunk.id.0, "a.txt#0");
        assert_eq!(hashed[0].embedding, vec![1.0, 0.0, 0.0, 0.0]);

        assert!(repo.list_for_model("feature-hash-v1", 8).await.expect("list").is_empty());
        assert_eq!(repo.count_sources().await.expect("sources"), 2);

        let sources = repo.list_sources().await.expect("summaries");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].model, "nomic-embed-text");
    }

    #[tokio::test]
    async fn foreign_chunks_are_rejected_and_delete_reports_rows() {
        let repo = repository().await;
        let result = repo
            .replace_source("hr.txt", vec![stored("other.txt", 0, "text", "feature-hash-v1", 4)])
            .await;
        assert!(matches!(result, Err(RepositoryError::Decode(_))));

        repo.replace_source("hr.txt", vec![stored("hr.txt", 0, "text", "feature-hash-v1", 4)])
            .await
            .expect("index");
        assert_eq!(repo.delete_source("hr.txt").await.expect("delete"), 1);
        assert_eq!(repo.delete_source("hr.txt").await.expect("delete again"), 0);
    }
}
