//! Document index: split, embed, persist, and rank chunks.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use draftdesk_core::chunking::TextSplitter;
use draftdesk_core::config::RetrievalConfig;
use draftdesk_core::domain::chunk::{SearchHit, StoredChunk};
use draftdesk_core::embedding::{Embedder, EmbeddingError, EmbeddingModelInfo};
use draftdesk_core::errors::{ApplicationError, DomainError};
use draftdesk_core::retrieval::rank_chunks;
use draftdesk_db::{ChunkRepository, SourceSummary};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub source: String,
    pub chunks_indexed: u64,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub k: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub chunks: u64,
    pub sources: u64,
}

/// Handle over the chunk store and the active embedder. Cloned cheaply and
/// passed to whoever serves index or search requests.
#[derive(Clone)]
pub struct DocumentIndex {
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    default_k: usize,
    max_k: usize,
}

impl DocumentIndex {
    pub fn new(
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn Embedder>,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            chunks,
            embedder,
            splitter: TextSplitter::new(retrieval.chunk_max_chars, retrieval.chunk_overlap_chars),
            default_k: retrieval.default_k.max(1),
            max_k: retrieval.max_k.max(1),
        }
    }

    pub fn model_info(&self) -> EmbeddingModelInfo {
        self.embedder.model_info()
    }

    /// Replaces every chunk stored for `source` with a fresh split of `text`.
    pub async fn index_document(
        &self,
        source: &str,
        text: &str,
    ) -> Result<IndexReport, ApplicationError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(DomainError::Validation("document source must not be empty".into()).into());
        }
        if text.trim().is_empty() {
            return Err(DomainError::Validation(format!("document `{source}` has no text")).into());
        }

        let chunks = self.splitter.split_document(source, text)?;
        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::Decode(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            ))
            .into());
        }

        let info = self.embedder.model_info();
        let stored = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk { chunk, embedding, model: info.model.clone() })
            .collect::<Vec<_>>();
        let chunks_indexed = self.chunks.replace_source(source, stored).await?;

        info!(
            event_name = "index.document.indexed",
            source,
            chunks_indexed,
            model = %info.model,
            "document indexed"
        );
        Ok(IndexReport { source: source.to_string(), chunks_indexed, model: info.model })
    }

    /// Top `k` chunks for `query`. `k` defaults to the configured value and
    /// is clamped to `1..=max_k`. A blank query returns no hits.
    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<SearchReport, ApplicationError> {
        let k = k.unwrap_or(self.default_k).clamp(1, self.max_k);
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchReport { query: String::new(), k, hits: Vec::new() });
        }

        let info = self.embedder.model_info();
        let query_embedding = self.embedder.embed(query).await?;
        let stored = self.chunks.list_for_model(&info.model, info.dimensions).await?;
        let candidates = stored.len();
        let hits = rank_chunks(query, &query_embedding, stored, k);

        info!(
            event_name = "index.search.completed",
            candidates,
            hits = hits.len(),
            k,
            "search completed"
        );
        Ok(SearchReport { query: query.to_string(), k, hits })
    }

    /// Drops every chunk stored for `source`. Returns the number removed.
    pub async fn remove_document(&self, source: &str) -> Result<u64, ApplicationError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(DomainError::Validation("document source must not be empty".into()).into());
        }

        let chunks_removed = self.chunks.delete_source(source).await?;
        info!(event_name = "index.document.removed", source, chunks_removed, "document removed");
        Ok(chunks_removed)
    }

    pub async fn sources(&self) -> Result<Vec<SourceSummary>, ApplicationError> {
        Ok(self.chunks.list_sources().await?)
    }

    pub async fn stats(&self) -> Result<IndexStats, ApplicationError> {
        Ok(IndexStats {
            chunks: self.chunks.count().await?,
            sources: self.chunks.count_sources().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use draftdesk_core::config::AppConfig;
    use draftdesk_core::embedding::HashingEmbedder;
    use draftdesk_core::errors::{ApplicationError, DomainError};
    use draftdesk_db::repositories::InMemoryChunkRepository;
    use draftdesk_db::SampleDirectory;

    use super::DocumentIndex;

    fn index() -> DocumentIndex {
        let mut retrieval = AppConfig::default().retrieval;
        retrieval.chunk_max_chars = 300;
        retrieval.chunk_overlap_chars = 40;
        DocumentIndex::new(
            Arc::new(InMemoryChunkRepository::default()),
            Arc::new(HashingEmbedder::new("feature-hash-v1", 256)),
            &retrieval,
        )
    }

    #[tokio::test]
    async fn verbatim_text_is_found_after_indexing() {
        let index = index();
        let report = index
            .index_document(SampleDirectory::POLICY_SOURCE, SampleDirectory::POLICY_TEXT)
            .await
            .expect("index policy");
        assert!(report.chunks_indexed > 1);
        assert_eq!(report.model, "feature-hash-v1");

        for phrase in [
            "accrue 1.5 days of annual leave per month",
            "Expense claims must be submitted within 30 days",
            "secure connection through the company VPN",
        ] {
            let found = index.search(phrase, Some(3)).await.expect("search");
            let top = found.hits.first().expect("at least one hit");
            let normalized = top.text.split_whitespace().collect::<Vec<_>>().join(" ");
            assert!(normalized.contains(phrase), "top hit for `{phrase}` was `{}`", top.text);
        }
    }

    #[tokio::test]
    async fn reindexing_a_source_replaces_its_chunks() {
        let index = index();
        index.index_document("memo.txt", "First version of the memo.").await.expect("index");
        index.index_document("memo.txt", "Second version.").await.expect("reindex");

        let stats = index.stats().await.expect("stats");
        assert_eq!(stats.sources, 1);
        assert_eq!(stats.chunks, 1);

        let found = index.search("version", None).await.expect("search");
        assert_eq!(found.hits.len(), 1);
        assert_eq!(found.hits[0].text, "Second version.");
    }

    #[tokio::test]
    async fn removed_documents_leave_sources_and_search() {
        let index = index();
        index.index_document("memo.txt", "Quarterly memo text.").await.expect("index memo");
        index.index_document("notes.txt", "Meeting notes text.").await.expect("index notes");

        let sources = index.sources().await.expect("sources");
        let names: Vec<&str> = sources.iter().map(|summary| summary.source.as_str()).collect();
        assert_eq!(names, vec!["memo.txt", "notes.txt"]);
        assert_eq!(sources[0].model, "feature-hash-v1");

        assert_eq!(index.remove_document("memo.txt").await.expect("remove"), 1);
        assert_eq!(index.remove_document("memo.txt").await.expect("remove again"), 0);

        let found = index.search("Quarterly memo", Some(5)).await.expect("search");
        assert!(found.hits.iter().all(|hit| hit.source == "notes.txt"));
        assert_eq!(index.stats().await.expect("stats").sources, 1);
    }

    #[tokio::test]
    async fn k_is_clamped_and_blank_queries_return_nothing() {
        let index = index();
        index.index_document("memo.txt", "Some memo text.").await.expect("index");

        assert_eq!(index.search("memo", Some(0)).await.expect("search").k, 1);
        assert_eq!(index.search("memo", Some(500)).await.expect("search").k, 20);
        assert_eq!(index.search("memo", None).await.expect("search").k, 4);
        assert!(index.search("   ", None).await.expect("search").hits.is_empty());
    }

    #[tokio::test]
    async fn empty_documents_are_rejected() {
        let index = index();
        let error = index.index_document("memo.txt", " \n ").await.expect_err("empty text");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));

        let error = index.index_document("  ", "text").await.expect_err("empty source");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
    }
}
