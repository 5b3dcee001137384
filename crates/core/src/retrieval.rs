//! Hybrid ranking of stored chunks against a query.
//!
//! Dense (cosine) and lexical (keyword overlap) rankings are fused with
//! reciprocal-rank fusion. A chunk that contains the whole query verbatim is
//! lifted above fused scores so verbatim look-ups find their source chunk.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::chunk::{SearchHit, StoredChunk};
use crate::embedding::{cosine_similarity, tokenize};

/// Reciprocal Rank Fusion constant (higher softens score differences).
pub const RRF_K: f64 = 60.0;
const LEXICAL_SCORE_WEIGHT: f64 = 0.05;
const EXACT_PHRASE_BONUS: f64 = 1.0;
const MIN_TOKEN_CHARS: usize = 3;

struct Candidate {
    stored: StoredChunk,
    dense_score: f32,
    lexical_score: f32,
    fused_score: f64,
}

pub fn rank_chunks(
    query: &str,
    query_embedding: &[f32],
    stored: Vec<StoredChunk>,
    k: usize,
) -> Vec<SearchHit> {
    if query.trim().is_empty() || k == 0 || stored.is_empty() {
        return Vec::new();
    }

    let tokens = query_tokens(query);
    let phrase = normalize_phrase(query);

    let mut candidates: Vec<Candidate> = stored
        .into_iter()
        .map(|stored| {
            let dense_score = cosine_similarity(query_embedding, &stored.embedding);
            let lexical_score = keyword_overlap(&tokens, &stored.chunk.text);
            Candidate { stored, dense_score, lexical_score, fused_score: 0.0 }
        })
        .collect();

    let mut dense_order: Vec<usize> = (0..candidates.len()).collect();
    dense_order.sort_by(|a, b| {
        candidates[*b]
            .dense_score
            .partial_cmp(&candidates[*a].dense_score)
            .unwrap_or(Ordering::Equal)
    });
    for (rank, idx) in dense_order.into_iter().enumerate() {
        candidates[idx].fused_score += rrf_contribution(RRF_K, rank + 1);
    }

    let mut lexical_order: Vec<usize> =
        (0..candidates.len()).filter(|idx| candidates[*idx].lexical_score > 0.0).collect();
    lexical_order.sort_by(|a, b| {
        candidates[*b]
            .lexical_score
            .partial_cmp(&candidates[*a].lexical_score)
            .unwrap_or(Ordering::Equal)
    });
    for (rank, idx) in lexical_order.into_iter().enumerate() {
        let candidate = &mut candidates[idx];
        candidate.fused_score += rrf_contribution(RRF_K, rank + 1);
        candidate.fused_score += f64::from(candidate.lexical_score) * LEXICAL_SCORE_WEIGHT;
    }

    if !phrase.is_empty() {
        for candidate in candidates.iter_mut() {
            if normalize_phrase(&candidate.stored.chunk.text).contains(&phrase) {
                candidate.fused_score += EXACT_PHRASE_BONUS;
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.dense_score.partial_cmp(&a.dense_score).unwrap_or(Ordering::Equal))
            .then_with(|| a.stored.chunk.id.0.cmp(&b.stored.chunk.id.0))
    });

    candidates
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(idx, candidate)| SearchHit {
            chunk_id: candidate.stored.chunk.id,
            source: candidate.stored.chunk.source,
            text: candidate.stored.chunk.text,
            dense_score: candidate.dense_score,
            lexical_score: candidate.lexical_score,
            fused_score: candidate.fused_score,
            rank: idx + 1,
        })
        .collect()
}

fn rrf_contribution(k: f64, rank: usize) -> f64 {
    1.0 / (k + rank as f64)
}

fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

fn keyword_overlap(tokens: &[String], text: &str) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let words: HashSet<String> = tokenize(text).collect();
    let hits = tokens.iter().filter(|token| words.contains(*token)).count();
    hits as f32 / tokens.len() as f32
}

fn normalize_phrase(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::rank_chunks;
    use crate::domain::chunk::{DocumentChunk, StoredChunk};
    use crate::embedding::HashingEmbedder;

    fn stored(embedder: &HashingEmbedder, position: u32, text: &str) -> StoredChunk {
        StoredChunk {
            chunk: DocumentChunk::new("hr.txt", position, text).expect("chunk"),
            embedding: embedder.embed_text(text),
            model: "feature-hash-v1".to_string(),
        }
    }

    fn corpus(embedder: &HashingEmbedder) -> Vec<StoredChunk> {
        vec![
            stored(embedder, 0, "Employees accrue 1.5 days of annual leave per month of service."),
            stored(embedder, 1, "Expense claims must be submitted within 30 days with receipts."),
            stored(embedder, 2, "Remote work requires manager approval and a secure connection."),
        ]
    }

    #[test]
    fn verbatim_query_returns_the_containing_chunk_first() {
        let embedder = HashingEmbedder::new("feature-hash-v1", 128);
        let query = "submitted within 30 days";
        let hits = rank_chunks(query, &embedder.embed_text(query), corpus(&embedder), 3);

        assert_eq!(hits.len(), 3);
        assert!(hits[0].text.contains(query));
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[0].chunk_id.0, "hr.txt#1");
    }

    #[test]
    fn topical_query_prefers_overlapping_vocabulary() {
        let embedder = HashingEmbedder::new("feature-hash-v1", 128);
        let query = "how much annual leave do employees get";
        let hits = rank_chunks(query, &embedder.embed_text(query), corpus(&embedder), 1);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id.0, "hr.txt#0");
        assert!(hits[0].lexical_score > 0.0);
    }

    #[test]
    fn results_are_truncated_to_k_and_ranked_in_order() {
        let embedder = HashingEmbedder::new("feature-hash-v1", 128);
        let query = "manager approval";
        let hits = rank_chunks(query, &embedder.embed_text(query), corpus(&embedder), 2);

        assert_eq!(hits.len(), 2);
        assert!(hits[0].fused_score >= hits[1].fused_score);
        assert_eq!(hits.iter().map(|hit| hit.rank).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn blank_query_or_empty_store_returns_nothing() {
        let embedder = HashingEmbedder::new("feature-hash-v1", 128);
        assert!(rank_chunks("  ", &embedder.embed_text(""), corpus(&embedder), 3).is_empty());
        assert!(rank_chunks("leave", &embedder.embed_text("leave"), Vec::new(), 3).is_empty());
    }
}
