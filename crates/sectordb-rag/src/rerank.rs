use std::sync::Arc;

use tracing::warn;

use sectordb_core::traits::Reranker;
use sectordb_core::types::{ScoredChunk, TextChunk};

/// Score every candidate against `query`, order by descending score and keep
/// the best `keep`. The sort is stable, so equal scores keep retrieval order.
///
/// A scoring failure leaves the retrieval order untouched (scores of 0).
pub fn rerank(reranker: &dyn Reranker, query: &str, candidates: Vec<TextChunk>, keep: usize) -> Vec<ScoredChunk> {
    let mut scores = Vec::with_capacity(candidates.len());
    for chunk in &candidates {
        match reranker.score(query, &chunk.content) {
            Ok(s) if s.is_nan() => scores.push(f32::NEG_INFINITY),
            Ok(s) => scores.push(s),
            Err(e) => {
                warn!(error = %e, candidates = candidates.len(), "reranking failed; keeping retrieval order");
                return candidates.into_iter().take(keep).map(|chunk| ScoredChunk { chunk, score: 0.0 }).collect();
            }
        }
    }
    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .zip(scores)
        .map(|(chunk, score)| ScoredChunk { chunk, score })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(keep);
    scored
}

/// `rerank` on the blocking pool so cross-encoder passes stay off the async
/// workers. A crashed scoring task keeps retrieval order.
pub async fn rerank_blocking(reranker: &Arc<dyn Reranker>, query: &str, candidates: Vec<TextChunk>, keep: usize) -> Vec<ScoredChunk> {
    let reranker = Arc::clone(reranker);
    let query = query.to_string();
    let fallback: Vec<ScoredChunk> = candidates.iter().take(keep).cloned().map(|chunk| ScoredChunk { chunk, score: 0.0 }).collect();
    match tokio::task::spawn_blocking(move || rerank(reranker.as_ref(), &query, candidates, keep)).await {
        Ok(ranked) => ranked,
        Err(e) => {
            warn!(error = %e, "reranking task failed; keeping retrieval order");
            fallback
        }
    }
}

/// Chunk texts joined by newlines, in ranked order.
pub fn join_context(ranked: &[ScoredChunk]) -> String {
    ranked.iter().map(|s| s.chunk.content.as_str()).collect::<Vec<_>>().join("\n")
}
