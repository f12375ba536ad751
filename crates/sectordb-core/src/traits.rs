use async_trait::async_trait;

use crate::types::TextChunk;

/// Bi-encoder used to place queries and chunks in the same vector space.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Anything that answers nearest-neighbour queries over text chunks.
///
/// Results are ordered nearest first. `k` may exceed the number of stored
/// chunks, in which case every chunk is returned.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    fn name(&self) -> &str;
    async fn similarity_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<TextChunk>>;
}

/// Cross-encoder relevance scorer. Higher is more relevant.
///
/// Must be a pure function of the pair.
pub trait Reranker: Send + Sync {
    fn score(&self, query: &str, passage: &str) -> anyhow::Result<f32>;
}

/// Opaque text-completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_instruction: &str, prompt: &str, temperature: f32) -> anyhow::Result<String>;
}
