use std::sync::Arc;

use anyhow::Result;

use sectordb_core::error::Error;
use sectordb_core::traits::Embedder;

/// Embed one query on the blocking pool; model inference stays off the
/// async workers.
pub async fn embed_query(embedder: &Arc<dyn Embedder>, query: &str) -> Result<Vec<f32>> {
    let embedder = Arc::clone(embedder);
    let text = query.to_string();
    let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&[text]))
        .await
        .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))?
        .map_err(|e| Error::Embedding(e.to_string()))?;
    let vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("embedder returned no vector for query".into()))?;
    Ok(vector)
}
