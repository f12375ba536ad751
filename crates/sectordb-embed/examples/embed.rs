use std::path::PathBuf;

use sectordb_core::traits::{Embedder, Reranker};
use sectordb_embed::{CrossEncoderReranker, EmbeddingModel};

fn main() -> anyhow::Result<()> {
    let models = PathBuf::from(std::env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string()));
    let embedder = EmbeddingModel::load(&models.join("bge-m3"), 256)?;
    let texts = vec!["offshore oil drilling".to_string(), "road freight transport".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());

    let reranker = CrossEncoderReranker::load(&models.join("ms-marco-MiniLM-L6-v2"), 512)?;
    for text in &texts {
        println!("{:.4}  {}", reranker.score("Which companies extract crude petroleum?", text)?, text);
    }
    Ok(())
}
