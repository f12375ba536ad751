//! Row counts for every knowledge base the configuration names.
use std::sync::Arc;

use sectordb_core::config::Config;
use sectordb_embed::load_embedder;
use sectordb_vector::VectorIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = load_embedder(&settings.embedding)?;
    let k = &settings.knowledge;
    let mut names = vec![k.default_index.clone(), k.classification_index.clone()];
    names.extend(k.sectors.values().cloned());
    println!("knowledge root: {}", k.root_dir.display());
    for name in names {
        match VectorIndex::load(&k.root_dir, &name, Arc::clone(&embedder)).await {
            Ok(index) => println!("  {:<16} rows={}", name, index.count().await?),
            Err(e) => println!("  {:<16} unavailable: {}", name, e),
        }
    }
    Ok(())
}
