//! Named knowledge bases loaded at startup.
//!
//! The registry is built once and then shared read-only. Loading is
//! best-effort: the default base is required, every other base that fails to
//! open is logged and left out, and the affected sector falls back to the
//! default base.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use sectordb_core::config::KnowledgeSettings;
use sectordb_core::error::{Error, Result};
use sectordb_core::traits::{ChunkSource, Embedder};
use sectordb_vector::{IndexedChunk, MemoryIndex, VectorIndex};

pub struct IndexRegistry {
    default: Arc<dyn ChunkSource>,
    classification: Option<Arc<dyn ChunkSource>>,
    /// Sector tag -> default-then-sector view.
    merged: HashMap<String, Arc<dyn ChunkSource>>,
}

impl IndexRegistry {
    pub async fn load(settings: &KnowledgeSettings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let started = Instant::now();
        let root = settings.root_dir.as_path();
        let default = VectorIndex::load(root, &settings.default_index, embedder.clone()).await?;

        let classification: Option<Arc<dyn ChunkSource>> =
            match VectorIndex::load(root, &settings.classification_index, embedder.clone()).await {
                Ok(index) => Some(Arc::new(index)),
                Err(e) => {
                    error!(index = %settings.classification_index, error = %e, "classification index unavailable; companies will be classified as Agnostic");
                    None
                }
            };

        let mut sector_rows: Vec<(String, Vec<IndexedChunk>)> = Vec::new();
        for (tag, name) in &settings.sectors {
            let rows = match VectorIndex::load(root, name, embedder.clone()).await {
                Ok(index) => index.documents().await.map_err(|e| Error::index_load(name.as_str(), e)),
                Err(e) => Err(e),
            };
            match rows {
                Ok(rows) => sector_rows.push((tag.clone(), rows)),
                Err(e) => error!(sector = %tag, index = %name, error = %e, "sector index unavailable; falling back to default"),
            }
        }

        let mut merged: HashMap<String, Arc<dyn ChunkSource>> = HashMap::new();
        if !sector_rows.is_empty() {
            let base = default.documents().await.map_err(|e| Error::index_load(settings.default_index.as_str(), e))?;
            for (tag, rows) in sector_rows {
                let view = MemoryIndex::concat(tag.clone(), &base, &rows, embedder.clone());
                info!(sector = %tag, default_rows = base.len(), sector_rows = rows.len(), "🔀 merged view built");
                merged.insert(tag, Arc::new(view));
            }
        }

        info!(
            default = %settings.default_index,
            classification = classification.is_some(),
            sectors = merged.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "📚 index registry ready"
        );
        Ok(Self { default: Arc::new(default), classification, merged })
    }

    pub fn from_parts(
        default: Arc<dyn ChunkSource>,
        classification: Option<Arc<dyn ChunkSource>>,
        merged: HashMap<String, Arc<dyn ChunkSource>>,
    ) -> Self {
        Self { default, classification, merged }
    }

    pub fn classification(&self) -> Option<Arc<dyn ChunkSource>> { self.classification.clone() }

    /// Knowledge source for `sector_tag`; the default base when the tag has no view.
    pub fn merged_view(&self, sector_tag: &str) -> Arc<dyn ChunkSource> {
        match self.merged.get(sector_tag) {
            Some(view) => view.clone(),
            None => {
                if !self.merged.is_empty() && sector_tag != sectordb_core::types::AGNOSTIC {
                    warn!(sector = %sector_tag, "no merged view for sector; using default");
                }
                self.default.clone()
            }
        }
    }

    pub fn sectors(&self) -> impl Iterator<Item = &str> { self.merged.keys().map(String::as_str) }
}
