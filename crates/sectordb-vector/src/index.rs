//! Persisted knowledge base backed by a LanceDB table.
//!
//! A knowledge base named `n` lives in `<root>/<n>/` and holds the
//! `chunks` table written by `ChunkWriter`. It is opened once at startup and
//! only read afterwards.

use anyhow::Result;
use async_trait::async_trait;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use sectordb_core::error::Error;
use sectordb_core::traits::{ChunkSource, Embedder};
use sectordb_core::types::TextChunk;

use crate::query::embed_query;
use crate::schema::{vector_dim, CHUNKS_TABLE};
use crate::table::{collect_chunks, collect_rows, open_db, table_exists, IndexedChunk};

pub struct VectorIndex {
    name: String,
    table: Table,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    /// Open knowledge base `name` under `root`.
    ///
    /// Fails with `Error::IndexLoad` when the directory or table is missing,
    /// unreadable, or was built with vectors of a different width than
    /// `embedder` produces.
    pub async fn load(root: &Path, name: &str, embedder: Arc<dyn Embedder>) -> sectordb_core::error::Result<Self> {
        let path = root.join(name);
        if !path.is_dir() {
            return Err(Error::index_load(name, format!("path not found: {}", path.display())));
        }
        let conn = open_db(&path.to_string_lossy()).await.map_err(|e| Error::index_load(name, e))?;
        if !table_exists(&conn, CHUNKS_TABLE).await.map_err(|e| Error::index_load(name, e))? {
            return Err(Error::index_load(name, format!("no '{}' table in {}", CHUNKS_TABLE, path.display())));
        }
        let table = conn.open_table(CHUNKS_TABLE).execute().await.map_err(|e| Error::index_load(name, e))?;
        let schema = table.schema().await.map_err(|e| Error::index_load(name, e))?;
        match vector_dim(&schema) {
            Some(dim) if dim == embedder.dim() => {}
            Some(dim) => {
                return Err(Error::index_load(name, format!("stored vectors have width {} but the embedder produces {}", dim, embedder.dim())));
            }
            None => return Err(Error::index_load(name, "table has no fixed-size 'vector' column")),
        }
        info!(index = name, "📂 knowledge base opened");
        Ok(Self { name: name.to_string(), table, embedder })
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    /// Every stored row in storage order, vectors included.
    ///
    /// Used once at startup to build merged views; not a request-path call.
    pub async fn documents(&self) -> Result<Vec<IndexedChunk>> {
        let n = self.count().await?;
        if n == 0 { return Ok(vec![]); }
        let stream = self.table.query().limit(n).execute().await?;
        let rows = collect_rows(stream).await?;
        debug!(index = %self.name, rows = rows.len(), "materialized documents");
        Ok(rows)
    }
}

#[async_trait]
impl ChunkSource for VectorIndex {
    fn name(&self) -> &str { &self.name }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<TextChunk>> {
        if k == 0 { return Ok(vec![]); }
        let query_vec = embed_query(&self.embedder, query).await?;
        let stream = self.table.vector_search(query_vec)?.limit(k).execute().await?;
        let hits = collect_chunks(stream).await?;
        debug!(index = %self.name, k, hits = hits.len(), "similarity search");
        Ok(hits)
    }
}
