//! In-memory exact nearest-neighbour index.
//!
//! Used for merged sector views: the rows of the default knowledge base and a
//! sector knowledge base are materialized once at startup and concatenated
//! (default first, no de-duplication). Search is a flat squared-L2 scan, the
//! same metric LanceDB uses by default, so a merged view ranks rows exactly as
//! the on-disk indices would.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use sectordb_core::traits::{ChunkSource, Embedder};
use sectordb_core::types::TextChunk;

use crate::query::embed_query;
use crate::table::IndexedChunk;

pub struct MemoryIndex {
    name: String,
    rows: Vec<IndexedChunk>,
    embedder: Arc<dyn Embedder>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>, rows: Vec<IndexedChunk>, embedder: Arc<dyn Embedder>) -> Self {
        Self { name: name.into(), rows, embedder }
    }

    /// `first` followed by `second`, in their stored order.
    pub fn concat(name: impl Into<String>, first: &[IndexedChunk], second: &[IndexedChunk], embedder: Arc<dyn Embedder>) -> Self {
        let rows = first.iter().chain(second.iter()).cloned().collect();
        Self::new(name, rows, embedder)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TextChunk> {
        self.rows.iter().map(|r| &r.chunk)
    }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Nearest `k` rows to `query_vec`; ties keep stored order.
    pub fn search_vec(&self, query_vec: &[f32], k: usize) -> Vec<TextChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, squared_l2(query_vec, &row.vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.into_iter().take(k).map(|(i, _)| self.rows[i].chunk.clone()).collect()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return f32::INFINITY; }
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl ChunkSource for MemoryIndex {
    fn name(&self) -> &str { &self.name }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<TextChunk>> {
        if k == 0 || self.is_empty() { return Ok(vec![]); }
        let query_vec = embed_query(&self.embedder, query).await?;
        Ok(self.search_vec(&query_vec, k))
    }
}
