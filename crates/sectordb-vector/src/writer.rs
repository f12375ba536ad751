use anyhow::{Result, anyhow};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use sectordb_core::traits::Embedder;
use sectordb_core::types::TextChunk;

use crate::schema::{build_arrow_schema, CHUNKS_TABLE};
use crate::table::{open_db, table_exists};

const EMBED_BATCH: usize = 64;

/// Builds a knowledge base directory from chunks. Any previous content of
/// `<root>/<name>` is replaced.
pub struct ChunkWriter { db: Connection, path: PathBuf, embedder: Arc<dyn Embedder>, show_progress: bool }

impl ChunkWriter {
	pub async fn create(root: &Path, name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
		let path = root.join(name);
		if path.exists() { std::fs::remove_dir_all(&path)?; }
		std::fs::create_dir_all(&path)?;
		let db = open_db(&path.to_string_lossy()).await?;
		Ok(Self { db, path, embedder, show_progress: false })
	}

	pub fn with_progress(mut self, show: bool) -> Self { self.show_progress = show; self }

	/// Embed and append `chunks` in order; returns the number written.
	pub async fn write(&self, chunks: &[TextChunk]) -> Result<usize> {
		if chunks.is_empty() { info!(path = %self.path.display(), "no chunks to write"); return Ok(0); }
		let pb = if self.show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
		let mut written = 0usize;
		for batch in chunks.chunks(EMBED_BATCH) {
			let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
			let vectors = self.embedder.embed_batch(&texts)?;
			if vectors.len() != batch.len() { return Err(anyhow!("embedder returned {} vectors for {} chunks", vectors.len(), batch.len())); }
			self.insert_batch(batch, vectors).await?;
			written += batch.len(); pb.set_position(written as u64);
		}
		pb.finish_with_message("✅ knowledge base written");
		info!(path = %self.path.display(), chunks = written, "📊 knowledge base written");
		Ok(written)
	}

	async fn insert_batch(&self, chunks: &[TextChunk], vectors: Vec<Vec<f32>>) -> Result<()> {
		let record_batch = self.to_record_batch(chunks, vectors)?; let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists(&self.db, CHUNKS_TABLE).await? {
			self.db.open_table(CHUNKS_TABLE).execute().await?.add(reader).execute().await?;
		} else {
			self.db.create_table(CHUNKS_TABLE, reader).execute().await?;
		}
		Ok(())
	}

	fn to_record_batch(&self, chunks: &[TextChunk], vectors: Vec<Vec<f32>>) -> Result<RecordBatch> {
		let dim = i32::try_from(self.embedder.dim())?;
		let schema = build_arrow_schema(dim);
		let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
		let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
		let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
		for v in &vectors { if v.len() != self.embedder.dim() { return Err(anyhow!("vector width {} != embedder dim {}", v.len(), self.embedder.dim())); } }
		let vectors = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(sources)),
			Arc::new(StringArray::from(contents)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
		])?;
		Ok(record_batch)
	}
}
