//! LanceDB connection helpers and Arrow row decoding.
use anyhow::{Result, anyhow};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::arrow::SendableRecordBatchStream;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};

use sectordb_core::types::TextChunk;

/// A stored chunk together with the embedding it was indexed under.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub chunk: TextChunk,
    pub vector: Vec<f32>,
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("column '{}' missing or not utf8", name))
}

fn vector_column<'a>(batch: &'a RecordBatch) -> Result<&'a FixedSizeListArray> {
    batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| anyhow!("column 'vector' missing or not a fixed-size list"))
}

pub fn batch_to_chunks(batch: &RecordBatch) -> Result<Vec<TextChunk>> {
    let ids = string_column(batch, "id")?;
    let sources = string_column(batch, "source")?;
    let contents = string_column(batch, "content")?;
    Ok((0..batch.num_rows())
        .map(|i| TextChunk::new(ids.value(i), sources.value(i), contents.value(i)))
        .collect())
}

pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<IndexedChunk>> {
    let chunks = batch_to_chunks(batch)?;
    let vectors = vector_column(batch)?;
    let mut rows = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.into_iter().enumerate() {
        if vectors.is_null(i) {
            return Err(anyhow!("chunk '{}' has no vector", chunk.id));
        }
        let values = vectors.value(i);
        let vector = values
            .as_primitive_opt::<Float32Type>()
            .ok_or_else(|| anyhow!("vector of chunk '{}' is not float32", chunk.id))?
            .values()
            .to_vec();
        rows.push(IndexedChunk { chunk, vector });
    }
    Ok(rows)
}

pub async fn collect_chunks(mut stream: SendableRecordBatchStream) -> Result<Vec<TextChunk>> {
    let mut out = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        out.extend(batch_to_chunks(&batch)?);
    }
    Ok(out)
}

pub async fn collect_rows(mut stream: SendableRecordBatchStream) -> Result<Vec<IndexedChunk>> {
    let mut out = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        out.extend(batch_to_rows(&batch)?);
    }
    Ok(out)
}
