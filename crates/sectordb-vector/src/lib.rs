//! sectordb-vector
//!
//! Knowledge-base storage: LanceDB-backed `VectorIndex` for persisted bases,
//! `MemoryIndex` for merged sector views, and `ChunkWriter` to build bases.

pub mod index;
pub mod memory;
pub mod query;
pub mod schema;
pub mod table;
pub mod writer;

pub use index::VectorIndex;
pub use memory::MemoryIndex;
pub use table::IndexedChunk;
pub use writer::ChunkWriter;
