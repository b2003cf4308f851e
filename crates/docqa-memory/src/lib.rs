//! Document loading, page-bounded chunking and the in-memory vector index.

pub mod document;
pub mod vector_index;

pub use document::{Chunk, ChunkMetadata, Document, DocumentError, Page};
pub use vector_index::{DistanceMetric, InMemoryIndex, IndexEntry, IndexError, SearchHit};
