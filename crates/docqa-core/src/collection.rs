//! The per-session active collection and its single-writer ingest guard.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use docqa_memory::InMemoryIndex;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::RagError;

/// A fully built, immutable index over one ingested document.
#[derive(Debug)]
pub struct Collection {
    pub id: Uuid,
    pub source: String,
    /// BLAKE3 digest of the source bytes.
    pub document_id: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub created_at: DateTime<Utc>,
    index: InMemoryIndex,
}

impl Collection {
    #[must_use]
    pub fn new(
        source: String,
        document_id: String,
        page_count: usize,
        embedding_model: String,
        index: InMemoryIndex,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            document_id,
            page_count,
            chunk_count: index.len(),
            embedding_model,
            created_at: Utc::now(),
            index,
        }
    }

    #[must_use]
    pub fn index(&self) -> &InMemoryIndex {
        &self.index
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

pub type CollectionHandle = Arc<Collection>;

/// Held for the duration of one ingestion; dropping it admits the next.
#[derive(Debug)]
pub struct IngestGuard {
    _permit: OwnedMutexGuard<()>,
}

/// Owns at most one active collection.
///
/// Readers take a snapshot `Arc`; installing a new collection swaps the pointer, so a
/// query never observes a half-built index.
#[derive(Debug, Default)]
pub struct CollectionManager {
    active: RwLock<Option<CollectionHandle>>,
    ingest: Arc<Mutex<()>>,
}

impl CollectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn active(&self) -> Option<CollectionHandle> {
        self.active.read().await.clone()
    }

    /// Replace the active collection, returning the previous one.
    pub async fn install(&self, collection: CollectionHandle) -> Option<CollectionHandle> {
        tracing::info!(
            collection = %collection.id,
            source = %collection.source,
            chunks = collection.chunk_count,
            "collection ready"
        );
        self.active.write().await.replace(collection)
    }

    /// Drop the active collection. Memory is freed once in-flight queries release it.
    pub async fn reset(&self) {
        if let Some(previous) = self.active.write().await.take() {
            tracing::info!(collection = %previous.id, "collection dropped");
        }
    }

    /// # Errors
    ///
    /// Returns [`RagError::IngestInProgress`] while another ingestion holds the guard.
    pub fn try_begin_ingest(&self) -> Result<IngestGuard, RagError> {
        let permit = Arc::clone(&self.ingest)
            .try_lock_owned()
            .map_err(|_| RagError::IngestInProgress)?;
        Ok(IngestGuard { _permit: permit })
    }

    #[must_use]
    pub fn is_ingesting(&self) -> bool {
        self.ingest.try_lock().is_err()
    }
}
