//! Load → chunk → embed → index, installed as one atomic unit.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use docqa_llm::provider::ensure_batch_len;
use docqa_llm::{EmbeddingProvider, RetryPolicy};
use docqa_memory::document::{
    DocumentLoader, DocumentSource, PdfLoader, SplitterConfig, TextLoader, TextSplitter,
};
use docqa_memory::{Chunk, DistanceMetric, DocumentError, InMemoryIndex, IndexEntry};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::collection::{Collection, CollectionHandle, CollectionManager, IngestGuard};
use crate::error::RagError;

/// Stage reported while an ingestion runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestProgress {
    Loading,
    Chunking,
    Embedding { done: usize, total: usize },
    Indexing,
    Ready,
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub splitter: SplitterConfig,
    pub metric: DistanceMetric,
    pub embed_batch_size: usize,
    /// Upload cap in bytes; `u64::MAX` leaves the size unchecked.
    pub max_file_size: u64,
    pub temp_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            metric: DistanceMetric::default(),
            embed_batch_size: 64,
            max_file_size: u64::MAX,
            temp_dir: None,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct IngestionPipeline<P> {
    provider: Arc<P>,
    splitter: TextSplitter,
    metric: DistanceMetric,
    batch_size: usize,
    retry: RetryPolicy,
    pdf: PdfLoader,
    text: TextLoader,
}

impl<P: EmbeddingProvider> IngestionPipeline<P> {
    /// # Errors
    ///
    /// Returns [`RagError::Config`] for invalid chunking parameters or a zero batch size.
    pub fn new(provider: Arc<P>, settings: IngestSettings) -> Result<Self, RagError> {
        if settings.embed_batch_size == 0 {
            return Err(RagError::Config(
                "embed_batch_size must be greater than 0".into(),
            ));
        }
        Ok(Self {
            provider,
            splitter: TextSplitter::new(settings.splitter)?,
            metric: settings.metric,
            batch_size: settings.embed_batch_size,
            retry: settings.retry,
            pdf: PdfLoader {
                max_file_size: settings.max_file_size,
                temp_dir: settings.temp_dir,
            },
            text: TextLoader {
                max_file_size: settings.max_file_size,
            },
        })
    }

    /// Build a collection from `source` and make it the active one.
    ///
    /// On any failure the previously active collection (or none) stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestInProgress`] if another ingestion is running for the same
    /// manager, [`RagError::Cancelled`] if `cancel` fires, or the first load, embedding or
    /// indexing error.
    pub async fn ingest(
        &self,
        collections: &CollectionManager,
        source: DocumentSource,
        cancel: &CancellationToken,
        progress: &watch::Sender<IngestProgress>,
    ) -> Result<CollectionHandle, RagError> {
        let guard = collections.try_begin_ingest()?;
        self.ingest_guarded(guard, collections, source, cancel, progress)
            .await
    }

    pub(crate) async fn ingest_guarded(
        &self,
        _guard: IngestGuard,
        collections: &CollectionManager,
        source: DocumentSource,
        cancel: &CancellationToken,
        progress: &watch::Sender<IngestProgress>,
    ) -> Result<CollectionHandle, RagError> {
        let name = source.name();
        match self.build(source, cancel, progress).await {
            Ok(collection) => {
                let handle = Arc::new(collection);
                collections.install(Arc::clone(&handle)).await;
                progress.send_replace(IngestProgress::Ready);
                Ok(handle)
            }
            Err(e) => {
                tracing::warn!(source = %name, "ingestion failed, keeping previous collection: {e}");
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        source: DocumentSource,
        cancel: &CancellationToken,
        progress: &watch::Sender<IngestProgress>,
    ) -> Result<Collection, RagError> {
        progress.send_replace(IngestProgress::Loading);
        let loader = self.loader_for(&source)?;
        let document = cancellable(cancel, async { Ok(loader.load(source).await?) }).await?;
        tracing::info!(
            source = %document.source,
            pages = document.pages.len(),
            "document loaded"
        );

        progress.send_replace(IngestProgress::Chunking);
        let chunks = self.splitter.split(&document);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument {
                source_name: document.source,
            });
        }
        tracing::info!(chunks = chunks.len(), "document chunked");

        let vectors = self.embed_chunks(&chunks, cancel, progress).await?;

        progress.send_replace(IngestProgress::Indexing);
        let mut index = InMemoryIndex::new(self.metric);
        index.add(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry {
                    vector,
                    text: chunk.text,
                    metadata: chunk.metadata,
                })
                .collect(),
        )?;

        Ok(Collection::new(
            document.source,
            document.id,
            document.pages.len(),
            self.provider.embedding_model().to_owned(),
            index,
        ))
    }

    async fn embed_chunks(
        &self,
        chunks: &[Chunk],
        cancel: &CancellationToken,
        progress: &watch::Sender<IngestProgress>,
    ) -> Result<Vec<Vec<f32>>, RagError> {
        let total = chunks.len();
        let mut vectors = Vec::with_capacity(total);
        progress.send_replace(IngestProgress::Embedding { done: 0, total });

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = cancellable(cancel, async {
                let embedded = self
                    .retry
                    .run("embedding", || self.provider.embed(&texts))
                    .await
                    .map_err(RagError::Embedding)?;
                ensure_batch_len(texts.len(), &embedded).map_err(RagError::Embedding)?;
                Ok(embedded)
            })
            .await?;

            vectors.extend(embedded);
            tracing::debug!(done = vectors.len(), total, "embedded batch");
            progress.send_replace(IngestProgress::Embedding {
                done: vectors.len(),
                total,
            });
        }
        Ok(vectors)
    }

    fn loader_for(&self, source: &DocumentSource) -> Result<&dyn DocumentLoader, RagError> {
        match source.extension().as_deref() {
            None | Some("pdf") => Ok(&self.pdf),
            Some(ext) if self.text.supported_extensions().contains(&ext) => Ok(&self.text),
            Some(ext) => Err(DocumentError::UnsupportedFormat(ext.to_owned()).into()),
        }
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, RagError>>,
) -> Result<T, RagError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RagError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use docqa_llm::mock::MockProvider;

    use super::*;

    fn pipeline(mock: MockProvider, chunk_size: usize, batch: usize) -> IngestionPipeline<MockProvider> {
        IngestionPipeline::new(
            Arc::new(mock),
            IngestSettings {
                splitter: SplitterConfig {
                    chunk_size,
                    chunk_overlap: 2,
                },
                embed_batch_size: batch,
                ..IngestSettings::default()
            },
        )
        .unwrap()
    }

    fn text_source(body: &str) -> DocumentSource {
        DocumentSource::from_bytes("handbook.txt", body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn ingest_installs_collection() {
        let collections = CollectionManager::new();
        let (tx, rx) = watch::channel(IngestProgress::Loading);
        let handle = pipeline(MockProvider::default(), 20, 4)
            .ingest(
                &collections,
                text_source(&"word ".repeat(40)),
                &CancellationToken::new(),
                &tx,
            )
            .await
            .unwrap();

        assert_eq!(handle.source, "handbook.txt");
        assert_eq!(handle.page_count, 1);
        assert_eq!(handle.chunk_count, handle.index().len());
        assert_eq!(handle.embedding_model, "mock-embedding");
        assert_eq!(*rx.borrow(), IngestProgress::Ready);
        assert_eq!(collections.active().await.unwrap().id, handle.id);
    }

    #[tokio::test]
    async fn batches_are_sized() {
        let mock = MockProvider::default();
        let p = pipeline(mock.clone(), 10, 3);
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        // 10-char windows starting every 8 chars over 82 chars: 11 chunks, 4 batches
        let handle = p
            .ingest(&collections, text_source(&"x".repeat(82)), &CancellationToken::new(), &tx)
            .await
            .unwrap();
        assert_eq!(handle.chunk_count, 11);
        assert_eq!(mock.embed_calls(), 4);
    }

    #[tokio::test]
    async fn empty_document_rejected() {
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        let err = pipeline(MockProvider::default(), 10, 4)
            .ingest(&collections, text_source("\x0c\x0c"), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument { .. }));
        assert!(collections.active().await.is_none());
    }

    #[tokio::test]
    async fn unsupported_extension_rejected() {
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        let err = pipeline(MockProvider::default(), 10, 4)
            .ingest(
                &collections,
                DocumentSource::from_bytes("sheet.xlsx", vec![1, 2]),
                &CancellationToken::new(),
                &tx,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::Document(DocumentError::UnsupportedFormat(ref ext)) if ext == "xlsx"
        ));
    }

    #[tokio::test]
    async fn embedding_failure_keeps_previous_collection() {
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        let first = pipeline(MockProvider::default(), 10, 1)
            .ingest(&collections, text_source("first document"), &CancellationToken::new(), &tx)
            .await
            .unwrap();

        let failing = MockProvider::default().failing_embed_on_call(2);
        let err = pipeline(failing, 10, 1)
            .ingest(&collections, text_source(&"y".repeat(50)), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(collections.active().await.unwrap().id, first.id);
        assert!(!collections.is_ingesting());
    }

    #[tokio::test]
    async fn cancelled_before_start_installs_nothing() {
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pipeline(MockProvider::default(), 10, 1)
            .ingest(&collections, text_source("some text here"), &cancel, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Cancelled));
        assert!(collections.active().await.is_none());
    }

    #[tokio::test]
    async fn default_settings_impose_no_size_cap() {
        assert_eq!(IngestSettings::default().max_file_size, u64::MAX);
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        let handle = IngestionPipeline::new(Arc::new(MockProvider::default()), IngestSettings::default())
            .unwrap()
            .ingest(
                &collections,
                text_source(&"large ".repeat(20_000)),
                &CancellationToken::new(),
                &tx,
            )
            .await
            .unwrap();
        assert_eq!(handle.page_count, 1);
    }

    #[tokio::test]
    async fn configured_size_cap_is_enforced() {
        let collections = CollectionManager::new();
        let (tx, _rx) = watch::channel(IngestProgress::Loading);
        let err = IngestionPipeline::new(
            Arc::new(MockProvider::default()),
            IngestSettings {
                max_file_size: 16,
                ..IngestSettings::default()
            },
        )
        .unwrap()
        .ingest(&collections, text_source(&"x".repeat(17)), &CancellationToken::new(), &tx)
        .await
        .unwrap_err();
        assert!(matches!(err, RagError::Document(DocumentError::FileTooLarge(17))));
    }

    #[tokio::test]
    async fn zero_batch_size_is_config_error() {
        let result = IngestionPipeline::new(
            Arc::new(MockProvider::default()),
            IngestSettings {
                embed_batch_size: 0,
                ..IngestSettings::default()
            },
        );
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[tokio::test]
    async fn progress_reports_embedding_counts() {
        let collections = CollectionManager::new();
        let (tx, mut rx) = watch::channel(IngestProgress::Loading);
        let p = pipeline(MockProvider::default(), 10, 2);
        let cancel = CancellationToken::new();
        let ingest = p.ingest(&collections, text_source(&"z".repeat(26)), &cancel, &tx);
        let observed = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                seen.push(state);
                if state == IngestProgress::Ready {
                    break;
                }
            }
            seen
        });
        ingest.await.unwrap();
        drop(tx);
        let seen = observed.await.unwrap();
        assert_eq!(seen.last(), Some(&IngestProgress::Ready));
    }
}
