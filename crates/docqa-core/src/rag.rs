//! Session-facing facade over ingestion and querying.

use std::sync::Arc;

use docqa_llm::{EmbeddingProvider, LlmProvider, RetryPolicy};
use docqa_memory::document::DocumentSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collection::CollectionHandle;
use crate::config::Config;
use crate::engine::{Answer, QueryEngine};
use crate::error::RagError;
use crate::ingest::{IngestProgress, IngestSettings, IngestionPipeline};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub ingest: IngestSettings,
    pub top_k: usize,
    pub generation_retry: RetryPolicy,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            ingest: IngestSettings::default(),
            top_k: 4,
            generation_retry: RetryPolicy::default(),
        }
    }
}

impl RagSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ingest: IngestSettings {
                splitter: config.splitter(),
                metric: config.retrieval.metric,
                embed_batch_size: config.retrieval.embed_batch_size,
                max_file_size: config.loader.max_file_size,
                temp_dir: config.loader.temp_dir.clone(),
                retry: config.embedding_retry(),
            },
            top_k: config.retrieval.top_k,
            generation_retry: config.generation_retry(),
        }
    }
}

/// A running background ingestion.
#[derive(Debug)]
pub struct IngestTask {
    handle: JoinHandle<Result<CollectionHandle, RagError>>,
    cancel: CancellationToken,
    progress: watch::Receiver<IngestProgress>,
}

impl IngestTask {
    /// Request cancellation. The active collection is left as it was.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn progress(&self) -> watch::Receiver<IngestProgress> {
        self.progress.clone()
    }

    /// Wait for the ingestion to finish.
    ///
    /// # Errors
    ///
    /// Returns the ingestion error, or [`RagError::Cancelled`] if the task was aborted.
    ///
    /// # Panics
    ///
    /// Resumes the panic if the ingestion task panicked.
    pub async fn join(self) -> Result<CollectionHandle, RagError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(RagError::Cancelled),
        }
    }
}

pub struct DocQa<P> {
    pipeline: Arc<IngestionPipeline<P>>,
    engine: QueryEngine<P>,
    top_k: usize,
}

impl<P> DocQa<P>
where
    P: LlmProvider + EmbeddingProvider + 'static,
{
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the settings are unusable.
    pub fn new(provider: P, settings: RagSettings) -> Result<Self, RagError> {
        let provider = Arc::new(provider);
        let embedding_retry = settings.ingest.retry;
        Ok(Self {
            pipeline: Arc::new(IngestionPipeline::new(
                Arc::clone(&provider),
                settings.ingest,
            )?),
            engine: QueryEngine::new(provider, embedding_retry, settings.generation_retry),
            top_k: settings.top_k,
        })
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ingest `source` into `session`, replacing its collection on success.
    ///
    /// # Errors
    ///
    /// See [`IngestionPipeline::ingest`].
    pub async fn ingest(
        &self,
        session: &Session,
        source: DocumentSource,
    ) -> Result<CollectionHandle, RagError> {
        let (progress, _) = watch::channel(IngestProgress::Loading);
        self.ingest_with(session, source, &CancellationToken::new(), &progress)
            .await
    }

    /// [`ingest`](Self::ingest) with caller-owned cancellation and progress reporting.
    ///
    /// # Errors
    ///
    /// See [`IngestionPipeline::ingest`].
    pub async fn ingest_with(
        &self,
        session: &Session,
        source: DocumentSource,
        cancel: &CancellationToken,
        progress: &watch::Sender<IngestProgress>,
    ) -> Result<CollectionHandle, RagError> {
        self.pipeline
            .ingest(session.collections(), source, cancel, progress)
            .await
    }

    /// Run the ingestion on the runtime and return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestInProgress`] if the session is already ingesting.
    pub fn spawn_ingest(
        &self,
        session: &Session,
        source: DocumentSource,
    ) -> Result<IngestTask, RagError> {
        let collections = Arc::clone(session.collections());
        let guard = collections.try_begin_ingest()?;
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = CancellationToken::new();
        let (tx, progress) = watch::channel(IngestProgress::Loading);

        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            pipeline
                .ingest_guarded(guard, &collections, source, &token, &tx)
                .await
        });

        Ok(IngestTask {
            handle,
            cancel,
            progress,
        })
    }

    /// Answer from the session's active collection with the configured `top_k`.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::answer`].
    pub async fn answer(&self, session: &Session, question: &str) -> Result<Answer, RagError> {
        self.answer_top_k(session, question, self.top_k).await
    }

    /// # Errors
    ///
    /// See [`QueryEngine::answer`].
    pub async fn answer_top_k(
        &self,
        session: &Session,
        question: &str,
        k: usize,
    ) -> Result<Answer, RagError> {
        let collection = session.active().await;
        self.engine
            .answer(collection.as_deref(), question, session.persona.prompt(), k)
            .await
    }

    /// [`answer`](Self::answer), recording the exchange in the session history on success.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::answer`]. History is untouched on error.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<Answer, RagError> {
        let answer = self.answer(session, question).await?;
        session.push_exchange(question, answer.answer.clone());
        Ok(answer)
    }

    pub async fn reset(&self, session: &Session) {
        session.collections().reset().await;
    }
}
