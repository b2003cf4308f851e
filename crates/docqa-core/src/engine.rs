use std::collections::HashSet;
use std::sync::Arc;

use docqa_llm::provider::ensure_batch_len;
use docqa_llm::{EmbeddingProvider, LlmProvider, Message, RetryPolicy};
use docqa_memory::{ChunkMetadata, SearchHit};
use uuid::Uuid;

use crate::collection::Collection;
use crate::error::RagError;

const GROUNDING_INSTRUCTION: &str =
    "Answer the user's question based ONLY on the following context:";

/// Stands in for the context block when retrieval returned nothing.
pub const NO_CONTEXT_MARKER: &str = "[no relevant context found in the document]";

/// A retrieved passage that backs an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

impl Source {
    /// `"Page {label}"`, e.g. `Page iv` or `Page 12`.
    #[must_use]
    pub fn citation(&self) -> String {
        format!("Page {}", self.metadata.page_label)
    }
}

impl From<SearchHit> for Source {
    fn from(hit: SearchHit) -> Self {
        Self {
            text: hit.text,
            metadata: hit.metadata,
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    /// Retrieved passages in rank order, without duplicates.
    pub sources: Vec<Source>,
    pub collection_id: Uuid,
}

impl Answer {
    /// Distinct page labels of the sources, in rank order.
    #[must_use]
    pub fn source_pages(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .map(|s| s.metadata.page_label.as_str())
            .filter(|label| seen.insert(*label))
            .collect()
    }
}

/// Stateless retrieve-then-generate over a collection.
pub struct QueryEngine<P> {
    provider: Arc<P>,
    embedding_retry: RetryPolicy,
    generation_retry: RetryPolicy,
}

impl<P: LlmProvider + EmbeddingProvider> QueryEngine<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, embedding_retry: RetryPolicy, generation_retry: RetryPolicy) -> Self {
        Self {
            provider,
            embedding_retry,
            generation_retry,
        }
    }

    /// Answer `question` from the top `k` passages of `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoActiveCollection`] without contacting the generation model when
    /// `collection` is absent or empty, [`RagError::Embedding`] or [`RagError::Generation`]
    /// on provider failure, and [`RagError::DimensionMismatch`] when the question embedding
    /// disagrees with the index.
    pub async fn answer(
        &self,
        collection: Option<&Collection>,
        question: &str,
        persona_prompt: &str,
        k: usize,
    ) -> Result<Answer, RagError> {
        let collection = collection
            .filter(|c| !c.is_empty())
            .ok_or(RagError::NoActiveCollection)?;

        let sources = if k == 0 {
            Vec::new()
        } else {
            self.retrieve(collection, question, k).await?
        };
        tracing::debug!(
            collection = %collection.id,
            retrieved = sources.len(),
            k,
            "retrieval complete"
        );

        let messages = build_messages(persona_prompt, &sources, question);
        let answer = self
            .generation_retry
            .run("generation", || self.provider.chat(&messages))
            .await
            .map_err(RagError::Generation)?;

        Ok(Answer {
            answer,
            sources,
            collection_id: collection.id,
        })
    }

    async fn retrieve(
        &self,
        collection: &Collection,
        question: &str,
        k: usize,
    ) -> Result<Vec<Source>, RagError> {
        let input = [question.to_owned()];
        let mut vectors = self
            .embedding_retry
            .run("embedding", || self.provider.embed(&input))
            .await
            .map_err(RagError::Embedding)?;
        ensure_batch_len(1, &vectors).map_err(RagError::Embedding)?;
        let query = vectors.swap_remove(0);

        let hits = collection.index().query(&query, k)?;
        let mut seen = HashSet::new();
        Ok(hits
            .into_iter()
            .filter(|hit| seen.insert(hit.id))
            .map(Source::from)
            .collect())
    }
}

/// System message: persona, grounding constraint and context. User message: the question.
fn build_messages(persona_prompt: &str, sources: &[Source], question: &str) -> Vec<Message> {
    let context = if sources.is_empty() {
        NO_CONTEXT_MARKER.to_owned()
    } else {
        sources
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    vec![
        Message::system(format!(
            "{persona_prompt}\n\n{GROUNDING_INSTRUCTION}\n\n{context}"
        )),
        Message::user(question),
    ]
}

#[cfg(test)]
mod tests {
    use docqa_llm::Role;
    use docqa_llm::mock::MockProvider;
    use docqa_memory::{InMemoryIndex, IndexEntry};
    use proptest::prelude::*;

    use super::*;

    fn metadata(i: usize, label: &str) -> ChunkMetadata {
        ChunkMetadata {
            source: "handbook.pdf".into(),
            page_number: i + 1,
            page_label: label.into(),
            start_offset: 0,
            end_offset: 10,
            chunk_index: i,
        }
    }

    fn collection(mock: &MockProvider, texts: &[&str]) -> Collection {
        let mut index = InMemoryIndex::default();
        index
            .add(
                texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| IndexEntry {
                        vector: mock.embed_text(t),
                        text: (*t).to_owned(),
                        metadata: metadata(i, &(i + 1).to_string()),
                    })
                    .collect(),
            )
            .unwrap();
        Collection::new("handbook.pdf".into(), "d".into(), texts.len(), "mock".into(), index)
    }

    fn engine(mock: &MockProvider) -> QueryEngine<MockProvider> {
        QueryEngine::new(
            Arc::new(mock.clone()),
            RetryPolicy::default(),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn absent_collection_never_calls_generation() {
        let mock = MockProvider::default();
        let err = engine(&mock)
            .answer(None, "question", "persona", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NoActiveCollection));
        assert_eq!(mock.chat_calls(), 0);
        assert_eq!(mock.embed_calls(), 0);
    }

    #[tokio::test]
    async fn empty_collection_never_calls_generation() {
        let mock = MockProvider::default();
        let empty = Collection::new("x".into(), "d".into(), 0, "mock".into(), InMemoryIndex::default());
        let err = engine(&mock)
            .answer(Some(&empty), "question", "persona", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NoActiveCollection));
        assert_eq!(mock.chat_calls(), 0);
    }

    #[tokio::test]
    async fn single_chunk_is_sole_source() {
        let mock = MockProvider::echoing();
        let c = collection(&mock, &["Redundancy pay after 8 years is 14 weeks"]);
        let answer = engine(&mock)
            .answer(Some(&c), "redundancy after 8 years", "persona", 1)
            .await
            .unwrap();
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].text, "Redundancy pay after 8 years is 14 weeks");
        assert_eq!(answer.answer, "redundancy after 8 years");
        assert_eq!(answer.collection_id, c.id);
    }

    #[tokio::test]
    async fn prompt_contains_persona_constraint_and_context() {
        let mock = MockProvider::default();
        let c = collection(&mock, &["annual leave is 20 days", "parking is free"]);
        engine(&mock)
            .answer(Some(&c), "how much annual leave?", "You are terse.", 2)
            .await
            .unwrap();

        let messages = mock.last_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("You are terse.\n\n"));
        assert!(messages[0].content.contains("based ONLY on the following context"));
        assert!(messages[0].content.contains("annual leave is 20 days"));
        assert_eq!(messages[1], Message::user("how much annual leave?"));
    }

    #[tokio::test]
    async fn zero_k_sends_no_context_marker() {
        let mock = MockProvider::default();
        let c = collection(&mock, &["some passage"]);
        let answer = engine(&mock)
            .answer(Some(&c), "anything?", "persona", 0)
            .await
            .unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(mock.chat_calls(), 1);
        assert!(mock.last_messages()[0].content.contains(NO_CONTEXT_MARKER));
    }

    #[tokio::test]
    async fn k_larger_than_index_returns_all() {
        let mock = MockProvider::default().with_dimension(4096);
        let c = collection(&mock, &["one", "two", "three"]);
        let answer = engine(&mock)
            .answer(Some(&c), "two", "persona", 10)
            .await
            .unwrap();
        assert_eq!(answer.sources.len(), 3);
        assert_eq!(answer.sources[0].text, "two");
    }

    #[tokio::test]
    async fn generation_failure_is_typed() {
        let mock = MockProvider::failing();
        let c = collection(&mock, &["passage"]);
        let err = engine(&mock)
            .answer(Some(&c), "q", "persona", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }

    #[tokio::test]
    async fn embedding_failure_is_typed() {
        let mock = MockProvider::default().failing_embed_on_call(1);
        let c = collection(&mock, &["passage"]);
        let err = engine(&mock)
            .answer(Some(&c), "q", "persona", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(mock.chat_calls(), 0);
    }

    #[tokio::test]
    async fn mismatched_question_embedding_is_dimension_error() {
        let indexer = MockProvider::default().with_dimension(8);
        let c = collection(&indexer, &["passage"]);
        let mock = MockProvider::default().with_dimension(16);
        let err = engine(&mock)
            .answer(Some(&c), "q", "persona", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 8,
                actual: 16
            }
        ));
    }

    #[tokio::test]
    async fn generation_timeout_surfaces_as_error() {
        let mock = MockProvider::default().with_delay(200);
        let c = collection(&mock, &["passage"]);
        let engine = QueryEngine::new(
            Arc::new(mock.clone()),
            RetryPolicy::default(),
            RetryPolicy::new(0, std::time::Duration::ZERO, std::time::Duration::from_millis(50)),
        );
        let started = std::time::Instant::now();
        let err = engine
            .answer(Some(&c), "q", "persona", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::Generation(docqa_llm::LlmError::Timeout { .. })
        ));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn citation_and_source_pages() {
        let source = |label: &str| Source {
            text: String::new(),
            metadata: metadata(0, label),
            score: 1.0,
        };
        let answer = Answer {
            answer: String::new(),
            sources: vec![source("iv"), source("12"), source("iv")],
            collection_id: Uuid::nil(),
        };
        assert_eq!(answer.sources[0].citation(), "Page iv");
        assert_eq!(answer.source_pages(), vec!["iv", "12"]);
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn retrieval_returns_min_of_k_and_collection_size(n in 1usize..20, k in 0usize..30) {
            let mock = MockProvider::default();
            let texts: Vec<String> = (0..n).map(|i| format!("clause{i} shared wording")).collect();
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let c = collection(&mock, &refs);

            let answer = block_on(engine(&mock).answer(Some(&c), "shared clause3", "persona", k)).unwrap();
            prop_assert_eq!(answer.sources.len(), k.min(n));
            for pair in answer.sources.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            let indices: HashSet<usize> = answer.sources.iter().map(|s| s.metadata.chunk_index).collect();
            prop_assert_eq!(indices.len(), answer.sources.len());
            prop_assert_eq!(mock.chat_calls(), 1);
        }

        #[test]
        fn prompt_carries_every_source_and_the_question(
            texts in proptest::collection::vec("[a-z ]{1,40}", 0..6),
            question in "[a-z?]{1,30}",
            persona in "[A-Za-z .]{1,30}",
        ) {
            let sources: Vec<Source> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| Source { text: t.clone(), metadata: metadata(i, "1"), score: 0.0 })
                .collect();
            let messages = build_messages(&persona, &sources, &question);

            prop_assert_eq!(messages.len(), 2);
            prop_assert_eq!(messages[0].role, Role::System);
            prop_assert!(messages[0].content.starts_with(&persona));
            prop_assert!(messages[0].content.contains(GROUNDING_INSTRUCTION));
            prop_assert_eq!(messages[0].content.contains(NO_CONTEXT_MARKER), sources.is_empty());
            for source in &sources {
                prop_assert!(messages[0].content.contains(&source.text));
            }
            prop_assert_eq!(messages[1].role, Role::User);
            prop_assert_eq!(&messages[1].content, &question);
        }

        #[test]
        fn source_pages_are_distinct_in_first_seen_order(labels in proptest::collection::vec("[ivx1-9]{1,3}", 0..12)) {
            let answer = Answer {
                answer: String::new(),
                sources: labels
                    .iter()
                    .map(|l| Source { text: String::new(), metadata: metadata(0, l), score: 0.0 })
                    .collect(),
                collection_id: Uuid::nil(),
            };
            let mut expected: Vec<&str> = Vec::new();
            for label in &labels {
                if !expected.contains(&label.as_str()) {
                    expected.push(label);
                }
            }
            prop_assert_eq!(answer.source_pages(), expected);
        }
    }
}
