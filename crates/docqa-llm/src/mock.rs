//! Test-only mock provider.
//!
//! Embeddings are a deterministic hashed bag-of-words, so texts sharing words land
//! near each other under cosine similarity without any model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, LlmProvider, Message, Role};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    /// Answer with the content of the last user message.
    pub echo: bool,
    pub fail_chat: bool,
    /// 1-based embed call number that fails with `LlmError::Other`.
    pub fail_embed_on_call: Option<usize>,
    pub dimension: usize,
    /// Milliseconds to sleep before answering a chat or embed call.
    pub delay_ms: u64,
    embed_calls: Arc<AtomicUsize>,
    chat_calls: Arc<AtomicUsize>,
    last_messages: Arc<Mutex<Vec<Message>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            echo: false,
            fail_chat: false,
            fail_embed_on_call: None,
            dimension: 64,
            delay_ms: 0,
            embed_calls: Arc::new(AtomicUsize::new(0)),
            chat_calls: Arc::new(AtomicUsize::new(0)),
            last_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn failing_embed_on_call(mut self, call: usize) -> Self {
        self.fail_embed_on_call = Some(call);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    /// Messages passed to the most recent `chat` call.
    #[must_use]
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages.lock().unwrap().clone()
    }

    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let digest = blake3::hash(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest.as_bytes()[..8]);
            #[allow(clippy::cast_possible_truncation)]
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            vector[idx] += 1.0;
        }
        vector
    }

    async fn maybe_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        self.maybe_delay().await;

        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        if self.echo {
            return Ok(messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default());
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

impl EmbeddingProvider for MockProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.maybe_delay().await;

        if self.fail_embed_on_call == Some(call) {
            return Err(LlmError::Other(format!("mock embed failure on call {call}")));
        }
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn embedding_model(&self) -> &str {
        "mock-embedding"
    }
}
