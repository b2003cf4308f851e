#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given expression for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::OpenAi($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

/// Runtime-selected backend, dispatching both capabilities to the wrapped adapter.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl AnyProvider {
    /// Probe the backend. Only Ollama exposes a cheap liveness endpoint; other
    /// backends report healthy.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        match self {
            Self::Ollama(p) => p.health_check().await,
            Self::OpenAi(_) => Ok(()),
            #[cfg(feature = "mock")]
            Self::Mock(_) => Ok(()),
        }
    }
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        delegate_provider!(self, |p| p.chat(messages).await)
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| LlmProvider::name(p))
    }
}

impl EmbeddingProvider for AnyProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        delegate_provider!(self, |p| p.embed(texts).await)
    }

    fn embedding_model(&self) -> &str {
        delegate_provider!(self, |p| p.embedding_model())
    }
}
