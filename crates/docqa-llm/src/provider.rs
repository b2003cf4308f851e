use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text generation capability.
pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    fn name(&self) -> &str;
}

/// Text embedding capability.
///
/// Implementations are stateless between calls: one vector per input, order preserved,
/// constant dimensionality for a given model.
pub trait EmbeddingProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the provider fails or returns a malformed batch.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// Identifier of the embedding model, recorded alongside indexed collections.
    fn embedding_model(&self) -> &str;
}

/// Check that a provider answered with exactly one vector per input.
///
/// # Errors
///
/// Returns `LlmError::EmbeddingCountMismatch` when the counts differ.
pub fn ensure_batch_len(expected: usize, vectors: &[Vec<f32>]) -> Result<(), LlmError> {
    if vectors.len() == expected {
        Ok(())
    } else {
        Err(LlmError::EmbeddingCountMismatch {
            expected,
            actual: vectors.len(),
        })
    }
}
