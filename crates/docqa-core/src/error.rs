use docqa_llm::LlmError;
use docqa_memory::{DocumentError, IndexError};

/// Failures surfaced to callers of the pipeline. Every variant is distinct so a UI can
/// render a specific message.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("failed to parse {source_name}: {reason}")]
    DocumentParse { source_name: String, reason: String },

    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),

    #[error("generation failed: {0}")]
    Generation(#[source] LlmError),

    #[error("embedding dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no document has been ingested for this session")]
    NoActiveCollection,

    #[error("an ingestion is already running for this session")]
    IngestInProgress,

    #[error("ingestion cancelled")]
    Cancelled,

    #[error("{source_name} contains no extractable text")]
    EmptyDocument { source_name: String },

    #[error(transparent)]
    Document(DocumentError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    /// Whether the caller may retry the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Embedding(e) | Self::Generation(e) => e.is_transient(),
            Self::IngestInProgress => true,
            _ => false,
        }
    }
}

impl From<DocumentError> for RagError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Parse {
                source_name,
                reason,
            } => Self::DocumentParse {
                source_name,
                reason,
            },
            DocumentError::InvalidChunking {
                chunk_size,
                overlap,
            } => Self::Config(format!(
                "chunk overlap {overlap} must be between 0 and chunk size {chunk_size}"
            )),
            other => Self::Document(other),
        }
    }
}

impl From<IndexError> for RagError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            IndexError::EmptyVector => Self::Embedding(LlmError::Other(
                "provider returned an empty embedding vector".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_file_name() {
        let err = RagError::from(DocumentError::Parse {
            source_name: "policy.pdf".into(),
            reason: "bad xref".into(),
        });
        assert!(matches!(err, RagError::DocumentParse { .. }));
        assert_eq!(err.to_string(), "failed to parse policy.pdf: bad xref");
    }

    #[test]
    fn io_error_stays_document_error() {
        let err = RagError::from(DocumentError::FileTooLarge(10));
        assert!(matches!(err, RagError::Document(DocumentError::FileTooLarge(10))));
    }

    #[test]
    fn invalid_chunking_is_config_error() {
        let err = RagError::from(DocumentError::InvalidChunking {
            chunk_size: 10,
            overlap: 10,
        });
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn index_errors_map() {
        assert!(matches!(
            RagError::from(IndexError::DimensionMismatch {
                expected: 3,
                actual: 4
            }),
            RagError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
        assert!(matches!(
            RagError::from(IndexError::EmptyVector),
            RagError::Embedding(_)
        ));
    }

    #[test]
    fn retryable_classification() {
        assert!(RagError::Embedding(LlmError::RateLimited).is_retryable());
        assert!(RagError::IngestInProgress.is_retryable());
        assert!(!RagError::Generation(LlmError::Other("auth".into())).is_retryable());
        assert!(!RagError::NoActiveCollection.is_retryable());
    }
}
