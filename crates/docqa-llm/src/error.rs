#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("provider unavailable")]
    Unavailable,

    #[error("{provider} API request failed (status {status})")]
    Api { provider: String, status: u16 },

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: String },

    #[error("embedding count mismatch: sent {expected} texts, received {actual} vectors")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, timeouts, server-side failures and transport-level connect errors
    /// are transient. Authentication, malformed requests and parse failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Unavailable | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
