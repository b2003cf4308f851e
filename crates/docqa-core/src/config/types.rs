use std::path::PathBuf;

use docqa_memory::DistanceMetric;
use serde::{Deserialize, Serialize};

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Generation and embedding backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Generation model id.
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding model id.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

fn default_embed_batch_size() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            metric: DistanceMetric::default(),
            embed_batch_size: default_embed_batch_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Directory for transient parser copies. System temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            temp_dir: None,
        }
    }
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_generation_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_seconds: default_embedding_timeout(),
            generation_seconds: default_generation_timeout(),
        }
    }
}

fn default_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_persona() -> String {
    "strict-legal-auditor".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Preset key, see [`Persona::PRESET_KEYS`](crate::persona::Persona::PRESET_KEYS).
    #[serde(default = "default_persona")]
    pub persona: String,
    /// Free-text system prompt; takes precedence over `persona`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_prompt: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            persona_prompt: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
}
