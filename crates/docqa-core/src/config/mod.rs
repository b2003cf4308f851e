mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use docqa_llm::RetryPolicy;
use docqa_memory::document::SplitterConfig;

use crate::persona::Persona;
use crate::vault::{Secret, VaultProvider};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve credentials through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        for key in ["DOCQA_OPENAI_API_KEY", "OPENAI_API_KEY"] {
            if let Some(val) = vault.get_secret(key).await? {
                self.secrets.openai_api_key = Some(Secret::new(val));
                break;
            }
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        let r = &self.retrieval;
        if r.chunk_overlap == 0 || r.chunk_overlap >= r.chunk_size {
            bail!(
                "retrieval.chunk_overlap must satisfy 0 < overlap < chunk_size (got overlap={}, chunk_size={})",
                r.chunk_overlap,
                r.chunk_size
            );
        }
        if r.embed_batch_size == 0 {
            bail!("retrieval.embed_batch_size must be greater than 0");
        }
        if self.timeouts.embedding_seconds == 0 || self.timeouts.generation_seconds == 0 {
            bail!("timeouts must be greater than 0 seconds");
        }
        if self.llm.provider == ProviderKind::OpenAi && self.secrets.openai_api_key.is_none() {
            bail!("OpenAI provider requires DOCQA_OPENAI_API_KEY or OPENAI_API_KEY");
        }
        self.persona()?;
        Ok(())
    }

    /// Persona for new sessions. A free-text prompt wins over the preset key.
    ///
    /// # Errors
    ///
    /// Returns an error if no prompt is set and the preset key is unknown.
    pub fn persona(&self) -> anyhow::Result<Persona> {
        if let Some(prompt) = &self.session.persona_prompt {
            return Ok(Persona::custom(prompt.clone()));
        }
        self.session
            .persona
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
    }

    #[must_use]
    pub fn splitter(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.retrieval.chunk_size,
            chunk_overlap: self.retrieval.chunk_overlap,
        }
    }

    #[must_use]
    pub fn embedding_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.backoff_ms),
            Duration::from_secs(self.timeouts.embedding_seconds),
        )
    }

    #[must_use]
    pub fn generation_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.backoff_ms),
            Duration::from_secs(self.timeouts.generation_seconds),
        )
    }
}
