//! Application bootstrap: config resolution and provider construction.

use std::path::{Path, PathBuf};

use anyhow::Context;
use docqa_llm::any::AnyProvider;
use docqa_llm::ollama::OllamaProvider;
use docqa_llm::openai::OpenAiProvider;

use crate::config::{Config, ProviderKind};
use crate::rag::{DocQa, RagSettings};
use crate::session::Session;
use crate::vault::{EnvVaultProvider, VaultProvider};

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Priority: explicit path > `DOCQA_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("DOCQA_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Load, resolve secrets from the environment and validate.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed, the vault fails, or validation fails.
pub async fn load_config(path: &Path) -> anyhow::Result<Config> {
    load_config_with_vault(path, &EnvVaultProvider).await
}

/// # Errors
///
/// See [`load_config`].
pub async fn load_config_with_vault(
    path: &Path,
    vault: &dyn VaultProvider,
) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    config.resolve_secrets(vault).await?;
    config.validate()?;
    Ok(config)
}

/// # Errors
///
/// Returns an error if the selected provider lacks required credentials.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("DOCQA_OPENAI_API_KEY not found in vault")?
                .expose()
                .to_owned();
            Ok(AnyProvider::OpenAi(
                OpenAiProvider::new(
                    api_key,
                    config.llm.base_url.clone(),
                    config.llm.model.clone(),
                    config.llm.max_tokens,
                    Some(config.llm.embedding_model.clone()),
                )
                .with_temperature(config.llm.temperature),
            ))
        }
        ProviderKind::Ollama => {
            let base_url = if config.llm.base_url.contains("api.openai.com") {
                OLLAMA_DEFAULT_URL
            } else {
                config.llm.base_url.as_str()
            };
            Ok(AnyProvider::Ollama(
                OllamaProvider::new(
                    base_url,
                    config.llm.model.clone(),
                    config.llm.embedding_model.clone(),
                )
                .with_temperature(config.llm.temperature),
            ))
        }
    }
}

/// Build the pipeline and a fresh session from a validated config.
///
/// The provider health check only logs; an unreachable backend surfaces later as a typed
/// error on the first call.
///
/// # Errors
///
/// Returns an error if the provider or pipeline cannot be constructed.
pub async fn build(config: &Config) -> anyhow::Result<(DocQa<AnyProvider>, Session)> {
    let provider = create_provider(config)?;
    if let Err(e) = provider.health_check().await {
        tracing::warn!(provider = config.llm.provider.as_str(), "health check failed: {e}");
    }
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        embedding_model = %config.llm.embedding_model,
        "provider ready"
    );

    let docqa = DocQa::new(provider, RagSettings::from_config(config))?;
    let session = Session::new(config.persona()?);
    Ok((docqa, session))
}
