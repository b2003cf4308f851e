use ollama_rs::Ollama;
use ollama_rs::error::OllamaError;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::models::ModelOptions;

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, LlmProvider, Message, Role, ensure_batch_len};

/// Locally hosted models served by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
    temperature: f32,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
            temperature: 0.0,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Check if Ollama is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Ollama fails.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        self.client.list_local_models().await.map_err(|e| {
            tracing::debug!("Ollama health check failed: {e}");
            LlmError::Unavailable
        })?;
        Ok(())
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let ollama_messages: Vec<ChatMessage> = messages.iter().map(convert_message).collect();
        let request = ChatMessageRequest::new(self.model.clone(), ollama_messages)
            .options(ModelOptions::default().temperature(self.temperature));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| map_error("chat", e))?;

        if response.message.content.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "ollama".into(),
            });
        }
        Ok(response.message.content)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| map_error("embedding", e))?;

        ensure_batch_len(texts.len(), &response.embeddings)?;
        Ok(response.embeddings)
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

/// Connection failures and timeouts become [`LlmError::Unavailable`] so the retry
/// policy applies. Everything else is reported as-is.
fn map_error(operation: &str, e: OllamaError) -> LlmError {
    match e {
        OllamaError::ReqwestError(ref err)
            if err.is_connect() || err.is_timeout() || err.is_request() =>
        {
            tracing::debug!("Ollama {operation} request failed: {e}");
            LlmError::Unavailable
        }
        other => LlmError::Other(format!("Ollama {operation} request failed: {other}")),
    }
}

fn convert_message(msg: &Message) -> ChatMessage {
    let text = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(text),
        Role::User => ChatMessage::user(text),
        Role::Assistant => ChatMessage::assistant(text),
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(
            "http://localhost:11434",
            "llama3.1".into(),
            "nomic-embed-text".into(),
        )
    }

    #[test]
    fn parse_host_port_with_port() {
        let (host, port) = parse_host_port("http://localhost:11434");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_without_port() {
        let (host, port) = parse_host_port("http://localhost/");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn convert_message_keeps_content() {
        let cm = convert_message(&Message::system("persona"));
        assert_eq!(cm.content, "persona");
    }

    #[test]
    fn name_and_embedding_model() {
        let p = provider();
        assert_eq!(p.name(), "ollama");
        assert_eq!(p.embedding_model(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn embed_empty_batch_skips_request() {
        let p = OllamaProvider::new("http://127.0.0.1:1", "m".into(), "e".into());
        assert!(p.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient() {
        let p = OllamaProvider::new("http://127.0.0.1:1", "m".into(), "e".into());
        let err = p.chat(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable));
        assert!(err.is_transient());

        let err = p.embed(&["text".to_owned()]).await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_retried() {
        let p = OllamaProvider::new("http://127.0.0.1:1", "m".into(), "e".into());
        let attempts = std::sync::atomic::AtomicUsize::new(0);
        let policy = crate::RetryPolicy::new(
            2,
            std::time::Duration::from_millis(1),
            std::time::Duration::from_secs(5),
        );
        let result = policy
            .run("generation", || {
                attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                p.chat(&[])
            })
            .await;
        assert!(matches!(result, Err(LlmError::Unavailable)));
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn non_transport_errors_stay_permanent() {
        let err = map_error("chat", OllamaError::Other("model not found".into()));
        assert!(matches!(err, LlmError::Other(ref m) if m.contains("model not found")));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn health_check_unreachable_is_unavailable() {
        let p = OllamaProvider::new("http://127.0.0.1:1", "m".into(), "e".into());
        assert!(matches!(
            p.health_check().await,
            Err(LlmError::Unavailable)
        ));
    }
}
