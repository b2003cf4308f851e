use std::str::FromStr;

use super::Config;

/// Parsed value of `key`, or `None` when unset. Unparsable values are logged and skipped.
fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    match v.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("ignoring invalid {key} value: {v}");
            None
        }
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_retrieval();
        self.apply_env_overrides_runtime();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("DOCQA_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid DOCQA_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCQA_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("DOCQA_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("DOCQA_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Some(t) = parse_var::<f32>("DOCQA_LLM_TEMPERATURE")
            && t.is_finite()
        {
            self.llm.temperature = t;
        }
    }

    fn apply_env_overrides_retrieval(&mut self) {
        if let Some(n) = parse_var("DOCQA_CHUNK_SIZE") {
            self.retrieval.chunk_size = n;
        }
        if let Some(n) = parse_var("DOCQA_CHUNK_OVERLAP") {
            self.retrieval.chunk_overlap = n;
        }
        if let Some(k) = parse_var("DOCQA_TOP_K") {
            self.retrieval.top_k = k;
        }
        if let Some(metric) = parse_var("DOCQA_METRIC") {
            self.retrieval.metric = metric;
        }
    }

    fn apply_env_overrides_runtime(&mut self) {
        if let Some(secs) = parse_var("DOCQA_TIMEOUT_EMBEDDING") {
            self.timeouts.embedding_seconds = secs;
        }
        if let Some(secs) = parse_var("DOCQA_TIMEOUT_GENERATION") {
            self.timeouts.generation_seconds = secs;
        }
        if let Some(n) = parse_var("DOCQA_RETRY_MAX") {
            self.retry.max_retries = n;
        }
        if let Ok(v) = std::env::var("DOCQA_PERSONA") {
            self.session.persona = v;
        }
        if let Ok(v) = std::env::var("DOCQA_PERSONA_PROMPT")
            && !v.trim().is_empty()
        {
            self.session.persona_prompt = Some(v);
        }
    }
}
