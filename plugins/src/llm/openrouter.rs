use async_trait::async_trait;
use fanline_core::api::{LlmConfig, ProviderError, TextGenerator};
use serde_json::{json, Value};

use crate::http::{client_with_timeout, read_json, request_error, usable_secret};

/// OpenAI-style chat completion endpoint with bearer auth.
pub struct OpenRouterGenerator {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenRouterGenerator {
    pub fn new(cfg: &LlmConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: client_with_timeout(cfg.timeout_ms)?,
            url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let Some(key) = usable_secret(&self.api_key) else {
            return Err(ProviderError::NotConfigured {
                provider: "llm",
                reason: "API key is not configured (set OPENROUTER_API_KEY)".into(),
            });
        };

        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });
        tracing::debug!(
            target: "fanline.llm",
            model = %self.model,
            prompt_len = system_prompt.len() + user_prompt.len(),
            "chat completion"
        );
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| request_error(e, &self.url))?;
        let body = read_json(resp).await?;

        Ok(body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}
