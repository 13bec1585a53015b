use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::llm::{LanguageModel, text_or_raw};

/// Ollama `/api/generate` 客户端（非流式）
pub struct OllamaModel {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaModel {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false
            }))
            .send()
            .await
            .map_err(|e| AppError::LanguageModel(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| AppError::LanguageModel(format!("Ollama read error: {}", e)))?;
        if !status.is_success() {
            return Err(AppError::LanguageModel(format!(
                "Ollama generate failed ({}): {}",
                status, raw
            )));
        }

        let text = serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .and_then(|v| v.get("response").and_then(|r| r.as_str()).map(str::to_string));

        Ok(text_or_raw(text.into_iter().collect(), &raw))
    }
}
