use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::llm::{LanguageModel, text_or_raw};

/// Google Gemini `generateContent` 客户端
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl GeminiModel {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn extract_texts(body: &serde_json::Value) -> Vec<String> {
        body.pointer("/candidates/0/content/parts")
            .and_then(|parts| parts.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LanguageModel(format!("Gemini network error: {}", e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| AppError::LanguageModel(format!("Gemini read error: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::LanguageModel(format!(
                "Gemini API error ({}): {}",
                status, raw
            )));
        }

        let texts = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(body) => Self::extract_texts(&body),
            Err(_) => Vec::new(),
        };
        debug!("Gemini returned {} text parts", texts.len());

        Ok(text_or_raw(texts, &raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn model_for(server: &MockServer) -> GeminiModel {
        GeminiModel::new(&server.uri(), "gemini-test", "secret", 5).unwrap()
    }

    #[tokio::test]
    async fn test_generate_joins_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Your name "}, {"text": "is Asha."}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = model_for(&server).await.generate("What's my name?").await.unwrap();
        assert_eq!(answer, "Your name is Asha.");
    }

    #[tokio::test]
    async fn test_generate_without_text_returns_raw_body() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]});
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let answer = model_for(&server).await.generate("prompt").await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&answer).unwrap();
        assert_eq!(parsed, body);
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = model_for(&server).await.generate("prompt").await.unwrap_err();
        assert!(matches!(err, AppError::LanguageModel(_)));
    }
}
