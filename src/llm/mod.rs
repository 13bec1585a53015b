//! 语言模型模块
//!
//! 托管大模型的调用接口与各后端实现。

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiModel;
pub use ollama::OllamaModel;

use async_trait::async_trait;

use crate::config::config::LlmConfig;
use crate::error::{AppError, Result};

/// 语言模型
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 根据提示词生成回答
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// 原样返回提示词，用于离线调试
#[derive(Debug, Default)]
pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }
}

/// 从上游响应体中取出文本
///
/// 能找到的文本片段按顺序拼接；一段文本都没有时退化为原始响应体。
pub(crate) fn text_or_raw(texts: Vec<String>, raw: &str) -> String {
    let joined = texts.concat();
    if joined.trim().is_empty() {
        raw.to_string()
    } else {
        joined
    }
}

pub fn create_language_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    match config.backend.as_str() {
        "gemini" => Ok(Box::new(GeminiModel::new(
            &config.base_url,
            &config.model,
            &config.api_key,
            config.timeout_secs,
        )?)),
        "ollama" => Ok(Box::new(OllamaModel::new(
            &config.base_url,
            &config.model,
            config.timeout_secs,
        )?)),
        "echo" => Ok(Box::new(EchoModel)),
        other => Err(AppError::Config(format!("Unknown llm backend: {}", other))),
    }
}
