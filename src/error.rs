//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 会话不存在或已过期
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 认证错误（会话令牌无效）
    #[error("认证失败: {0}")]
    Authentication(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 缓存后端错误
    #[error("缓存错误: {0}")]
    Cache(String),

    /// 连接错误
    #[error("连接错误: {0}")]
    Connection(String),

    /// 向量索引错误
    #[error("向量索引错误: {0}")]
    VectorIndex(String),

    /// 嵌入模型错误
    #[error("嵌入模型错误: {0}")]
    Embedding(String),

    /// 语言模型错误
    #[error("语言模型错误: {0}")]
    LanguageModel(String),

    /// 新闻源导入错误
    #[error("新闻源导入失败: {0}")]
    Ingestion(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl AppError {
    /// 会话令牌不存在或已过期
    pub fn session_not_found() -> Self {
        AppError::NotFound("Session not found or expired".to_string())
    }

    /// 是否为 NotFound 类错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            AppError::Connection(e.to_string())
        } else {
            AppError::Cache(e.to_string())
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            AppError::Connection(e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = (&self).into();
        let body = Json(ErrorResponse::new(&code, &self.to_string()));
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response()
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,
    /// 错误消息
    pub message: String,
    /// 详细信息
    pub details: Option<String>,
    /// 请求 ID
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
            request_id: None,
        }
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::NotFound(_) => (404, "NOT_FOUND".to_string()),
            AppError::Authentication(_) => (401, "UNAUTHORIZED".to_string()),
            AppError::Validation(_) => (400, "BAD_REQUEST".to_string()),
            AppError::Connection(_) => (503, "SERVICE_UNAVAILABLE".to_string()),
            AppError::Cache(_) => (500, "CACHE_ERROR".to_string()),
            AppError::VectorIndex(_) => (500, "INDEX_ERROR".to_string()),
            AppError::Embedding(_) => (500, "EMBEDDING_ERROR".to_string()),
            AppError::LanguageModel(_) | AppError::Ingestion(_) => {
                (502, "UPSTREAM_ERROR".to_string())
            }
            _ => (500, "INTERNAL_ERROR".to_string()),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let (status, code) = (&AppError::session_not_found()).into();
        assert_eq!(status, 404);
        assert_eq!(code, "NOT_FOUND");

        let (status, code) = (&AppError::Authentication("bad token".into())).into();
        assert_eq!(status, 401);
        assert_eq!(code, "UNAUTHORIZED");

        let (status, _) = (&AppError::LanguageModel("down".into())).into();
        assert_eq!(status, 502);

        let (status, code) = (&AppError::Validation("empty query".into())).into();
        assert_eq!(status, 400);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[test]
    fn test_is_not_found() {
        assert!(AppError::session_not_found().is_not_found());
        assert!(!AppError::Cache("x".into()).is_not_found());
    }
}
