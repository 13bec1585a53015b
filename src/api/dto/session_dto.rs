//! 会话 DTO
//!
//! 定义会话相关的响应数据结构。

use serde::{Deserialize, Serialize};

use crate::models::chat::ChatMessage;

/// 创建会话响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStartResponse {
    /// 新会话令牌
    pub session_token: String,
}

/// 会话历史响应
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// 按时间顺序的消息列表
    pub history: Vec<ChatMessage>,
}

/// 清除会话响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Session cleared successfully".to_string(),
        }
    }
}

/// 根路径响应
#[derive(Debug, Serialize, Deserialize)]
pub struct BannerResponse {
    pub message: String,
}
