//! 聊天 DTO

use serde::{Deserialize, Serialize};

/// 查询请求
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// 用户问题
    pub query: String,
    /// 会话令牌，缺省时自动创建新会话
    #[serde(default)]
    pub session_token: Option<String>,
}

/// 查询响应
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub session_token: String,
    pub answer: String,
}

/// WebSocket 连接参数
#[derive(Debug, Deserialize)]
pub struct ChatSocketParams {
    #[serde(default)]
    pub token: Option<String>,
}
