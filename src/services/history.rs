//! 对话历史格式化

use crate::models::chat::ChatMessage;

/// 提示词中保留的最近消息数
pub const HISTORY_WINDOW: usize = 5;

/// 没有历史时的占位文本
pub const NO_HISTORY: &str = "No previous conversation history.";

/// 将消息历史压缩为带角色标签的对话记录
///
/// 只保留最后 `HISTORY_WINDOW` 条，按时间先后排列。
pub fn format_history(messages: &[ChatMessage]) -> String {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    let lines: Vec<String> = messages[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect();

    if lines.is_empty() {
        NO_HISTORY.to_string()
    } else {
        lines.join("\n")
    }
}
