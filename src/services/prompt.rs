//! 提示词组装
//!
//! 纯函数：指令、对话历史、检索上下文和原始查询合成一段提示词。

use crate::models::document::RetrievedDocument;

/// 没有检索到文档时的占位文本
pub const NO_CONTEXT: &str = "No relevant context found.";

/// 固定指令
pub const INSTRUCTIONS: &str = concat!(
    "You are a helpful assistant that keeps a coherent conversation and provides the latest news updates when asked, ",
    "using the conversation history and the provided news articles. ",
    "Use the conversation history to keep context across turns. ",
    "Prioritize the conversation history for personal or conversational queries (for example 'What's my name?' or 'Tell me more'); ",
    "answer those by referring directly to what the user said earlier (for example 'Your name is [name].'). ",
    "For queries about recent news (containing words like 'news', 'headlines' or 'latest'), respond with: ",
    "'Here are some of the top news headlines: * [Headline 1] * [Headline 2] * [Headline 3]...' ",
    "with all headlines on a single line and a space after each '*'. ",
    "Focus on recent, significant stories and skip outdated or irrelevant ones. ",
    "Generalize specific names where reasonable (for example 'the US president' rather than the president's name, ",
    "'another nation' rather than a specific country unless it matters). ",
    "If the history or context is not enough to answer, say so and give a general answer if possible.",
);

/// 把检索到的文档格式化为上下文块，块之间空一行
pub fn format_context(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return NO_CONTEXT.to_string();
    }

    documents
        .iter()
        .map(|d| format!("Title: {}\nLink: {}\nContent: {}", d.title, d.link, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 组装完整提示词
pub fn compose_prompt(history: &str, documents: &[RetrievedDocument], query: &str) -> String {
    format!(
        "{INSTRUCTIONS}\n\n\
         Conversation History:\n{history}\n\n\
         Context from News Articles:\n{context}\n\n\
         User Query:\n{query}\n\n\
         Answer:",
        context = format_context(documents),
    )
}
