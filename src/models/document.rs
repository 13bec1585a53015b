use serde::{Deserialize, Serialize};

/// 向量索引返回的新闻文档
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RetrievedDocument {
    /// 标题
    pub title: String,
    /// 原文链接
    pub link: String,
    /// 正文摘要
    pub content: String,
}

impl RetrievedDocument {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            content: content.into(),
        }
    }
}
