//! 检索服务
//!
//! 按查询类型决定检索数量，再从向量索引取回新闻文档。

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::document::RetrievedDocument;

/// 触发新闻类检索的关键词
pub const TOPICAL_KEYWORDS: [&str; 5] = ["news", "headlines", "latest", "update", "current events"];

/// 查询类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// 新闻类，需要更多证据
    Topical,
    /// 对话类，少量上下文即可
    Conversational,
}

impl QueryKind {
    /// 对查询分类（小写后做子串匹配）
    pub fn classify(query: &str) -> Self {
        let lowered = query.to_lowercase();
        if TOPICAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            QueryKind::Topical
        } else {
            QueryKind::Conversational
        }
    }

    /// 检索数量 k
    pub fn fan_out(&self) -> usize {
        match self {
            QueryKind::Topical => 5,
            QueryKind::Conversational => 2,
        }
    }
}

/// 检索选择器
#[derive(Clone)]
pub struct RetrievalSelector {
    index: Arc<dyn VectorIndex>,
}

impl RetrievalSelector {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// 按查询类型检索，原样返回索引结果（空列表也是合法结果）
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let kind = QueryKind::classify(query);
        let k = kind.fan_out();
        let documents = self.index.similarity_search(query, k).await?;
        debug!(
            "Retrieved {} documents (kind={:?}, k={})",
            documents.len(),
            kind,
            k
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::index::MockVectorIndex;
    use rstest::rstest;

    #[rstest]
    #[case("latest headlines today", QueryKind::Topical)]
    #[case("Any NEWS from Kyiv?", QueryKind::Topical)]
    #[case("give me an update", QueryKind::Topical)]
    #[case("what are the current events", QueryKind::Topical)]
    #[case("what's my name", QueryKind::Conversational)]
    #[case("tell me more", QueryKind::Conversational)]
    #[case("current affairs", QueryKind::Conversational)]
    fn test_classify(#[case] query: &str, #[case] expected: QueryKind) {
        assert_eq!(QueryKind::classify(query), expected);
    }

    #[test]
    fn test_fan_out() {
        assert_eq!(QueryKind::classify("latest headlines today").fan_out(), 5);
        assert_eq!(QueryKind::classify("what's my name").fan_out(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_passes_k_and_query() {
        let mut index = MockVectorIndex::new();
        index
            .expect_similarity_search()
            .withf(|query, k| query == "latest headlines today" && *k == 5)
            .times(1)
            .returning(|_, _| {
                Ok(vec![RetrievedDocument::new(
                    "Headline",
                    "https://news.example/1",
                    "Body",
                )])
            });

        let selector = RetrievalSelector::new(Arc::new(index));
        let documents = selector.retrieve("latest headlines today").await.unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_empty_is_ok() {
        let mut index = MockVectorIndex::new();
        index
            .expect_similarity_search()
            .withf(|query, k| query == "what's my name" && *k == 2)
            .returning(|_, _| Ok(vec![]));

        let selector = RetrievalSelector::new(Arc::new(index));
        assert!(selector.retrieve("what's my name").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_propagates_failure() {
        let mut index = MockVectorIndex::new();
        index
            .expect_similarity_search()
            .returning(|_, _| Err(AppError::VectorIndex("unreachable".into())));

        let selector = RetrievalSelector::new(Arc::new(index));
        assert!(selector.retrieve("hello").await.is_err());
    }
}
