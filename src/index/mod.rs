//! 索引模块
//!
//! 新闻文档的向量检索：嵌入模型把文本编码为向量，向量存储负责相似度检索。

pub mod embedding;
pub mod ingest;
pub mod vector;

pub use embedding::{EmbeddingModel, create_embedding_model};
pub use ingest::FeedIngester;
pub use vector::{MemoryVectorStore, VectorSearchResult};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::config::{EmbeddingConfig, VectorConfig};
use crate::error::{AppError, Result};
use crate::models::document::RetrievedDocument;

/// 向量索引
///
/// 结果按相关度降序排列，可能少于 `k` 条。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>>;
}

/// 嵌入模型 + 内存向量存储组成的新闻索引
pub struct NewsIndex {
    embedding_model: Box<dyn EmbeddingModel>,
    store: MemoryVectorStore,
}

impl NewsIndex {
    pub fn new(embedding_model: Box<dyn EmbeddingModel>) -> Self {
        let store = MemoryVectorStore::new(embedding_model.dimension());
        Self {
            embedding_model,
            store,
        }
    }

    fn embedding_text(document: &RetrievedDocument) -> String {
        format!("{}\n{}", document.title, document.content)
    }

    /// 编码并写入文档，返回写入数量
    ///
    /// 同一链接的文档会覆盖旧条目；同一批次内同链接的多个分块各自保留。
    pub async fn add_documents(&self, documents: Vec<RetrievedDocument>) -> Result<usize> {
        let vectors = self.embed_documents(&documents).await?;
        Ok(self.insert(documents, vectors))
    }

    /// 用新文档整体替换索引内容
    ///
    /// 先完成编码再清空旧数据，编码失败时索引保持不变。
    pub async fn replace_documents(&self, documents: Vec<RetrievedDocument>) -> Result<usize> {
        let vectors = self.embed_documents(&documents).await?;
        self.store.clear();
        Ok(self.insert(documents, vectors))
    }

    async fn embed_documents(&self, documents: &[RetrievedDocument]) -> Result<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = documents.iter().map(Self::embedding_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embedding_model.encode_batch(&text_refs).await?;

        if vectors.len() != documents.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                documents.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.store.dimension() {
                return Err(AppError::VectorIndex(format!(
                    "Embedding dimension {} does not match index dimension {}",
                    vector.len(),
                    self.store.dimension()
                )));
            }
        }
        Ok(vectors)
    }

    fn insert(&self, documents: Vec<RetrievedDocument>, vectors: Vec<Vec<f32>>) -> usize {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut count = 0;
        for (document, vector) in documents.into_iter().zip(vectors) {
            let id = if document.link.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                let n = seen.entry(document.link.clone()).or_insert(0);
                *n += 1;
                if *n == 1 {
                    document.link.clone()
                } else {
                    format!("{}#{}", document.link, n)
                }
            };
            match self.store.add(&id, vector, document) {
                Ok(()) => count += 1,
                Err(e) => warn!("Skipping document {}: {}", id, e),
            }
        }

        debug!("Indexed {} documents", count);
        count
    }

    /// 从 JSON 文件载入 `[{title, link, content}]`
    pub async fn load_seed_file(&self, path: &Path) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path).await?;
        let documents: Vec<RetrievedDocument> = serde_json::from_str(&raw)?;
        let documents: Vec<RetrievedDocument> = documents
            .into_iter()
            .filter(|d| !d.content.trim().is_empty())
            .collect();
        self.add_documents(documents).await
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl VectorIndex for NewsIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedding_model.encode(query).await?;
        let results = self.store.search(&vector, k)?;
        Ok(results.into_iter().map(|r| r.document).collect())
    }
}

/// 根据配置创建新闻索引，配置了种子文件时预先载入
pub async fn create_news_index(
    vector: &VectorConfig,
    embedding: &EmbeddingConfig,
) -> Result<NewsIndex> {
    let model = create_embedding_model(embedding, vector.dimension)?;
    let index = NewsIndex::new(model);

    if let Some(path) = &vector.seed_path {
        let count = index.load_seed_file(path).await?;
        info!("Loaded {} news documents from {}", count, path.display());
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::embedding::HashingEmbeddingModel;

    fn index() -> NewsIndex {
        NewsIndex::new(Box::new(HashingEmbeddingModel::new(256)))
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let results = index().similarity_search("latest news", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_most_relevant_first() {
        let index = index();
        index
            .add_documents(vec![
                RetrievedDocument::new(
                    "Flooding hits coastal towns",
                    "https://news.example/floods",
                    "Heavy rain caused flooding along the coast.",
                ),
                RetrievedDocument::new(
                    "Central bank holds interest rates",
                    "https://news.example/rates",
                    "The central bank kept interest rates unchanged.",
                ),
            ])
            .await
            .unwrap();

        let results = index
            .similarity_search("interest rates central bank", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].link, "https://news.example/rates");
    }

    #[tokio::test]
    async fn test_fewer_documents_than_k() {
        let index = index();
        index
            .add_documents(vec![RetrievedDocument::new("Only", "https://x/1", "one story")])
            .await
            .unwrap();

        let results = index.similarity_search("story", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_same_link_overwrites() {
        let index = index();
        let doc = RetrievedDocument::new("A", "https://x/a", "first");
        index.add_documents(vec![doc.clone()]).await.unwrap();
        index.add_documents(vec![doc]).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_chunks_sharing_a_link_are_all_kept() {
        let index = index();
        let count = index
            .add_documents(vec![
                RetrievedDocument::new("A", "https://x/a", "first part"),
                RetrievedDocument::new("A", "https://x/a", "second part"),
            ])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_documents_drops_previous_content() {
        let index = index();
        index
            .add_documents(vec![
                RetrievedDocument::new("Old", "https://x/old", "yesterday's story"),
                RetrievedDocument::new("Older", "https://x/older", "last week's story"),
            ])
            .await
            .unwrap();

        let count = index
            .replace_documents(vec![RetrievedDocument::new(
                "New",
                "https://x/new",
                "today's story",
            )])
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.len(), 1);

        let results = index.similarity_search("story", 5).await.unwrap();
        assert_eq!(results[0].link, "https://x/new");
    }

    #[tokio::test]
    async fn test_load_seed_file_skips_empty_content() {
        let dir = std::env::temp_dir().join(format!("newsdesk-seed-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("seed.json");
        tokio::fs::write(
            &path,
            r#"[
                {"title": "A", "link": "https://x/a", "content": "Story A"},
                {"title": "B", "link": "https://x/b", "content": "  "}
            ]"#,
        )
        .await
        .unwrap();

        let index = index();
        assert_eq!(index.load_seed_file(&path).await.unwrap(), 1);
        assert_eq!(index.len(), 1);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
