//! 向量存储

use dashmap::DashMap;

use crate::error::{AppError, Result};
use crate::models::document::RetrievedDocument;

#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    pub id: String,
    pub score: f32,
    pub document: RetrievedDocument,
}

/// 内存向量存储，暴力余弦检索
pub struct MemoryVectorStore {
    vectors: DashMap<String, (Vec<f32>, RetrievedDocument)>,
    dimension: usize,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: DashMap::new(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::VectorIndex(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }

    pub fn add(&self, id: &str, vector: Vec<f32>, document: RetrievedDocument) -> Result<()> {
        self.check_dimension(&vector)?;
        self.vectors.insert(id.to_string(), (vector, document));
        Ok(())
    }

    /// 按相似度降序返回至多 `limit` 条结果
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<VectorSearchResult>> {
        self.check_dimension(query)?;

        let mut results: Vec<_> = self
            .vectors
            .iter()
            .map(|entry| {
                let (id, (vector, document)) = entry.pair();
                VectorSearchResult {
                    id: id.clone(),
                    score: Self::cosine_similarity(query, vector),
                    document: document.clone(),
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(limit);

        Ok(results)
    }

    pub fn delete(&self, id: &str) -> bool {
        self.vectors.remove(id).is_some()
    }

    pub fn clear(&self) {
        self.vectors.clear();
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
